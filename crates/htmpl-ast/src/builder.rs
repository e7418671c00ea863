//! Node constructors and tag classification.
//!
//! Used by the template bindings and directly by code that builds trees by
//! hand. Every element constructor validates the void/container split:
//! content handed to a void element is rejected, never silently dropped.

use htmpl_grammar::html::VOID_TAGS;

use crate::ast::{Attribute, ChildlessNode, Dynamic, Html, Insertion, Node};
use crate::BuildError;

/// Whether `tag` is a void element. Case-insensitive.
pub fn is_childless(tag: &str) -> bool {
    VOID_TAGS.iter().any(|void| void.eq_ignore_ascii_case(tag))
}

/// Build a container element. Fails for void tags.
pub fn container_node(
    tag: &str,
    attributes: Vec<Attribute>,
    children: Vec<Html>,
) -> Result<Html, BuildError> {
    if is_childless(tag) {
        return Err(BuildError::VoidTag {
            tag: tag.to_string(),
        });
    }
    Ok(Html::Node(Node::new(tag.to_string(), attributes, children)))
}

/// Build a void element. Fails for container tags.
pub fn empty_node(tag: &str, attributes: Vec<Attribute>) -> Result<Html, BuildError> {
    if !is_childless(tag) {
        return Err(BuildError::ContainerTag {
            tag: tag.to_string(),
        });
    }
    Ok(Html::ChildlessNode(ChildlessNode::new(tag.to_string(), attributes)))
}

/// Build an element of either kind, picked by tag classification.
pub fn node(tag: &str, attributes: Vec<Attribute>, children: Vec<Html>) -> Result<Html, BuildError> {
    if is_childless(tag) {
        if !children.is_empty() {
            return Err(BuildError::VoidContent {
                tag: tag.to_string(),
            });
        }
        empty_node(tag, attributes)
    } else {
        container_node(tag, attributes, children)
    }
}

pub fn text(content: impl Into<String>) -> Html {
    Html::Text(content.into())
}

pub fn dynamic_html(callback: impl Fn() -> Insertion + Send + Sync + 'static) -> Html {
    Html::DynamicHtml(Dynamic::new(callback))
}

pub fn html_splice(values: impl IntoIterator<Item = Html>) -> Html {
    Html::HtmlSplice(values.into_iter().collect())
}

pub fn safe_html(content: impl Into<String>) -> Html {
    Html::SafeHtml(content.into())
}

pub fn class_names<S: Into<String>>(values: impl IntoIterator<Item = S>) -> Attribute {
    Attribute::ClassAttribute(values.into_iter().map(Into::into).collect())
}

pub fn id(name: impl Into<String>) -> Attribute {
    Attribute::IdAttribute(name.into())
}

pub fn dynamic_attribute(callback: impl Fn() -> Insertion + Send + Sync + 'static) -> Attribute {
    Attribute::DynamicAttribute(Dynamic::new(callback))
}

pub fn attribute_splice(values: impl IntoIterator<Item = Attribute>) -> Attribute {
    Attribute::AttributeSplice(values.into_iter().collect())
}

/// The recognized attributes, for `attributes()`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeRecord {
    pub class_name: Option<Vec<String>>,
    pub id: Option<String>,
}

/// Build the attributes present in `record`, class first.
pub fn attributes(record: AttributeRecord) -> Attribute {
    let mut values = Vec::new();
    if let Some(classes) = record.class_name {
        values.push(Attribute::ClassAttribute(classes));
    }
    if let Some(name) = record.id {
        values.push(Attribute::IdAttribute(name));
    }
    Attribute::AttributeSplice(values)
}

/// The right-hand side of `name=...` in a template.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    /// A quoted literal, already unescaped.
    Literal(String),
    /// An inserted attribute node, used as is.
    Attribute(Attribute),
}

/// Build the attribute for `name`, or `None` if `name` is not recognized.
///
/// `className` (or `class`) literals are split on whitespace; `id` literals
/// are taken whole.
pub fn attribute(name: &str, value: AttributeValue) -> Option<Attribute> {
    match (name, value) {
        (_, AttributeValue::Attribute(attribute)) if is_recognized(name) => Some(attribute),
        ("className" | "class", AttributeValue::Literal(classes)) => Some(Attribute::ClassAttribute(
            classes.split_ascii_whitespace().map(str::to_string).collect(),
        )),
        ("id", AttributeValue::Literal(name)) => Some(Attribute::IdAttribute(name)),
        _ => {
            log::debug!(target: "htmpl.builder", "dropping unrecognized attribute {name}");
            None
        }
    }
}

fn is_recognized(name: &str) -> bool {
    matches!(name, "className" | "class" | "id")
}
