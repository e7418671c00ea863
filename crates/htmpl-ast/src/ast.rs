//! Html and attribute nodes.
//!
//! Both node sets are closed enums; every variant is rendered by an
//! exhaustive `match`. Nodes never change once built: element structs keep
//! their fields private and are only created through `crate::builder`, which
//! enforces the void/container split.

use std::fmt;
use std::sync::Arc;

use crate::escape::{encode_entities, sanitize_html};
use crate::RenderError;

// ---------------------------------------------------------------------------
// Html nodes
// ---------------------------------------------------------------------------

/// An HTML fragment.
#[derive(Debug, Clone, PartialEq)]
pub enum Html {
    /// An element that may carry content.
    Node(Node),

    /// A void element (`br`, `img`, ...). Never has children.
    ChildlessNode(ChildlessNode),

    /// Literal text, entity-encoded when rendered.
    Text(String),

    /// Evaluated on every render; must produce `Insertion::Html`.
    DynamicHtml(Dynamic),

    /// Trusted markup, sanitized (not encoded) when rendered.
    SafeHtml(String),

    /// A sequence of fragments rendered back to back.
    HtmlSplice(Vec<Html>),
}

/// A container element.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    tag: String,
    attributes: Vec<Attribute>,
    children: Vec<Html>,
}

impl Node {
    pub(crate) fn new(tag: String, attributes: Vec<Attribute>, children: Vec<Html>) -> Self {
        Self {
            tag,
            attributes,
            children,
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn children(&self) -> &[Html] {
        &self.children
    }
}

/// A void element.
#[derive(Debug, Clone, PartialEq)]
pub struct ChildlessNode {
    tag: String,
    attributes: Vec<Attribute>,
}

impl ChildlessNode {
    pub(crate) fn new(tag: String, attributes: Vec<Attribute>) -> Self {
        Self { tag, attributes }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }
}

impl Html {
    /// Serialize to markup.
    ///
    /// Fails only when a dynamic node produces the wrong kind of value.
    pub fn render(&self) -> Result<String, RenderError> {
        let mut out = String::new();
        self.render_into(&mut out)?;
        Ok(out)
    }

    fn render_into(&self, out: &mut String) -> Result<(), RenderError> {
        match self {
            Html::Node(node) => {
                out.push('<');
                out.push_str(&node.tag);
                out.push(' ');
                render_attributes(&node.attributes, out)?;
                out.push('>');
                for child in &node.children {
                    child.render_into(out)?;
                }
                out.push_str("</");
                out.push_str(&node.tag);
                out.push('>');
            }
            Html::ChildlessNode(node) => {
                out.push('<');
                out.push_str(&node.tag);
                out.push(' ');
                render_attributes(&node.attributes, out)?;
                out.push_str(" />");
            }
            Html::Text(value) => out.push_str(&encode_entities(value)),
            Html::DynamicHtml(dynamic) => match dynamic.call() {
                Insertion::Html(html) => html.render_into(out)?,
                Insertion::Attribute(_) => return Err(RenderError::Type { expected: "Html" }),
            },
            Html::SafeHtml(raw) => out.push_str(&sanitize_html(raw)),
            Html::HtmlSplice(values) => {
                for value in values {
                    value.render_into(out)?;
                }
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Attribute nodes
// ---------------------------------------------------------------------------

/// An element attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum Attribute {
    /// `class="a b"`
    ClassAttribute(Vec<String>),

    /// `id="name"`
    IdAttribute(String),

    /// Evaluated on every render; must produce `Insertion::Attribute`.
    DynamicAttribute(Dynamic),

    /// Several attributes, space-separated.
    AttributeSplice(Vec<Attribute>),
}

impl Attribute {
    pub fn render(&self) -> Result<String, RenderError> {
        let mut out = String::new();
        self.render_into(&mut out)?;
        Ok(out)
    }

    fn render_into(&self, out: &mut String) -> Result<(), RenderError> {
        match self {
            Attribute::ClassAttribute(classes) => {
                out.push_str("class=\"");
                for (i, class) in classes.iter().enumerate() {
                    if i > 0 {
                        out.push(' ');
                    }
                    out.push_str(&encode_entities(class));
                }
                out.push('"');
            }
            Attribute::IdAttribute(name) => {
                out.push_str("id=\"");
                out.push_str(&encode_entities(name));
                out.push('"');
            }
            Attribute::DynamicAttribute(dynamic) => match dynamic.call() {
                Insertion::Attribute(attribute) => attribute.render_into(out)?,
                Insertion::Html(_) => return Err(RenderError::Type { expected: "Attribute" }),
            },
            Attribute::AttributeSplice(values) => render_attributes(values, out)?,
        }
        Ok(())
    }
}

/// Space-joined, the way a list join would: an empty attribute still gets
/// its separator.
fn render_attributes(attributes: &[Attribute], out: &mut String) -> Result<(), RenderError> {
    for (i, attribute) in attributes.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        attribute.render_into(out)?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Insertions and dynamic values
// ---------------------------------------------------------------------------

/// A value supplied from outside the template source: the items of an
/// insertion list, and what dynamic callbacks return.
#[derive(Debug, Clone, PartialEq)]
pub enum Insertion {
    Html(Html),
    Attribute(Attribute),
}

impl Insertion {
    /// Name of the node set this value belongs to, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Insertion::Html(_) => "Html",
            Insertion::Attribute(_) => "Attribute",
        }
    }
}

impl From<Html> for Insertion {
    fn from(html: Html) -> Self {
        Insertion::Html(html)
    }
}

impl From<Attribute> for Insertion {
    fn from(attribute: Attribute) -> Self {
        Insertion::Attribute(attribute)
    }
}

/// A zero-argument callback evaluated at render time.
///
/// Clones share the callback. Equality is identity of the callback.
#[derive(Clone)]
pub struct Dynamic(Arc<dyn Fn() -> Insertion + Send + Sync>);

impl Dynamic {
    pub fn new(callback: impl Fn() -> Insertion + Send + Sync + 'static) -> Self {
        Self(Arc::new(callback))
    }

    pub fn call(&self) -> Insertion {
        (self.0)()
    }
}

impl PartialEq for Dynamic {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Dynamic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Dynamic(..)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{
        attribute_splice, class_names, container_node, dynamic_attribute, dynamic_html,
        empty_node, html_splice, id, safe_html, text,
    };
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn render(html: &Html) -> String {
        html.render().unwrap()
    }

    // =========================================================================
    // Elements
    // =========================================================================

    #[test]
    fn test_container_without_attributes_keeps_separator() {
        let p = container_node("p", vec![], vec![text("hi")]).unwrap();
        assert_eq!(render(&p), "<p >hi</p>");
    }

    #[test]
    fn test_childless_without_attributes() {
        let br = empty_node("br", vec![]).unwrap();
        assert_eq!(render(&br), "<br  />");
    }

    #[test]
    fn test_every_void_tag_renders_with_two_spaces() {
        for tag in htmpl_grammar::html::VOID_TAGS {
            let node = empty_node(tag, vec![]).unwrap();
            assert_eq!(render(&node), format!("<{tag}  />"));
        }
    }

    #[test]
    fn test_attributes_are_space_joined() {
        let img = empty_node("img", vec![id("logo"), class_names(["a", "b"])]).unwrap();
        assert_eq!(render(&img), "<img id=\"logo\" class=\"a b\" />");
    }

    #[test]
    fn test_nested_elements() {
        let tree = container_node(
            "div",
            vec![id("x")],
            vec![container_node("p", vec![], vec![text("Hi & bye")]).unwrap()],
        )
        .unwrap();
        assert_eq!(render(&tree), "<div id=\"x\"><p >Hi &amp; bye</p></div>");
    }

    // =========================================================================
    // Text and raw markup
    // =========================================================================

    #[test]
    fn test_text_is_encoded() {
        assert_eq!(render(&text("<b>\"x\" & 'y'</b>")), "&lt;b&gt;&quot;x&quot; &amp; &apos;y&apos;&lt;/b&gt;");
    }

    #[test]
    fn test_safe_html_is_sanitized_not_encoded() {
        let html = safe_html("<b>bold</b><script>alert(1)</script>");
        assert_eq!(render(&html), "<b>bold</b>");
    }

    #[test]
    fn test_splice_concatenates_in_order() {
        let html = html_splice(vec![text("a"), empty_node("hr", vec![]).unwrap(), text("b")]);
        assert_eq!(render(&html), "a<hr  />b");
    }

    #[test]
    fn test_attribute_values_are_encoded() {
        assert_eq!(id("a\"b").render().unwrap(), "id=\"a&quot;b\"");
        assert_eq!(class_names(["x<y"]).render().unwrap(), "class=\"x&lt;y\"");
    }

    #[test]
    fn test_attribute_splice() {
        let attrs = attribute_splice(vec![id("a"), class_names(["b"])]);
        assert_eq!(attrs.render().unwrap(), "id=\"a\" class=\"b\"");
        assert_eq!(attribute_splice(vec![]).render().unwrap(), "");
    }

    // =========================================================================
    // Dynamic values
    // =========================================================================

    #[test]
    fn test_dynamic_html() {
        let html = dynamic_html(|| text("ok & done").into());
        assert_eq!(render(&html), "ok &amp; done");
    }

    #[test]
    fn test_dynamic_html_wrong_kind() {
        let html = dynamic_html(|| id("x").into());
        let err = html.render().unwrap_err();
        assert_eq!(err, RenderError::Type { expected: "Html" });
        assert_eq!(err.to_string(), "Expected Html");
    }

    #[test]
    fn test_dynamic_attribute_wrong_kind() {
        let attr = dynamic_attribute(|| text("x").into());
        assert_eq!(attr.render().unwrap_err().to_string(), "Expected Attribute");
    }

    #[test]
    fn test_dynamic_error_propagates_through_parents() {
        let tree = container_node(
            "div",
            vec![dynamic_attribute(|| text("x").into())],
            vec![text("never")],
        )
        .unwrap();
        assert!(tree.render().is_err());
    }

    #[test]
    fn test_dynamic_is_evaluated_on_every_render() {
        static CALLS: AtomicUsize = AtomicUsize::new(0);
        let html = dynamic_html(|| {
            let n = CALLS.fetch_add(1, Ordering::SeqCst);
            text(n.to_string()).into()
        });
        assert_eq!(render(&html), "0");
        assert_eq!(render(&html), "1");
    }

    #[test]
    fn test_render_is_shareable_across_threads() {
        let tree = Arc::new(html_splice(vec![
            text("a"),
            dynamic_html(|| text("b").into()),
        ]));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let tree = Arc::clone(&tree);
                std::thread::spawn(move || tree.render().unwrap())
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), "ab");
        }
    }

    #[test]
    fn test_dynamic_equality_is_identity() {
        let a = Dynamic::new(|| text("x").into());
        let b = Dynamic::new(|| text("x").into());
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }

    #[test]
    fn test_insertion_kind() {
        assert_eq!(Insertion::from(text("x")).kind(), "Html");
        assert_eq!(Insertion::from(id("x")).kind(), "Attribute");
    }
}
