//! htmpl AST
//!
//! The immutable document model produced by the template parser, the
//! builder functions used to construct it by hand, and the rendering that
//! turns it back into markup.
//!
//! ```text
//! builder::node() / htmpl_parser::parse() → Html → render() → String
//! ```
//!
//! Escaping happens only at render time: `Text` and attribute values go
//! through `escape::encode_entities`, `SafeHtml` through
//! `escape::sanitize_html`.

pub mod ast;
pub mod builder;
pub mod escape;

pub use ast::{Attribute, ChildlessNode, Dynamic, Html, Insertion, Node};
pub use builder::{
    attribute, attribute_splice, attributes, class_names, container_node, dynamic_attribute,
    dynamic_html, empty_node, html_splice, id, is_childless, node, safe_html, text,
    AttributeRecord, AttributeValue,
};

/// Render-time failure of a dynamic node.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    /// A dynamic callback returned the other kind of value.
    #[error("Expected {expected}")]
    Type { expected: &'static str },
}

/// A node that cannot be built from the given parts.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    #[error("The element {tag} does not accept any content.")]
    VoidContent { tag: String },

    #[error("The element {tag} is a void element and cannot be built as a container.")]
    VoidTag { tag: String },

    #[error("The element {tag} is not a void element.")]
    ContainerTag { tag: String },
}
