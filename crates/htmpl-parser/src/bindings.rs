//! Semantic actions for the HTML template grammar.
//!
//! The state threaded through the binder is the insertion list; `{{N}}`
//! resolves to its N-th item.

use std::sync::LazyLock;

use htmpl_ast::escape::decode_entities;
use htmpl_ast::{builder, Attribute, AttributeValue, BuildError, Html, Insertion};

use crate::binder::{Args, Binder, Binding, Context, SemanticValue};
use crate::position::LineColumn;
use crate::{BinderError, ParseError};

/// Intermediate values produced while binding a template.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    List(Vec<Value>),
    /// A parsed `{{N}}`.
    Index(usize),
    /// The insertion an index resolved to, kept with its index for diagnostics.
    Inserted { index: usize, value: Insertion },
    Html(Html),
    /// A void element written without `/>`, which a following end tag may close.
    OpenVoid { tag: String, html: Html },
    /// A void end tag such as `</br>`, paired with its siblings by `html_list`.
    VoidEnd {
        tag: String,
        end: LineColumn,
        slice: String,
    },
    Attribute(Attribute),
    /// An attribute that renders to nothing (unrecognized or bare).
    Nothing,
}

impl SemanticValue for Value {
    fn from_text(text: &str) -> Self {
        Value::Text(text.to_string())
    }

    fn from_list(values: Vec<Self>) -> Self {
        Value::List(values)
    }
}

impl Value {
    fn kind(&self) -> &'static str {
        match self {
            Value::Text(_) => "text",
            Value::List(_) => "a list",
            Value::Index(_) => "an index",
            Value::Inserted { .. } => "an insertion",
            Value::Html(_) => "html",
            Value::OpenVoid { .. } => "a void element",
            Value::VoidEnd { .. } => "a void end tag",
            Value::Attribute(_) => "an attribute",
            Value::Nothing => "nothing",
        }
    }

    fn shape(self, rule: &str, expected: &str) -> ParseError {
        BinderError::Shape {
            rule: rule.to_string(),
            expected: format!("{expected}, found {}", self.kind()),
        }
        .into()
    }

    pub fn into_text(self, rule: &str) -> Result<String, ParseError> {
        match self {
            Value::Text(text) => Ok(text),
            other => Err(other.shape(rule, "text")),
        }
    }

    pub fn into_list(self, rule: &str) -> Result<Vec<Value>, ParseError> {
        match self {
            Value::List(values) => Ok(values),
            other => Err(other.shape(rule, "a list")),
        }
    }

    /// Content: a node, or an insertion that must be html.
    pub fn into_html(self, rule: &str) -> Result<Html, ParseError> {
        match self {
            Value::Html(html) | Value::OpenVoid { html, .. } => Ok(html),
            Value::Inserted {
                value: Insertion::Html(html),
                ..
            } => Ok(html),
            Value::Inserted { index, value } => Err(ParseError::Type {
                expected: "Html",
                found: value.kind(),
                index,
            }),
            other => Err(other.shape(rule, "html")),
        }
    }

    /// An attribute, or `None` for one that was dropped.
    fn into_attribute(self, rule: &str) -> Result<Option<Attribute>, ParseError> {
        match self {
            Value::Attribute(attribute) => Ok(Some(attribute)),
            Value::Nothing => Ok(None),
            other => Err(other.shape(rule, "an attribute")),
        }
    }
}

/// Content nodes in order.
///
/// A void end tag closes the nearest earlier void element of the same name
/// written without `/>`, and only when nothing came between them.
fn html_list(value: Value, rule: &str) -> Result<Vec<Html>, ParseError> {
    let mut nodes = Vec::new();
    // Unclosed void elements: tag and index in `nodes`.
    let mut open: Vec<(String, usize)> = Vec::new();

    for value in value.into_list(rule)? {
        match value {
            Value::OpenVoid { tag, html } => {
                open.push((tag, nodes.len()));
                nodes.push(html);
            }
            Value::VoidEnd { tag, end, slice } => {
                let Some(found) = open.iter().rposition(|(name, _)| *name == tag) else {
                    return Err(ParseError::syntax(format!(
                        "Unmatched tag {tag} at {end}.\n\n{slice}"
                    )));
                };
                let (_, index) = open.remove(found);
                if index + 1 != nodes.len() {
                    return Err(BuildError::VoidContent { tag }.into());
                }
            }
            other => nodes.push(other.into_html(rule)?),
        }
    }
    Ok(nodes)
}

fn attribute_list(value: Value, rule: &str) -> Result<Vec<Attribute>, ParseError> {
    let mut attributes = Vec::new();
    for value in value.into_list(rule)? {
        if let Some(attribute) = value.into_attribute(rule)? {
            attributes.push(attribute);
        }
    }
    Ok(attributes)
}

fn from_attribute(attribute: Option<Attribute>) -> Value {
    attribute.map_or(Value::Nothing, Value::Attribute)
}

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

type Result<T, E = ParseError> = std::result::Result<T, E>;
type Insertions = [Insertion];

fn fragment(_: &Insertions, ctx: &Context<'_>, mut args: Args<'_, Value>) -> Result<Value> {
    let nodes = html_list(args.take(0)?, ctx.rule)?;
    Ok(Value::Html(builder::html_splice(nodes)))
}

fn node(_: &Insertions, _: &Context<'_>, mut args: Args<'_, Value>) -> Result<Value> {
    Ok(args.take(0)?)
}

fn node_container(_: &Insertions, ctx: &Context<'_>, mut args: Args<'_, Value>) -> Result<Value> {
    let tag = args.take(1)?.into_text(ctx.rule)?;
    let attributes = attribute_list(args.take(2)?, ctx.rule)?;
    let children = html_list(args.take(4)?, ctx.rule)?;
    let end_tag = args.take(6)?.into_text(ctx.rule)?;

    if tag != end_tag {
        return Err(ParseError::syntax(format!(
            "Unmatched tag {tag} at {}.\n\n{}",
            ctx.source.end(),
            ctx.source.source_slice()
        )));
    }

    Ok(Value::Html(builder::node(&tag, attributes, children)?))
}

fn node_void(_: &Insertions, ctx: &Context<'_>, mut args: Args<'_, Value>) -> Result<Value> {
    let tag = args.take(1)?.into_text(ctx.rule)?;
    let attributes = attribute_list(args.take(2)?, ctx.rule)?;
    let html = builder::node(&tag, attributes, Vec::new())?;
    if args.take(3)?.into_text(ctx.rule)? == "/>" {
        Ok(Value::Html(html))
    } else {
        Ok(Value::OpenVoid { tag, html })
    }
}

fn node_end_void(_: &Insertions, ctx: &Context<'_>, mut args: Args<'_, Value>) -> Result<Value> {
    Ok(Value::VoidEnd {
        tag: args.take(1)?.into_text(ctx.rule)?,
        end: ctx.source.end(),
        slice: ctx.source.source_slice().to_string(),
    })
}

fn text(_: &Insertions, ctx: &Context<'_>, mut args: Args<'_, Value>) -> Result<Value> {
    let content = args.take(0)?.into_text(ctx.rule)?;
    Ok(Value::Html(builder::text(decode_entities(&content))))
}

fn js_expr(insertions: &Insertions, ctx: &Context<'_>, mut args: Args<'_, Value>) -> Result<Value> {
    let index = match args.take(0)? {
        Value::Index(index) => index,
        other => return Err(other.shape(ctx.rule, "an index")),
    };
    let value = insertions
        .get(index)
        .cloned()
        .ok_or_else(|| ParseError::Range {
            index: index.to_string(),
            len: insertions.len(),
        })?;
    Ok(Value::Inserted { index, value })
}

fn attribute_js(_: &Insertions, ctx: &Context<'_>, mut args: Args<'_, Value>) -> Result<Value> {
    let name = args.take(0)?.into_text(ctx.rule)?;
    let attribute = match args.take(2)? {
        Value::Inserted {
            value: Insertion::Attribute(attribute),
            ..
        } => attribute,
        Value::Inserted { index, value } => {
            return Err(ParseError::Type {
                expected: "Attribute",
                found: value.kind(),
                index,
            })
        }
        other => return Err(other.shape(ctx.rule, "an insertion")),
    };
    Ok(from_attribute(builder::attribute(
        &name,
        AttributeValue::Attribute(attribute),
    )))
}

fn attribute_literal(_: &Insertions, ctx: &Context<'_>, mut args: Args<'_, Value>) -> Result<Value> {
    let name = args.take(0)?.into_text(ctx.rule)?;
    let value = args.take(2)?.into_text(ctx.rule)?;
    Ok(from_attribute(builder::attribute(
        &name,
        AttributeValue::Literal(value),
    )))
}

fn attribute_bare(_: &Insertions, ctx: &Context<'_>, _: Args<'_, Value>) -> Result<Value> {
    log::debug!(
        target: "htmpl.bindings",
        "dropping valueless attribute {}",
        ctx.source.source_slice()
    );
    Ok(Value::Nothing)
}

fn insertion_point(insertions: &Insertions, ctx: &Context<'_>, mut args: Args<'_, Value>) -> Result<Value> {
    let mut digits = String::new();
    for digit in args.take(1)?.into_list(ctx.rule)? {
        digits.push_str(&digit.into_text(ctx.rule)?);
    }
    match digits.parse() {
        Ok(index) => Ok(Value::Index(index)),
        // Too many digits for a usize: out of range for any insertion list.
        Err(_) => {
            let index = digits.trim_start_matches('0');
            Err(ParseError::Range {
                index: index.to_string(),
                len: insertions.len(),
            })
        }
    }
}

fn literal(_: &Insertions, ctx: &Context<'_>, mut args: Args<'_, Value>) -> Result<Value> {
    let quoted = args.take(0)?.into_text(ctx.rule)?;
    Ok(Value::Text(unquote(&quoted)?))
}

/// Strip the quotes from a string literal and resolve its escapes.
fn unquote(quoted: &str) -> Result<String> {
    let inner = quoted
        .get(1..quoted.len().saturating_sub(1))
        .unwrap_or_default();
    let invalid = || ParseError::syntax(format!("Invalid escape sequence in {quoted}"));

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next().ok_or_else(invalid)? {
            'b' => out.push('\u{8}'),
            'f' => out.push('\u{c}'),
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            't' => out.push('\t'),
            'u' => {
                let unit = hex4(&mut chars).ok_or_else(invalid)?;
                let code = if (0xD800..0xDC00).contains(&unit) {
                    // High surrogate: a \uXXXX low surrogate must follow.
                    let low = match (chars.next(), chars.next()) {
                        (Some('\\'), Some('u')) => hex4(&mut chars).ok_or_else(invalid)?,
                        _ => return Err(invalid()),
                    };
                    if !(0xDC00..0xE000).contains(&low) {
                        return Err(invalid());
                    }
                    0x10000 + ((unit - 0xD800) << 10) + (low - 0xDC00)
                } else {
                    unit
                };
                out.push(char::from_u32(code).ok_or_else(invalid)?);
            }
            // \" \' \\ \/ and anything else stand for themselves
            other => out.push(other),
        }
    }
    Ok(out)
}

fn hex4(chars: &mut std::str::Chars<'_>) -> Option<u32> {
    let mut value = 0;
    for _ in 0..4 {
        value = value * 16 + chars.next()?.to_digit(16)?;
    }
    Some(value)
}

// ---------------------------------------------------------------------------
// Binding table
// ---------------------------------------------------------------------------

/// Binder specialized for templates.
pub type HtmlBinder = Binder<'static, Insertions, Value, ParseError>;

static BINDINGS: &[Binding<Insertions, Value, ParseError>] = &[
    ("Fragment", 1, fragment),
    ("Node", 1, node),
    ("Node_container", 8, node_container),
    ("Node_void", 4, node_void),
    ("Node_end_void", 3, node_end_void),
    ("Text", 1, text),
    ("JsExpr", 1, js_expr),
    ("Attribute_js", 3, attribute_js),
    ("Attribute_literal", 3, attribute_literal),
    ("Attribute_bare", 1, attribute_bare),
    ("insertion_point", 3, insertion_point),
    ("Literal", 1, literal),
];

static BINDER: LazyLock<Result<HtmlBinder, BinderError>> = LazyLock::new(build);

fn build() -> Result<HtmlBinder, BinderError> {
    Binder::new(htmpl_grammar::html()?, BINDINGS)
}

/// The process-wide template binder, validated on first use.
pub fn binder() -> Result<&'static HtmlBinder> {
    BINDER
        .as_ref()
        .map_err(|err| ParseError::Binder(err.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    // =========================================================================
    // Binding table
    // =========================================================================

    #[test]
    fn test_binding_table_fits_grammar() {
        let binder = binder().unwrap();
        for (rule, _, _) in BINDINGS {
            assert!(binder.has_action(rule), "{rule}");
        }
    }

    // =========================================================================
    // String literals
    // =========================================================================

    #[test]
    fn test_unquote_plain() {
        assert_eq!(unquote("\"main\"").unwrap(), "main");
        assert_eq!(unquote("'main'").unwrap(), "main");
        assert_eq!(unquote("\"\"").unwrap(), "");
    }

    #[test]
    fn test_unquote_escapes() {
        assert_eq!(
            unquote(r#""a\"b\'c\\d\/e\nf\tg""#).unwrap(),
            "a\"b'c\\d/e\nf\tg"
        );
        assert_eq!(unquote(r#""\b\f\r""#).unwrap(), "\u{8}\u{c}\r");
    }

    #[test]
    fn test_unquote_unicode() {
        assert_eq!(unquote(r#""\u00e9\u0041""#).unwrap(), "éA");
        assert_eq!(unquote(r#""\ud83d\ude00""#).unwrap(), "😀");
    }

    #[test]
    fn test_unquote_rejects_bad_unicode() {
        assert!(unquote(r#""\u12""#).is_err());
        assert!(unquote(r#""\uzzzz""#).is_err());
        assert!(unquote(r#""\ud83d""#).is_err());
        let err = unquote(r#""\udc00x""#).unwrap_err();
        assert_eq!(err.kind(), "SyntaxError");
    }

    // =========================================================================
    // Value conversions
    // =========================================================================

    #[test]
    fn test_inserted_attribute_in_content_is_a_type_error() {
        let value = Value::Inserted {
            index: 2,
            value: builder::id("x").into(),
        };
        assert_eq!(
            value.into_html("Fragment"),
            Err(ParseError::Type {
                expected: "Html",
                found: "Attribute",
                index: 2,
            })
        );
    }

    #[test]
    fn test_wrong_shape_is_internal() {
        let err = Value::Index(1).into_text("Text").unwrap_err();
        assert_eq!(err.kind(), "InternalError");
        assert_eq!(
            err.to_string(),
            "Internal error: Rule Text expected text, found an index"
        );
    }

    // =========================================================================
    // Void end tags
    // =========================================================================

    fn open_void(tag: &str) -> Value {
        Value::OpenVoid {
            tag: tag.to_string(),
            html: builder::empty_node(tag, vec![]).unwrap(),
        }
    }

    fn void_end(tag: &str) -> Value {
        Value::VoidEnd {
            tag: tag.to_string(),
            end: LineColumn { line: 0, column: 9 },
            slice: format!("</{tag}>"),
        }
    }

    #[test]
    fn test_void_end_closes_preceding_element() {
        let list = Value::List(vec![open_void("br"), void_end("br"), open_void("hr")]);
        assert_eq!(
            html_list(list, "Fragment").unwrap(),
            vec![
                builder::empty_node("br", vec![]).unwrap(),
                builder::empty_node("hr", vec![]).unwrap(),
            ]
        );
    }

    #[test]
    fn test_void_end_after_content() {
        let list = Value::List(vec![
            open_void("br"),
            Value::Html(builder::text("x")),
            void_end("br"),
        ]);
        assert_eq!(
            html_list(list, "Fragment").unwrap_err().to_string(),
            "The element br does not accept any content."
        );
    }

    #[test]
    fn test_void_end_without_start() {
        let list = Value::List(vec![open_void("br"), void_end("br"), void_end("br")]);
        let err = html_list(list, "Fragment").unwrap_err();
        assert_eq!(err.kind(), "SyntaxError");
        assert_eq!(err.to_string(), "Unmatched tag br at 0, 9.\n\n</br>");
    }

    #[test]
    fn test_dropped_attributes_are_skipped() {
        let list = Value::List(vec![
            Value::Nothing,
            Value::Attribute(builder::id("a")),
            Value::Nothing,
        ]);
        assert_eq!(
            attribute_list(list, "Node_void").unwrap(),
            vec![builder::id("a")]
        );
    }
}
