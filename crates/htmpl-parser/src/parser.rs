//! Template parsing entry points.
//!
//! `parse` takes source with `{{N}}` insertion points and the values they
//! refer to. `Template` and `template` build that source from interleaved
//! literal strings and values, the way a tagged template literal would.

use htmpl_ast::{Html, Insertion};

use crate::bindings;
use crate::ParseError;

/// Parse template source into nodes.
///
/// The result is always an `Html::HtmlSplice` holding the top-level nodes in
/// source order.
pub fn parse(source: &str, insertions: &[Insertion]) -> Result<Html, ParseError> {
    log::debug!(
        target: "htmpl.parser",
        "parsing {} bytes with {} insertions",
        source.len(),
        insertions.len()
    );

    let grammar = htmpl_grammar::html()?;
    let cst = grammar.match_source(source, None)?;
    bindings::binder()?
        .transform(&cst, source, insertions)?
        .into_html("Fragment")
}

/// Parse literal `strings` with `insertions` between them.
///
/// `strings[i]` is followed by insertion `i`; the last string is followed by
/// nothing. An insertion point without a matching value is a range error.
pub fn template<S: AsRef<str>>(strings: &[S], insertions: Vec<Insertion>) -> Result<Html, ParseError> {
    let mut builder = Template::new();
    for (i, string) in strings.iter().enumerate() {
        builder.push_source(string.as_ref());
        if i + 1 < strings.len() {
            builder.push_point(i);
        }
    }
    builder.insertions = insertions;
    builder.parse()
}

/// Incrementally assembled template.
///
/// ```
/// use htmpl_ast::builder::{class_names, text};
/// use htmpl_parser::Template;
///
/// let html = Template::new()
///     .source("<p className=")
///     .insert(class_names(["intro"]))
///     .source(">")
///     .insert(text("Hi & bye"))
///     .source("</p>")
///     .parse()
///     .unwrap();
/// assert_eq!(html.render().unwrap(), "<p class=\"intro\">Hi &amp; bye</p>");
/// ```
#[derive(Debug, Clone, Default)]
pub struct Template {
    source: String,
    insertions: Vec<Insertion>,
}

impl Template {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append literal template text.
    pub fn source(mut self, text: &str) -> Self {
        self.push_source(text);
        self
    }

    /// Append a value, referenced from the source by a fresh insertion point.
    pub fn insert(mut self, value: impl Into<Insertion>) -> Self {
        self.push_point(self.insertions.len());
        self.insertions.push(value.into());
        self
    }

    fn push_source(&mut self, text: &str) {
        self.source.push_str(text);
    }

    fn push_point(&mut self, index: usize) {
        self.source.push_str(&format!("{{{{{index}}}}}"));
    }

    /// The assembled source, with insertion points.
    pub fn source_text(&self) -> &str {
        &self.source
    }

    pub fn insertions(&self) -> &[Insertion] {
        &self.insertions
    }

    pub fn parse(&self) -> Result<Html, ParseError> {
        parse(&self.source, &self.insertions)
    }
}
