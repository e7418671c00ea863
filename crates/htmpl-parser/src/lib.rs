//! htmpl Parser
//!
//! Turns template source plus an ordered list of insertions into an `Html`
//! tree. The grammar produces a CST, a generic `Binder` walks it, and the
//! HTML bindings build the nodes.
//!
//! ```text
//! source ──▶ htmpl_grammar::html() ──▶ Cst ──▶ Binder + bindings ──▶ Html
//! ```
//!
//! Insertion points are written `{{N}}`; `Template` and `template()` generate
//! them from interleaved strings and values.

pub mod binder;
pub mod bindings;
pub mod parser;
pub mod position;

pub use binder::{Action, Args, Binder, Binding, Context, SemanticValue};
pub use parser::{parse, template, Template};
pub use position::{compute_position, LineColumn, LineSpan, Position, SourceCache};

use htmpl_ast::BuildError;
use htmpl_grammar::{GrammarError, MatchError};

/// A binding table that does not fit its grammar, or a CST the table cannot
/// handle. These are bugs in the bindings, not in the template.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BinderError {
    #[error("Grammar {grammar} has no rule {rule}")]
    UnknownRule { rule: String, grammar: String },

    #[error("Action for {rule} takes {declared} arguments, but the rule has {actual}")]
    Arity {
        rule: String,
        declared: usize,
        actual: usize,
    },

    #[error("No action for rule {rule}")]
    MissingAction { rule: String },

    #[error("Rule {rule} expected {expected}")]
    Shape { rule: String, expected: String },

    #[error(transparent)]
    Grammar(#[from] GrammarError),
}

/// Why a template could not be turned into nodes.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    /// The source does not match the grammar, or is well-formed but not
    /// valid HTML (mismatched tags, content in a void element).
    #[error("{message}")]
    Syntax { message: String },

    /// An insertion point refers past the end of the insertion list. `index`
    /// is the index as written, which may not fit a `usize`.
    #[error("Insertion out of range {index} out of {len} (this is an internal error)")]
    Range { index: String, len: usize },

    /// An insertion of the wrong kind for where it appears.
    #[error("Expected {expected} for insertion {index}, found {found}")]
    Type {
        expected: &'static str,
        found: &'static str,
        index: usize,
    },

    #[error("Internal error: {0}")]
    Binder(#[from] BinderError),
}

impl ParseError {
    pub(crate) fn syntax(message: impl Into<String>) -> Self {
        ParseError::Syntax {
            message: message.into(),
        }
    }

    /// The class of the error, named after the exception a script engine
    /// would raise for it.
    pub fn kind(&self) -> &'static str {
        match self {
            ParseError::Syntax { .. } => "SyntaxError",
            ParseError::Range { .. } => "RangeError",
            ParseError::Type { .. } => "TypeError",
            ParseError::Binder(_) => "InternalError",
        }
    }
}

impl From<MatchError> for ParseError {
    fn from(err: MatchError) -> Self {
        ParseError::syntax(err.to_string())
    }
}

impl From<BuildError> for ParseError {
    fn from(err: BuildError) -> Self {
        ParseError::syntax(err.to_string())
    }
}

impl From<GrammarError> for ParseError {
    fn from(err: GrammarError) -> Self {
        ParseError::Binder(err.into())
    }
}
