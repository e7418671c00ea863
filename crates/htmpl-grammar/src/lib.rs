//! htmpl Grammar
//!
//! A small parsing-expression-grammar engine and the HTML template grammar
//! built on top of it. Matching a source string yields a concrete syntax
//! tree (`Cst`) shaped by rule names, or a `MatchError` pointing at the
//! furthest position the matcher could reach.
//!
//! Rules follow the Ohm conventions: *syntactic* rules skip whitespace before
//! every terminal and rule application, *lexical* rules never do, and
//! `Expr::Lex` switches a sub-expression back to lexical matching.
//!
//! # Example
//!
//! ```
//! let grammar = htmpl_grammar::html().unwrap();
//! let cst = grammar.match_source("<p>Hi</p>", None).unwrap();
//! assert_eq!(grammar.rule_name(cst.rule().unwrap()), "Fragment");
//! ```

pub mod cst;
pub mod html;
pub mod peg;

pub use cst::{Cst, Span};
pub use html::html;
pub use peg::{Expr, Grammar, Rule, RuleId, RuleKind, MAX_DEPTH};

/// Match failure with position information.
///
/// Line and column are 1-based, the way editors report them.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Match error at line {line}, column {column}: {message}")]
pub struct MatchError {
    pub message: String,
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

/// A grammar definition that cannot be compiled.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GrammarError {
    #[error("Rule {rule} is defined more than once")]
    DuplicateRule { rule: String },

    #[error("Rule {referenced_by} applies undefined rule {rule}")]
    UndefinedRule { rule: String, referenced_by: String },

    #[error("Alternatives of rule {rule} disagree on arity: expected {expected}, found {found}")]
    ArityMismatch {
        rule: String,
        expected: usize,
        found: usize,
    },

    #[error("Start rule {rule} is not defined")]
    MissingStart { rule: String },
}
