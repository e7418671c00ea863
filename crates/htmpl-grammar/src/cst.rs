use crate::peg::{Grammar, RuleId};

/// A byte range in source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// The text this span covers in `source`.
    pub fn slice<'s>(&self, source: &'s str) -> &'s str {
        &source[self.start..self.end]
    }
}

/// A node of the concrete syntax tree produced by `Grammar::match_source`.
///
/// Nonterminals carry the id of the rule that produced them; the rule's name
/// and kind are looked up on the grammar that did the matching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cst {
    /// A matched literal, character range or `any` character.
    Terminal { span: Span },

    /// A rule application with one child per term of the rule body.
    Nonterminal {
        rule: RuleId,
        children: Vec<Cst>,
        span: Span,
    },

    /// One column of a `*`, `+` or `?` operator.
    Iteration { children: Vec<Cst>, span: Span },
}

impl Cst {
    pub fn span(&self) -> Span {
        match self {
            Cst::Terminal { span }
            | Cst::Nonterminal { span, .. }
            | Cst::Iteration { span, .. } => *span,
        }
    }

    /// The producing rule, for nonterminals.
    pub fn rule(&self) -> Option<RuleId> {
        match self {
            Cst::Nonterminal { rule, .. } => Some(*rule),
            _ => None,
        }
    }

    pub fn children(&self) -> &[Cst] {
        match self {
            Cst::Terminal { .. } => &[],
            Cst::Nonterminal { children, .. } | Cst::Iteration { children, .. } => children,
        }
    }

    /// Render the tree as an indented outline, one node per line.
    pub fn dump(&self, grammar: &Grammar, source: &str) -> String {
        let mut out = String::new();
        self.dump_into(grammar, source, 0, &mut out);
        out
    }

    fn dump_into(&self, grammar: &Grammar, source: &str, depth: usize, out: &mut String) {
        let indent = "  ".repeat(depth);
        let span = self.span();
        match self {
            Cst::Terminal { .. } => {
                out.push_str(&format!(
                    "{indent}{:?} @{}..{}\n",
                    span.slice(source),
                    span.start,
                    span.end
                ));
            }
            Cst::Nonterminal { rule, .. } => {
                out.push_str(&format!(
                    "{indent}{} @{}..{}\n",
                    grammar.rule_name(*rule),
                    span.start,
                    span.end
                ));
            }
            Cst::Iteration { children, .. } => {
                out.push_str(&format!("{indent}* [{}]\n", children.len()));
            }
        }
        for child in self.children() {
            child.dump_into(grammar, source, depth + 1, out);
        }
    }
}
