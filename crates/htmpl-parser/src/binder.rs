//! Generic CST → AST conversion.
//!
//! A `Binder` maps rule names to semantic actions and walks a `Cst`
//! post-order: the children of a node are converted first, then the node's
//! action receives their values. Nothing here knows about HTML; the grammar,
//! the value type and the error type are all parameters.
//!
//! Rules without an action fall back to defaults:
//!
//! | node                             | value                    |
//! |----------------------------------|--------------------------|
//! | terminal                         | its text                 |
//! | iteration                        | list of its children     |
//! | lexical rule                     | its source text          |
//! | syntactic rule with one child    | the child's value        |
//! | anything else                    | `BinderError::MissingAction` |

use std::marker::PhantomData;

use htmpl_grammar::{Cst, Grammar, RuleId, RuleKind};

use crate::position::{Position, Source, SourceCache};
use crate::BinderError;

/// A value type actions can produce and consume.
pub trait SemanticValue: Sized {
    /// The value of a terminal or a lexical rule.
    fn from_text(text: &str) -> Self;

    /// The value of an iteration node.
    fn from_list(values: Vec<Self>) -> Self;
}

/// Signature of a semantic action: shared state, node context, child values.
pub type Action<S, T, E> = fn(&S, &Context<'_>, Args<'_, T>) -> Result<T, E>;

/// One entry of a binding table: rule name, declared arity, action.
pub type Binding<S, T, E> = (&'static str, usize, Action<S, T, E>);

/// What an action knows about the node it is converting.
#[derive(Debug)]
pub struct Context<'a> {
    pub rule: &'a str,
    /// The whole node.
    pub source: Position,
    /// One position per child, in order.
    pub children: Vec<Position>,
}

/// The converted children of a node.
///
/// Each value can be taken once.
#[derive(Debug)]
pub struct Args<'a, T> {
    rule: &'a str,
    values: Vec<Option<T>>,
}

impl<'a, T> Args<'a, T> {
    fn new(rule: &'a str, values: Vec<T>) -> Self {
        Self {
            rule,
            values: values.into_iter().map(Some).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Take the value of child `index`.
    pub fn take(&mut self, index: usize) -> Result<T, BinderError> {
        self.values
            .get_mut(index)
            .and_then(Option::take)
            .ok_or_else(|| BinderError::Shape {
                rule: self.rule.to_string(),
                expected: format!("an unused argument at {index}"),
            })
    }

    pub fn rule(&self) -> &'a str {
        self.rule
    }
}

/// A validated binding table for one grammar.
pub struct Binder<'g, S: ?Sized, T, E> {
    grammar: &'g Grammar,
    /// Indexed by `RuleId`.
    actions: Vec<Option<Action<S, T, E>>>,
    _marker: PhantomData<fn() -> (T, E)>,
}

impl<'g, S, T, E> Binder<'g, S, T, E>
where
    S: ?Sized,
    T: SemanticValue,
    E: From<BinderError>,
{
    /// Resolve `table` against `grammar`. Every rule must exist and every
    /// declared arity must equal the number of children the rule produces.
    pub fn new(grammar: &'g Grammar, table: &[Binding<S, T, E>]) -> Result<Self, BinderError> {
        let mut actions = vec![None; grammar.rule_count()];
        for &(rule, arity, action) in table {
            let id = grammar.rule_id(rule).ok_or_else(|| BinderError::UnknownRule {
                rule: rule.to_string(),
                grammar: grammar.name().to_string(),
            })?;
            let actual = grammar.arity(id);
            if arity != actual {
                return Err(BinderError::Arity {
                    rule: rule.to_string(),
                    declared: arity,
                    actual,
                });
            }
            actions[id.index()] = Some(action);
        }

        log::debug!(
            target: "htmpl.binder",
            "bound {} actions for grammar {}",
            table.len(),
            grammar.name()
        );

        Ok(Self {
            grammar,
            actions,
            _marker: PhantomData,
        })
    }

    pub fn grammar(&self) -> &'g Grammar {
        self.grammar
    }

    /// Whether an action is registered for `rule`.
    pub fn has_action(&self, rule: &str) -> bool {
        self.grammar
            .rule_id(rule)
            .is_some_and(|id| self.action(id).is_some())
    }

    fn action(&self, id: RuleId) -> Option<Action<S, T, E>> {
        self.actions.get(id.index()).copied().flatten()
    }

    /// Convert `cst`, which must have been matched by this binder's grammar
    /// against `source`.
    pub fn transform(&self, cst: &Cst, source: &str, state: &S) -> Result<T, E> {
        let source = SourceCache::global().source(source);
        self.visit(cst, &source, state)
    }

    fn visit(&self, cst: &Cst, source: &Source, state: &S) -> Result<T, E> {
        match cst {
            Cst::Terminal { span } => Ok(T::from_text(span.slice(source.text()))),
            Cst::Iteration { children, .. } => {
                let values = self.visit_all(children, source, state)?;
                Ok(T::from_list(values))
            }
            Cst::Nonterminal {
                rule,
                children,
                span,
            } => {
                let name = self.grammar.rule_name(*rule);
                if let Some(action) = self.action(*rule) {
                    let values = self.visit_all(children, source, state)?;
                    let context = Context {
                        rule: name,
                        source: source.position(*span),
                        children: children
                            .iter()
                            .map(|child| source.position(child.span()))
                            .collect(),
                    };
                    log::trace!(target: "htmpl.binder", "{name} @{}..{}", span.start, span.end);
                    return action(state, &context, Args::new(name, values));
                }

                match (self.grammar.rule_kind(*rule), children.as_slice()) {
                    (RuleKind::Lexical, _) => Ok(T::from_text(span.slice(source.text()))),
                    (RuleKind::Syntactic, [only]) => self.visit(only, source, state),
                    (RuleKind::Syntactic, _) => Err(BinderError::MissingAction {
                        rule: name.to_string(),
                    }
                    .into()),
                }
            }
        }
    }

    fn visit_all(&self, children: &[Cst], source: &Source, state: &S) -> Result<Vec<T>, E> {
        children
            .iter()
            .map(|child| self.visit(child, source, state))
            .collect()
    }
}
