//! Parsing-expression-grammar engine.
//!
//! A grammar is defined as a list of `Rule`s whose bodies are `Expr` trees.
//! `Grammar::compile` resolves rule references, validates the definition and
//! computes each rule's arity, i.e. how many CST children an application of
//! that rule produces:
//!
//! - terminals and rule applications count one,
//! - a sequence sums its parts,
//! - `*`, `+` and `?` produce one `Iteration` node per column of their operand,
//! - lookaheads count zero,
//! - every alternative of a choice must have the same arity.
//!
//! Matching is plain recursive backtracking (no packrat memo). The matcher
//! remembers the furthest offset at which a terminal failed and what was
//! expected there, which becomes the `MatchError` message. Rule applications
//! nest at most `MAX_DEPTH` deep; deeper input fails with a `MatchError`
//! instead of exhausting the stack.

use std::collections::HashMap;

use crate::cst::{Cst, Span};
use crate::{GrammarError, MatchError};

/// Deepest chain of nested rule applications a match may build.
pub const MAX_DEPTH: usize = 256;

/// Index of a rule inside its compiled grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RuleId(usize);

impl RuleId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Whether a rule body skips whitespace between its terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    /// Whitespace is skipped before every terminal and rule application.
    Syntactic,
    /// Every character is significant.
    Lexical,
}

/// A parsing expression, as written in a grammar definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Literal(String),
    /// ASCII case-insensitive literal.
    LiteralNoCase(String),
    Range(char, char),
    Any,
    Apply(String),
    Seq(Vec<Expr>),
    /// Ordered choice: the first alternative that matches wins.
    Alt(Vec<Expr>),
    Star(Box<Expr>),
    Plus(Box<Expr>),
    Opt(Box<Expr>),
    NotFollowedBy(Box<Expr>),
    FollowedBy(Box<Expr>),
    /// Match the operand without skipping whitespace (Ohm's `#(...)`).
    Lex(Box<Expr>),
}

impl Expr {
    pub fn lit(text: &str) -> Self {
        Expr::Literal(text.to_string())
    }

    pub fn lit_nocase(text: &str) -> Self {
        Expr::LiteralNoCase(text.to_string())
    }

    pub fn range(lo: char, hi: char) -> Self {
        Expr::Range(lo, hi)
    }

    pub fn apply(rule: &str) -> Self {
        Expr::Apply(rule.to_string())
    }

    pub fn seq(items: impl IntoIterator<Item = Expr>) -> Self {
        Expr::Seq(items.into_iter().collect())
    }

    pub fn alt(items: impl IntoIterator<Item = Expr>) -> Self {
        Expr::Alt(items.into_iter().collect())
    }

    pub fn star(self) -> Self {
        Expr::Star(Box::new(self))
    }

    pub fn plus(self) -> Self {
        Expr::Plus(Box::new(self))
    }

    pub fn opt(self) -> Self {
        Expr::Opt(Box::new(self))
    }

    pub fn not_followed_by(expr: Expr) -> Self {
        Expr::NotFollowedBy(Box::new(expr))
    }

    pub fn followed_by(expr: Expr) -> Self {
        Expr::FollowedBy(Box::new(expr))
    }

    pub fn lex(expr: Expr) -> Self {
        Expr::Lex(Box::new(expr))
    }
}

/// A named rule of a grammar definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    name: String,
    kind: RuleKind,
    body: Expr,
    description: Option<String>,
}

impl Rule {
    pub fn syntactic(name: &str, body: Expr) -> Self {
        Self::new(name, RuleKind::Syntactic, body)
    }

    pub fn lexical(name: &str, body: Expr) -> Self {
        Self::new(name, RuleKind::Lexical, body)
    }

    fn new(name: &str, kind: RuleKind, body: Expr) -> Self {
        Self {
            name: name.to_string(),
            kind,
            body,
            description: None,
        }
    }

    /// Report failures of this rule as a whole ("expected a tag name")
    /// instead of listing the terminals inside it.
    pub fn describe(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }
}

/// Resolved form of `Expr`: rule references are ids, iterations know their arity.
#[derive(Debug)]
enum Term {
    Literal(String),
    LiteralNoCase(String),
    Range(char, char),
    Any,
    Apply(RuleId),
    Seq(Vec<Term>),
    Alt(Vec<Term>),
    Iter {
        term: Box<Term>,
        min: usize,
        max: Option<usize>,
        arity: usize,
    },
    NotFollowedBy(Box<Term>),
    FollowedBy(Box<Term>),
    Lex(Box<Term>),
}

#[derive(Debug)]
struct CompiledRule {
    name: String,
    kind: RuleKind,
    description: Option<String>,
    body: Term,
    arity: usize,
}

/// A compiled grammar, ready to match source text.
#[derive(Debug)]
pub struct Grammar {
    name: String,
    rules: Vec<CompiledRule>,
    index: HashMap<String, RuleId>,
    start: RuleId,
}

impl Grammar {
    /// Compile a grammar definition. `start` names the default rule for
    /// `match_source`.
    pub fn compile(name: &str, start: &str, rules: Vec<Rule>) -> Result<Self, GrammarError> {
        let mut index = HashMap::new();
        for (i, rule) in rules.iter().enumerate() {
            if index.insert(rule.name.clone(), RuleId(i)).is_some() {
                return Err(GrammarError::DuplicateRule {
                    rule: rule.name.clone(),
                });
            }
        }

        let start = *index.get(start).ok_or_else(|| GrammarError::MissingStart {
            rule: start.to_string(),
        })?;

        let mut compiled = Vec::with_capacity(rules.len());
        for rule in rules {
            let body = resolve(&rule.body, &rule.name, &index)?;
            let arity = arity_of(&body, &rule.name)?;
            compiled.push(CompiledRule {
                name: rule.name,
                kind: rule.kind,
                description: rule.description,
                body,
                arity,
            });
        }

        log::debug!(target: "htmpl.grammar", "compiled grammar {name} ({} rules)", compiled.len());

        Ok(Self {
            name: name.to_string(),
            rules: compiled,
            index,
            start,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn start_rule(&self) -> RuleId {
        self.start
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    pub fn rule_id(&self, name: &str) -> Option<RuleId> {
        self.index.get(name).copied()
    }

    pub fn rule_name(&self, id: RuleId) -> &str {
        &self.rules[id.0].name
    }

    pub fn rule_kind(&self, id: RuleId) -> RuleKind {
        self.rules[id.0].kind
    }

    /// Number of CST children an application of `id` produces.
    pub fn arity(&self, id: RuleId) -> usize {
        self.rules[id.0].arity
    }

    /// Match the whole of `source` against `rule`, or the start rule.
    pub fn match_source(&self, source: &str, rule: Option<&str>) -> Result<Cst, MatchError> {
        let start = match rule {
            Some(name) => self.rule_id(name).ok_or_else(|| MatchError {
                message: format!("unknown rule {name}"),
                offset: 0,
                line: 1,
                column: 1,
            })?,
            None => self.start,
        };

        log::trace!(
            target: "htmpl.grammar",
            "matching {} bytes against {}.{}",
            source.len(),
            self.name,
            self.rule_name(start)
        );

        let mut matcher = Matcher::new(self, source);
        let matched = matcher.apply(start, 0);
        if let (Some((end, cst)), None) = (matched, matcher.too_deep) {
            let end = match self.rule_kind(start) {
                RuleKind::Syntactic => matcher.skip_space(end),
                RuleKind::Lexical => end,
            };
            if end == source.len() {
                return Ok(cst);
            }
            matcher.expect(end, || "end of input".to_string());
        }

        Err(matcher.into_error())
    }
}

fn resolve(
    expr: &Expr,
    rule: &str,
    index: &HashMap<String, RuleId>,
) -> Result<Term, GrammarError> {
    let all = |items: &[Expr]| {
        items
            .iter()
            .map(|item| resolve(item, rule, index))
            .collect::<Result<Vec<_>, _>>()
    };
    let iter = |operand: &Expr, min: usize, max: Option<usize>| {
        let term = resolve(operand, rule, index)?;
        let arity = arity_of(&term, rule)?;
        Ok::<_, GrammarError>(Term::Iter {
            term: Box::new(term),
            min,
            max,
            arity,
        })
    };

    Ok(match expr {
        Expr::Literal(text) => Term::Literal(text.clone()),
        Expr::LiteralNoCase(text) => Term::LiteralNoCase(text.clone()),
        Expr::Range(lo, hi) => Term::Range(*lo, *hi),
        Expr::Any => Term::Any,
        Expr::Apply(name) => {
            Term::Apply(*index.get(name).ok_or_else(|| GrammarError::UndefinedRule {
                rule: name.clone(),
                referenced_by: rule.to_string(),
            })?)
        }
        Expr::Seq(items) => Term::Seq(all(items)?),
        Expr::Alt(items) => Term::Alt(all(items)?),
        Expr::Star(operand) => iter(operand, 0, None)?,
        Expr::Plus(operand) => iter(operand, 1, None)?,
        Expr::Opt(operand) => iter(operand, 0, Some(1))?,
        Expr::NotFollowedBy(operand) => {
            Term::NotFollowedBy(Box::new(resolve(operand, rule, index)?))
        }
        Expr::FollowedBy(operand) => Term::FollowedBy(Box::new(resolve(operand, rule, index)?)),
        Expr::Lex(operand) => Term::Lex(Box::new(resolve(operand, rule, index)?)),
    })
}

fn arity_of(term: &Term, rule: &str) -> Result<usize, GrammarError> {
    match term {
        Term::Literal(_) | Term::LiteralNoCase(_) | Term::Range(..) | Term::Any | Term::Apply(_) => {
            Ok(1)
        }
        Term::Seq(items) => items.iter().map(|item| arity_of(item, rule)).sum(),
        Term::Alt(items) => {
            let mut expected = None;
            for item in items {
                let found = arity_of(item, rule)?;
                match expected {
                    None => expected = Some(found),
                    Some(expected) if expected != found => {
                        return Err(GrammarError::ArityMismatch {
                            rule: rule.to_string(),
                            expected,
                            found,
                        });
                    }
                    Some(_) => {}
                }
            }
            Ok(expected.unwrap_or(0))
        }
        Term::Iter { arity, .. } => Ok(*arity),
        Term::NotFollowedBy(_) | Term::FollowedBy(_) => Ok(0),
        Term::Lex(operand) => arity_of(operand, rule),
    }
}

/// Single-use matching state for one `match_source` call.
struct Matcher<'g, 's> {
    grammar: &'g Grammar,
    source: &'s str,
    furthest: usize,
    expected: Vec<String>,
    /// Depth of lookaheads and described rules; failures are not recorded while > 0.
    quiet: usize,
    /// Current nesting of rule applications.
    depth: usize,
    /// Where `MAX_DEPTH` was first exceeded. Once set, every application fails.
    too_deep: Option<usize>,
}

impl<'g, 's> Matcher<'g, 's> {
    fn new(grammar: &'g Grammar, source: &'s str) -> Self {
        Self {
            grammar,
            source,
            furthest: 0,
            expected: Vec::new(),
            quiet: 0,
            depth: 0,
            too_deep: None,
        }
    }

    fn skip_space(&self, pos: usize) -> usize {
        let rest = &self.source[pos..];
        pos + (rest.len() - rest.trim_start_matches(|c: char| c.is_ascii_whitespace()).len())
    }

    fn skip_if(&self, skip: bool, pos: usize) -> usize {
        if skip {
            self.skip_space(pos)
        } else {
            pos
        }
    }

    fn expect(&mut self, pos: usize, what: impl FnOnce() -> String) {
        if self.quiet > 0 || pos < self.furthest {
            return;
        }
        if pos > self.furthest {
            self.furthest = pos;
            self.expected.clear();
        }
        let what = what();
        if !self.expected.contains(&what) {
            self.expected.push(what);
        }
    }

    fn apply(&mut self, id: RuleId, pos: usize) -> Option<(usize, Cst)> {
        let grammar = self.grammar;
        let rule = &grammar.rules[id.0];
        let skip = rule.kind == RuleKind::Syntactic;
        let start = self.skip_if(skip, pos);

        if self.too_deep.is_some() || self.depth == MAX_DEPTH {
            self.too_deep.get_or_insert(start);
            return None;
        }

        if rule.description.is_some() {
            self.quiet += 1;
        }
        let mut children = Vec::with_capacity(rule.arity);
        self.depth += 1;
        let end = self.eval(&rule.body, start, skip, &mut children);
        self.depth -= 1;
        if let Some(description) = &rule.description {
            self.quiet -= 1;
            if end.is_none() {
                self.expect(start, || description.clone());
            }
        }

        let end = end?;
        Some((
            end,
            Cst::Nonterminal {
                rule: id,
                children,
                span: Span::new(start, end),
            },
        ))
    }

    fn eval(&mut self, term: &'g Term, pos: usize, skip: bool, out: &mut Vec<Cst>) -> Option<usize> {
        match term {
            Term::Literal(text) => {
                let pos = self.skip_if(skip, pos);
                if self.source[pos..].starts_with(text.as_str()) {
                    self.terminal(pos, pos + text.len(), out)
                } else {
                    self.expect(pos, || format!("{text:?}"));
                    None
                }
            }
            Term::LiteralNoCase(text) => {
                let pos = self.skip_if(skip, pos);
                let end = pos + text.len();
                let matched = self
                    .source
                    .as_bytes()
                    .get(pos..end)
                    .is_some_and(|bytes| bytes.eq_ignore_ascii_case(text.as_bytes()));
                if matched {
                    self.terminal(pos, end, out)
                } else {
                    self.expect(pos, || format!("{text:?}"));
                    None
                }
            }
            Term::Range(lo, hi) => {
                let pos = self.skip_if(skip, pos);
                match self.source[pos..].chars().next() {
                    Some(c) if (*lo..=*hi).contains(&c) => self.terminal(pos, pos + c.len_utf8(), out),
                    _ => {
                        self.expect(pos, || format!("a character in {lo:?}..{hi:?}"));
                        None
                    }
                }
            }
            Term::Any => {
                let pos = self.skip_if(skip, pos);
                match self.source[pos..].chars().next() {
                    Some(c) => self.terminal(pos, pos + c.len_utf8(), out),
                    None => {
                        self.expect(pos, || "any character".to_string());
                        None
                    }
                }
            }
            Term::Apply(id) => {
                let pos = self.skip_if(skip, pos);
                let (end, node) = self.apply(*id, pos)?;
                out.push(node);
                Some(end)
            }
            Term::Seq(items) => {
                let mark = out.len();
                let mut pos = pos;
                for item in items {
                    match self.eval(item, pos, skip, out) {
                        Some(next) => pos = next,
                        None => {
                            out.truncate(mark);
                            return None;
                        }
                    }
                }
                Some(pos)
            }
            Term::Alt(items) => {
                let mark = out.len();
                for item in items {
                    if let Some(end) = self.eval(item, pos, skip, out) {
                        return Some(end);
                    }
                    out.truncate(mark);
                }
                None
            }
            Term::Iter {
                term,
                min,
                max,
                arity,
            } => {
                let mut columns: Vec<Vec<Cst>> = (0..*arity).map(|_| Vec::new()).collect();
                let mut row = Vec::with_capacity(*arity);
                let mut count = 0;
                let mut end = pos;
                while max.map_or(true, |max| count < max) {
                    row.clear();
                    let Some(next) = self.eval(term, end, skip, &mut row) else {
                        break;
                    };
                    for (column, node) in columns.iter_mut().zip(row.drain(..)) {
                        column.push(node);
                    }
                    count += 1;
                    // Zero-width matches would repeat forever.
                    if next == end {
                        break;
                    }
                    end = next;
                }
                if count < *min {
                    return None;
                }
                let span = Span::new(pos, end);
                out.extend(
                    columns
                        .into_iter()
                        .map(|children| Cst::Iteration { children, span }),
                );
                Some(end)
            }
            Term::NotFollowedBy(operand) => {
                if self.lookahead(operand, pos, skip) {
                    None
                } else {
                    Some(pos)
                }
            }
            Term::FollowedBy(operand) => {
                if self.lookahead(operand, pos, skip) {
                    Some(pos)
                } else {
                    None
                }
            }
            Term::Lex(operand) => self.eval(operand, pos, false, out),
        }
    }

    fn lookahead(&mut self, term: &'g Term, pos: usize, skip: bool) -> bool {
        self.quiet += 1;
        let mut scratch = Vec::new();
        let hit = self.eval(term, pos, skip, &mut scratch).is_some();
        self.quiet -= 1;
        hit
    }

    fn terminal(&mut self, start: usize, end: usize, out: &mut Vec<Cst>) -> Option<usize> {
        out.push(Cst::Terminal {
            span: Span::new(start, end),
        });
        Some(end)
    }

    fn into_error(self) -> MatchError {
        if let Some(offset) = self.too_deep {
            let (line, column) = line_column(self.source, offset);
            return MatchError {
                message: format!("input nested too deeply (more than {MAX_DEPTH} rules)"),
                offset,
                line,
                column,
            };
        }

        let (line, column) = line_column(self.source, self.furthest);
        let found = match self.source[self.furthest..].chars().next() {
            Some(c) => format!("{c:?}"),
            None => "end of input".to_string(),
        };
        let message = match self.expected.split_last() {
            None => format!("unexpected {found}"),
            Some((only, [])) => format!("expected {only}, found {found}"),
            Some((last, rest)) => format!("expected {} or {last}, found {found}", rest.join(", ")),
        };
        MatchError {
            message,
            offset: self.furthest,
            line,
            column,
        }
    }
}

/// 1-based line and column (in characters) of a byte offset.
fn line_column(source: &str, offset: usize) -> (usize, usize) {
    let bytes = &source.as_bytes()[..offset];
    let mut line = 1;
    let mut line_start = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\r' => {
                // \r\n is a single newline
                if bytes.get(i + 1) == Some(&b'\n') {
                    i += 1;
                }
                line += 1;
                line_start = i + 1;
            }
            b'\n' => {
                line += 1;
                line_start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }
    (line, source[line_start.min(offset)..offset].chars().count() + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// `List = "[" Item* "]"`, `Item = word ","?`, `word = letter+`
    fn list_grammar() -> Grammar {
        Grammar::compile(
            "List",
            "List",
            vec![
                Rule::syntactic(
                    "List",
                    Expr::seq([Expr::lit("["), Expr::apply("Item").star(), Expr::lit("]")]),
                ),
                Rule::syntactic(
                    "Item",
                    Expr::seq([Expr::apply("word"), Expr::lit(",").opt()]),
                ),
                Rule::lexical("word", Expr::range('a', 'z').plus()).describe("a word"),
            ],
        )
        .unwrap()
    }

    fn rule_of<'g>(grammar: &'g Grammar, node: &Cst) -> &'g str {
        grammar.rule_name(node.rule().unwrap())
    }

    // =========================================================================
    // Compilation
    // =========================================================================

    #[test]
    fn test_arity() {
        let grammar = list_grammar();
        assert_eq!(grammar.arity(grammar.rule_id("List").unwrap()), 3);
        assert_eq!(grammar.arity(grammar.rule_id("Item").unwrap()), 2);
        assert_eq!(grammar.arity(grammar.rule_id("word").unwrap()), 1);
    }

    #[test]
    fn test_duplicate_rule() {
        let err = Grammar::compile(
            "G",
            "a",
            vec![
                Rule::lexical("a", Expr::lit("x")),
                Rule::lexical("a", Expr::lit("y")),
            ],
        )
        .unwrap_err();
        assert_eq!(err, GrammarError::DuplicateRule { rule: "a".into() });
    }

    #[test]
    fn test_undefined_rule() {
        let err = Grammar::compile("G", "a", vec![Rule::lexical("a", Expr::apply("b"))])
            .unwrap_err();
        assert_eq!(
            err,
            GrammarError::UndefinedRule {
                rule: "b".into(),
                referenced_by: "a".into()
            }
        );
    }

    #[test]
    fn test_missing_start() {
        let err = Grammar::compile("G", "main", vec![Rule::lexical("a", Expr::Any)]).unwrap_err();
        assert_eq!(err, GrammarError::MissingStart { rule: "main".into() });
    }

    #[test]
    fn test_alternatives_must_agree_on_arity() {
        let err = Grammar::compile(
            "G",
            "a",
            vec![Rule::lexical(
                "a",
                Expr::alt([Expr::lit("x"), Expr::seq([Expr::lit("y"), Expr::lit("z")])]),
            )],
        )
        .unwrap_err();
        assert_eq!(
            err,
            GrammarError::ArityMismatch {
                rule: "a".into(),
                expected: 1,
                found: 2
            }
        );
    }

    // =========================================================================
    // Matching
    // =========================================================================

    #[test]
    fn test_syntactic_rules_skip_whitespace() {
        let grammar = list_grammar();
        let cst = grammar.match_source(" [ ab , cd ] ", None).unwrap();
        assert_eq!(rule_of(&grammar, &cst), "List");
        assert_eq!(cst.children().len(), 3);

        let items = &cst.children()[1];
        assert!(matches!(items, Cst::Iteration { .. }));
        assert_eq!(items.children().len(), 2);
        let first_word = &items.children()[0].children()[0];
        assert_eq!(first_word.span().slice(" [ ab , cd ] "), "ab");
    }

    #[test]
    fn test_lexical_rules_do_not_skip() {
        let grammar = list_grammar();
        assert!(grammar.match_source("[a b]", None).is_ok());
        assert!(grammar.match_source("a b", Some("word")).is_err());
    }

    #[test]
    fn test_optional_produces_one_iteration_per_column() {
        let grammar = list_grammar();
        let cst = grammar.match_source("[ab]", None).unwrap();
        let item = &cst.children()[1].children()[0];
        assert_eq!(rule_of(&grammar, item), "Item");
        // word + empty `","?` column
        assert_eq!(item.children().len(), 2);
        assert!(item.children()[1].children().is_empty());
    }

    #[test]
    fn test_lookahead_consumes_nothing() {
        let grammar = Grammar::compile(
            "G",
            "a",
            vec![Rule::lexical(
                "a",
                Expr::seq([
                    Expr::followed_by(Expr::lit("ab")),
                    Expr::lit("a"),
                    Expr::not_followed_by(Expr::lit("c")),
                    Expr::Any,
                ]),
            )],
        )
        .unwrap();
        assert_eq!(grammar.arity(grammar.rule_id("a").unwrap()), 2);
        assert!(grammar.match_source("ab", None).is_ok());
        assert!(grammar.match_source("ac", None).is_err());
    }

    #[test]
    fn test_case_insensitive_literal() {
        let grammar =
            Grammar::compile("G", "a", vec![Rule::lexical("a", Expr::lit_nocase("br"))]).unwrap();
        assert!(grammar.match_source("BR", None).is_ok());
        assert!(grammar.match_source("bR", None).is_ok());
        assert!(grammar.match_source("b", None).is_err());
    }

    // =========================================================================
    // Failures
    // =========================================================================

    #[test]
    fn test_failure_reports_furthest_position() {
        let grammar = list_grammar();
        let err = grammar.match_source("[ab,\n  1]", None).unwrap_err();
        assert_eq!(err.line, 2);
        assert_eq!(err.column, 3);
        assert_eq!(err.offset, 7);
        assert_eq!(err.message, "expected a word or \"]\", found '1'");
    }

    #[test]
    fn test_trailing_input_is_an_error() {
        let grammar = list_grammar();
        let err = grammar.match_source("[ab] x", None).unwrap_err();
        assert!(err.message.contains("end of input"), "{}", err.message);
    }

    #[test]
    fn test_unknown_start_rule() {
        let grammar = list_grammar();
        let err = grammar.match_source("[]", Some("Nope")).unwrap_err();
        assert_eq!(err.message, "unknown rule Nope");
    }

    #[test]
    fn test_nesting_limit() {
        // `Nest = "(" Nest? ")"`
        let grammar = Grammar::compile(
            "G",
            "Nest",
            vec![Rule::syntactic(
                "Nest",
                Expr::seq([Expr::lit("("), Expr::apply("Nest").opt(), Expr::lit(")")]),
            )],
        )
        .unwrap();

        let nested = |depth: usize| format!("{}{}", "(".repeat(depth), ")".repeat(depth));
        assert!(grammar.match_source(&nested(MAX_DEPTH - 1), None).is_ok());

        // The innermost `Nest?` is tried one level further down.
        let err = grammar.match_source(&nested(MAX_DEPTH), None).unwrap_err();
        assert_eq!(err.offset, MAX_DEPTH);
        assert_eq!((err.line, err.column), (1, MAX_DEPTH + 1));
        assert!(err.message.contains("nested too deeply"), "{}", err.message);

        let err = grammar.match_source(&nested(20_000), None).unwrap_err();
        assert!(err.message.contains("nested too deeply"), "{}", err.message);
    }

    #[test]
    fn test_line_column_counts_crlf_once() {
        assert_eq!(line_column("a\r\nb", 3), (2, 1));
        assert_eq!(line_column("a\rb\nc", 4), (3, 1));
        assert_eq!(line_column("héllo", 3), (1, 3));
    }
}
