//! The HTML template grammar.
//!
//! ```text
//! Fragment          = Node*
//! Node              = Text | JsExpr | Node_void | Node_end_void | Node_container
//! Node_void         = "<" tag_name Attribute* "/>"
//!                   | "<" &void_tag_name tag_name Attribute* ">"
//! Node_end_void     = "</" &void_tag_name tag_name ">"
//! Node_container    = "<" tag_name Attribute* ">" #(Node*) "</" tag_name ">"
//! Text              = text
//! JsExpr            = insertion_point
//! Attribute         = Attribute_js | Attribute_literal | Attribute_bare
//! Attribute_js      = attr_name "=" JsExpr
//! Attribute_literal = attr_name "=" Literal
//! Attribute_bare    = attr_name ~"="
//! insertion_point   = "{{" digit+ "}}"
//! Literal           = string_literal
//! ```
//!
//! Tags and attributes are syntactic (whitespace between their parts is
//! ignored); content is lexical so text keeps its whitespace. A void tag
//! never opens a container. Its end tag is a node of its own, `Node_end_void`,
//! which the bindings pair with the start tag before it: `<br></br>` is one
//! element and `<br>x</br>` is content in a void element.

use std::sync::LazyLock;

use crate::peg::{Expr, Grammar, Rule};
use crate::GrammarError;

/// Tag names that never take content. Matched case-insensitively.
pub const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "command", "embed", "hr", "img", "input", "keygen", "link", "meta",
    "param", "source", "track", "wbr",
];

static HTML: LazyLock<Result<Grammar, GrammarError>> = LazyLock::new(html_template);

/// The process-wide HTML template grammar, compiled on first use.
pub fn html() -> Result<&'static Grammar, GrammarError> {
    HTML.as_ref().map_err(Clone::clone)
}

fn html_template() -> Result<Grammar, GrammarError> {
    use Expr as E;

    let attributes = || E::apply("Attribute").star();
    let content = || E::lex(E::apply("Node").star());

    Grammar::compile(
        "HtmlTemplate",
        "Fragment",
        vec![
            Rule::lexical("Fragment", E::apply("Node").star()),
            Rule::lexical(
                "Node",
                E::alt([
                    E::apply("Text"),
                    E::apply("JsExpr"),
                    E::apply("Node_void"),
                    E::apply("Node_end_void"),
                    E::apply("Node_container"),
                ]),
            ),
            Rule::syntactic(
                "Node_void",
                E::alt([
                    E::seq([E::lit("<"), E::apply("tag_name"), attributes(), E::lit("/>")]),
                    E::seq([
                        E::lit("<"),
                        E::followed_by(E::apply("void_tag_name")),
                        E::apply("tag_name"),
                        attributes(),
                        E::lit(">"),
                    ]),
                ]),
            ),
            Rule::syntactic(
                "Node_end_void",
                E::seq([
                    E::lit("</"),
                    E::followed_by(E::apply("void_tag_name")),
                    E::apply("tag_name"),
                    E::lit(">"),
                ]),
            ),
            Rule::syntactic(
                "Node_container",
                E::seq([
                    E::lit("<"),
                    E::apply("tag_name"),
                    attributes(),
                    E::lit(">"),
                    content(),
                    E::lit("</"),
                    E::apply("tag_name"),
                    E::lit(">"),
                ]),
            ),
            Rule::lexical("Text", E::apply("text")),
            Rule::lexical("JsExpr", E::apply("insertion_point")),
            Rule::syntactic(
                "Attribute",
                E::alt([
                    E::apply("Attribute_js"),
                    E::apply("Attribute_literal"),
                    E::apply("Attribute_bare"),
                ]),
            ),
            Rule::syntactic(
                "Attribute_js",
                E::seq([E::apply("attr_name"), E::lit("="), E::apply("JsExpr")]),
            ),
            Rule::syntactic(
                "Attribute_literal",
                E::seq([E::apply("attr_name"), E::lit("="), E::apply("Literal")]),
            ),
            Rule::syntactic(
                "Attribute_bare",
                E::seq([E::apply("attr_name"), E::not_followed_by(E::lit("="))]),
            ),
            Rule::lexical(
                "insertion_point",
                E::seq([E::lit("{{"), E::apply("digit").plus(), E::lit("}}")]),
            )
            .describe("an insertion point"),
            Rule::lexical("Literal", E::apply("string_literal")),
            // Lexical building blocks
            Rule::lexical(
                "text",
                E::seq([
                    E::not_followed_by(E::lit("<")),
                    E::not_followed_by(E::apply("insertion_point")),
                    E::Any,
                ])
                .plus(),
            )
            .describe("text"),
            Rule::lexical(
                "tag_name",
                E::seq([E::apply("letter"), E::apply("name_char").star()]),
            )
            .describe("a tag name"),
            Rule::lexical(
                "void_tag_name",
                E::alt(VOID_TAGS.iter().map(|tag| {
                    E::seq([E::lit_nocase(tag), E::not_followed_by(E::apply("name_char"))])
                })),
            ),
            Rule::lexical(
                "attr_name",
                E::seq([
                    E::alt([E::apply("letter"), E::lit("_")]),
                    E::apply("name_char").star(),
                ]),
            )
            .describe("an attribute name"),
            Rule::lexical(
                "name_char",
                E::alt([
                    E::apply("letter"),
                    E::apply("digit"),
                    E::lit("-"),
                    E::lit("_"),
                    E::lit(":"),
                    E::lit("."),
                ]),
            ),
            Rule::lexical(
                "string_literal",
                E::alt([
                    E::seq([E::lit("\""), E::apply("dq_char").star(), E::lit("\"")]),
                    E::seq([E::lit("'"), E::apply("sq_char").star(), E::lit("'")]),
                ]),
            )
            .describe("a quoted string"),
            Rule::lexical(
                "dq_char",
                E::alt([
                    E::apply("escape_sequence"),
                    E::seq([
                        E::not_followed_by(E::lit("\"")),
                        E::not_followed_by(E::lit("\\")),
                        E::Any,
                    ]),
                ]),
            ),
            Rule::lexical(
                "sq_char",
                E::alt([
                    E::apply("escape_sequence"),
                    E::seq([
                        E::not_followed_by(E::lit("'")),
                        E::not_followed_by(E::lit("\\")),
                        E::Any,
                    ]),
                ]),
            ),
            Rule::lexical("escape_sequence", E::seq([E::lit("\\"), E::Any])),
            Rule::lexical(
                "letter",
                E::alt([E::range('a', 'z'), E::range('A', 'Z')]),
            ),
            Rule::lexical("digit", E::range('0', '9')),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Cst;
    use pretty_assertions::assert_eq;

    fn grammar() -> &'static Grammar {
        html().unwrap()
    }

    fn arity(rule: &str) -> usize {
        let grammar = grammar();
        grammar.arity(grammar.rule_id(rule).unwrap())
    }

    /// Rule names of the top-level nodes of a fragment.
    fn top_level(source: &str) -> Vec<String> {
        let grammar = grammar();
        let cst = grammar.match_source(source, None).unwrap();
        cst.children()[0]
            .children()
            .iter()
            .map(|node| {
                // Node -> concrete alternative
                let inner = &node.children()[0];
                grammar.rule_name(inner.rule().unwrap()).to_string()
            })
            .collect()
    }

    // =========================================================================
    // Arities the bindings rely on
    // =========================================================================

    #[test]
    fn test_rule_arities() {
        assert_eq!(arity("Fragment"), 1);
        assert_eq!(arity("Node"), 1);
        assert_eq!(arity("Node_container"), 8);
        assert_eq!(arity("Node_void"), 4);
        assert_eq!(arity("Node_end_void"), 3);
        assert_eq!(arity("Text"), 1);
        assert_eq!(arity("JsExpr"), 1);
        assert_eq!(arity("Attribute_js"), 3);
        assert_eq!(arity("Attribute_literal"), 3);
        assert_eq!(arity("Attribute_bare"), 1);
        assert_eq!(arity("insertion_point"), 3);
        assert_eq!(arity("Literal"), 1);
    }

    #[test]
    fn test_grammar_is_shared() {
        assert!(std::ptr::eq(grammar(), html().unwrap()));
    }

    // =========================================================================
    // Shapes
    // =========================================================================

    #[test]
    fn test_empty_fragment() {
        assert!(top_level("").is_empty());
    }

    #[test]
    fn test_text_and_elements() {
        assert_eq!(
            top_level("hi <b>there</b> {{0}}"),
            vec!["Text", "Node_container", "Text", "JsExpr"]
        );
    }

    #[test]
    fn test_self_closing_tag() {
        assert_eq!(top_level("<div />"), vec!["Node_void"]);
        assert_eq!(top_level("<img src='x'/>"), vec!["Node_void"]);
    }

    #[test]
    fn test_void_tag_without_slash() {
        assert_eq!(top_level("<br>"), vec!["Node_void"]);
        assert_eq!(top_level("<BR>"), vec!["Node_void"]);
        assert_eq!(top_level("<br><hr>"), vec!["Node_void", "Node_void"]);
    }

    #[test]
    fn test_void_tag_inside_container() {
        assert_eq!(top_level("<p>a<br>b</p>"), vec!["Node_container"]);
        assert_eq!(top_level("<div><br></div>"), vec!["Node_container"]);
    }

    #[test]
    fn test_void_end_tag_is_its_own_node() {
        assert_eq!(top_level("<br></br>"), vec!["Node_void", "Node_end_void"]);
        assert_eq!(
            top_level("<br>x</br>"),
            vec!["Node_void", "Text", "Node_end_void"]
        );
    }

    #[test]
    fn test_container_end_tag_is_not_a_node() {
        assert!(grammar().match_source("</div>", None).is_err());
    }

    #[test]
    fn test_tag_name_prefix_of_void_tag() {
        // "base" is void, "basefont" is not
        assert_eq!(top_level("<basefont></basefont>"), vec!["Node_container"]);
    }

    #[test]
    fn test_col_is_a_container() {
        assert_eq!(top_level("<col>x</col>"), vec!["Node_container"]);
    }

    #[test]
    fn test_many_sibling_void_tags() {
        let tags = "<br>".repeat(64);
        assert_eq!(top_level(&tags), vec!["Node_void"; 64]);

        let grammar = grammar();
        let source = format!("<p>{tags}</p>");
        let cst = grammar.match_source(&source, None).unwrap();
        let container = &cst.children()[0].children()[0].children()[0];
        assert_eq!(grammar.rule_name(container.rule().unwrap()), "Node_container");
        assert_eq!(container.children()[4].children().len(), 64);
    }

    #[test]
    fn test_mismatched_tags_still_match() {
        // Tag equality is checked by the bindings, not the grammar.
        assert_eq!(top_level("<div></span>"), vec!["Node_container"]);
    }

    #[test]
    fn test_attributes() {
        let grammar = grammar();
        let source = "<div id=\"a\" className={{0}} hidden data-x='y'></div>";
        let cst = grammar.match_source(source, None).unwrap();
        let container = &cst.children()[0].children()[0].children()[0];
        let attrs = &container.children()[2];
        let kinds: Vec<&str> = attrs
            .children()
            .iter()
            .map(|attr| grammar.rule_name(attr.children()[0].rule().unwrap()))
            .collect();
        assert_eq!(
            kinds,
            vec!["Attribute_literal", "Attribute_js", "Attribute_bare", "Attribute_literal"]
        );
    }

    #[test]
    fn test_text_keeps_whitespace() {
        let grammar = grammar();
        let source = "<p> a  b </p>";
        let cst = grammar.match_source(source, None).unwrap();
        let container = &cst.children()[0].children()[0].children()[0];
        let text = &container.children()[4].children()[0];
        assert_eq!(text.span().slice(source), " a  b ");
    }

    #[test]
    fn test_braces_without_digits_are_text() {
        assert_eq!(top_level("{{x}}"), vec!["Text"]);
    }

    #[test]
    fn test_escaped_quote_in_literal() {
        assert!(grammar()
            .match_source(r#"<a id="x\"y"></a>"#, None)
            .is_ok());
    }

    // =========================================================================
    // Failures
    // =========================================================================

    #[test]
    fn test_unclosed_tag_fails() {
        let err = grammar().match_source("<div>", None).unwrap_err();
        assert_eq!(err.line, 1);
        assert_eq!(err.column, 6);
    }

    #[test]
    fn test_stray_angle_bracket_fails() {
        let err = grammar().match_source("a < 1", None).unwrap_err();
        assert!(err.message.contains("a tag name"), "{}", err.message);
    }

    #[test]
    fn test_cst_spans_cover_nodes() {
        let grammar = grammar();
        let source = "x<p>y</p>";
        let cst = grammar.match_source(source, None).unwrap();
        let nodes: Vec<&Cst> = cst.children()[0].children().iter().collect();
        assert_eq!(nodes[1].span().slice(source), "<p>y</p>");
    }
}
