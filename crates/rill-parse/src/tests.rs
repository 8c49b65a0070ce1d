use std::fmt::Write;

use expect_test::{Expect, expect};
use rill_syntax::{NodeOrToken, SyntaxNode, debug_dump};

use crate::parse;

fn check(text: &str, expected: Expect) {
    let tree = parse(text);
    let mut actual = debug_dump(&tree);
    let diagnostics = tree.diagnostics();
    if !diagnostics.is_empty() {
        actual.push_str("Errors:\n");
        for diagnostic in &diagnostics {
            writeln!(actual, "  {:?} {}", diagnostic.range(), diagnostic.message()).unwrap();
        }
    }
    expected.assert_eq(&actual);
}

#[test]
fn simple_print() {
    check(
        "print x;",
        expect![[r#"
            PROGRAM@0..8
              STATEMENT_LIST@0..8
                PRINT_STMT@0..8
                  PRINT_KW@0..6 "print"
                  NAME_EXPR@6..7
                    NAME@6..7 "x"
                  SEMICOLON@7..8 ";"
              EOF@8..8 ""
        "#]],
    );
}

#[test]
fn missing_semicolon_synthesizes_a_token() {
    check(
        "print x",
        expect![[r#"
            PROGRAM@0..7
              STATEMENT_LIST@0..7
                PRINT_STMT@0..7
                  PRINT_KW@0..6 "print"
                  NAME_EXPR@6..7
                    NAME@6..7 "x"
                  SEMICOLON@7..7 "" (missing)
              EOF@7..7 ""
            Errors:
              7..7 Expected ';'
        "#]],
    );
}

#[test]
fn unexpected_character_becomes_an_error_statement() {
    check(
        "$",
        expect![[r#"
            PROGRAM@0..1
              STATEMENT_LIST@0..1
                ERROR_STMT@0..1
                  ERROR_TOKEN@0..1 "$"
              EOF@1..1 ""
            Errors:
              0..1 Unable to parse this statement
              0..1 Unexpected character '$'
        "#]],
    );
}

#[test]
fn error_statement_swallows_to_the_semicolon() {
    check(
        "foo bar;",
        expect![[r#"
            PROGRAM@0..8
              STATEMENT_LIST@0..8
                ERROR_STMT@0..8
                  NAME@0..4 "foo"
                  NAME@4..7 "bar"
                  SEMICOLON@7..8 ";"
              EOF@8..8 ""
            Errors:
              0..8 Unable to parse this statement
        "#]],
    );
}

#[test]
fn expected_token_recovery_swallows_into_trivia() {
    check(
        "print x let y = 1;",
        expect![[r#"
            PROGRAM@0..18
              STATEMENT_LIST@0..18
                PRINT_STMT@0..18
                  PRINT_KW@0..6 "print"
                  NAME_EXPR@6..8
                    NAME@6..8 "x"
                  SEMICOLON@8..18 ";"
              EOF@18..18 ""
            Errors:
              8..11 Expected ';', found 'let'
              12..13 Expected ';', found 'y'
              14..15 Expected ';', found '='
              16..17 Expected ';', found '1'
        "#]],
    );
}

#[test]
fn define_with_expression_body() {
    check(
        "define f(a, b) = a + b;",
        expect![[r#"
            PROGRAM@0..23
              STATEMENT_LIST@0..23
                DEFINE_STMT@0..23
                  DEFINE_KW@0..7 "define"
                  NAME@7..8 "f"
                  LEFT_PAREN@8..9 "("
                  PARAM_LIST@9..13
                    NAME@9..10 "a"
                    COMMA@10..12 ","
                    NAME@12..13 "b"
                  RIGHT_PAREN@13..15 ")"
                  EQ@15..17 "="
                  BINARY_EXPR@17..22
                    NAME_EXPR@17..19
                      NAME@17..19 "a"
                    PLUS@19..21 "+"
                    NAME_EXPR@21..22
                      NAME@21..22 "b"
                  SEMICOLON@22..23 ";"
              EOF@23..23 ""
        "#]],
    );
}

#[test]
fn if_with_else_branch() {
    check(
        "if x then print 1; else print 2; fi",
        expect![[r#"
            PROGRAM@0..35
              STATEMENT_LIST@0..35
                IF_STMT@0..35
                  IF_KW@0..3 "if"
                  NAME_EXPR@3..5
                    NAME@3..5 "x"
                  THEN_KW@5..10 "then"
                  STATEMENT_LIST@10..19
                    PRINT_STMT@10..19
                      PRINT_KW@10..16 "print"
                      LITERAL@16..17
                        NUMBER@16..17 "1"
                      SEMICOLON@17..19 ";"
                  ELSE_KW@19..24 "else"
                  STATEMENT_LIST@24..33
                    PRINT_STMT@24..33
                      PRINT_KW@24..30 "print"
                      LITERAL@30..31
                        NUMBER@30..31 "2"
                      SEMICOLON@31..33 ";"
                  FI_KW@33..35 "fi"
              EOF@35..35 ""
        "#]],
    );
}

/// The source substring at a node's full span equals the concatenation of
/// its children's full-span substrings, recursively down to tokens; and
/// every token's trimmed-span substring is its text.
#[test]
fn span_text_round_trip() {
    let samples = [
        "print x;",
        "let value = 10 * (3 + rate);\nprint value;\n",
        "define fib(n) begin\n  if n then return fib(n - 1) + fib(n - 2); fi\n  return n;\nend\nprint fib(10);\n",
        "while count do\n  let count = count - 1; // tick\nod\n",
        "print \"multi\" ;  // trailing\n\n\tfoo bar baz\nlet x = ;\n",
        "$ @ print",
    ];
    for text in samples {
        let tree = parse(text);
        check_spans(text, tree.root());
        assert_eq!(tree.root().text_range().len(), tree.text().len());
    }
}

fn check_spans(text: &str, node: &SyntaxNode) {
    let node_text = &text[node.text_range()];
    let mut concatenated = String::new();
    for child in node.children() {
        match child {
            NodeOrToken::Node(child) => {
                concatenated.push_str(&text[child.text_range()]);
                check_spans(text, &child);
            }
            NodeOrToken::Token(token) => {
                concatenated.push_str(&text[token.text_range()]);
                assert_eq!(&text[token.trimmed_range()], token.text());
            }
        }
    }
    assert_eq!(node_text, concatenated, "children must tile {:?}", node.kind());
}

#[test]
fn while_loop_and_block_define_parse_cleanly() {
    let tree = parse(
        "define tick(n) begin\n  print n;\nend\nwhile x do\n  let x = x - 1;\nod\n",
    );
    assert_eq!(tree.diagnostics(), Vec::new());
}

#[test]
fn empty_input_is_a_valid_program() {
    let tree = parse("");
    assert_eq!(tree.diagnostics(), Vec::new());
    assert_eq!(tree.root().text_range().len(), 0.into());
}

#[test]
fn lists_tolerate_empty_slots() {
    // Missing parameter between the comma and the parenthesis, and a
    // missing argument slot.
    let tree = parse("define f(a,) = g(1,);");
    let diagnostics = tree.diagnostics();
    assert_eq!(diagnostics.len(), 2);
    assert!(diagnostics.iter().any(|d| d.message() == "Expected an identifier"));
    assert!(diagnostics.iter().any(|d| d.message() == "Expected an expression"));
}

#[test]
fn every_production_still_returns_a_tree() {
    // Pathological inputs must still produce a full-width tree, never a
    // panic or a lost character.
    let samples = [
        "let = ;",
        "if then fi",
        "while do od",
        "define",
        "((((",
        "\"unterminated",
        ";;;;",
        "end",
        "print 1 + ;",
    ];
    for text in samples {
        let tree = parse(text);
        assert_eq!(
            tree.root().text_range().len(),
            tree.text().len(),
            "tree must cover all of {text:?}"
        );
        assert!(!tree.diagnostics().is_empty(), "{text:?} should have diagnostics");
    }
}
