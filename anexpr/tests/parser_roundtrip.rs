mod common;

use anexpr::prelude::*;
use common::{MockConnection, evaluate, parser_for};

fn parser() -> ExpressionParser {
    parser_for(MockConnection::silent())
}

fn render(src: &str) -> String {
    let node = parser().parse(src);
    assert_eq!(node.error_text(), None, "'{src}' should parse");
    node.to_string()
}

#[test]
fn canonical_rendering() {
    let cases = [
        ("A:MULTI WORD SIMVAR, bool", "A:MULTI WORD SIMVAR, bool"),
        (
            "A:MULTI WORD SIMVAR, pounds per square inch + 1",
            "(A:MULTI WORD SIMVAR, pounds per square inch + 1)",
        ),
        ("L:XMLVAR_Something", "L:XMLVAR_Something"),
        ("L:XMLVAR_Something + 1", "(L:XMLVAR_Something + 1)"),
        ("1 + 2", "(1 + 2)"),
        ("1 + (2 - 3)", "(1 + (2 - 3))"),
        ("1 + 2 * 3", "(1 + (2 * 3))"),
        ("(1 + 2) * 3", "((1 + 2) * 3)"),
        ("1 * 2 + 3", "((1 * 2) + 3)"),
        ("1 * (2 + 3)", "(1 * (2 + 3))"),
        ("1 + 2 & 3 + 4", "((1 + 2) & (3 + 4))"),
        ("-1", "-1"),
        ("-1 + 2", "(-1 + 2)"),
        ("2 + -1", "(2 + -1)"),
        ("2 + -(1 + 3)", "(2 + -(1 + 3))"),
        ("2 + A:FOO,bool", "(2 + A:FOO, bool)"),
        ("2 + A:FOO BAR,bool", "(2 + A:FOO BAR, bool)"),
        ("0x10 + 1", "(16 + 1)"),
        ("ON", "ON"),
        ("OFF", "OFF"),
        ("ON AND OFF", "(ON AND OFF)"),
        ("ON OR OFF", "(ON OR OFF)"),
        ("A:FOO, bool < 42", "(A:FOO, bool < 42)"),
        ("L:BAR == 1", "(L:BAR == 1)"),
        ("(1 + 3) < (3 + 4)", "((1 + 3) < (3 + 4))"),
        ("3 < 4 OR 4 < 5", "((3 < 4) OR (4 < 5))"),
        (
            "(2 + 3) <= (A:FOO,bool + 12)",
            "((2 + 3) <= (A:FOO, bool + 12))",
        ),
        ("3 != 4", "(3 != 4)"),
        ("3 <> 4", "(3 != 4)"),
        (
            "1 + 2 * 3 < 3 * 4 - 5",
            "((1 + (2 * 3)) < ((3 * 4) - 5))",
        ),
        ("1<2 AND 2>3", "((1 < 2) AND (2 > 3))"),
        ("1 < 2.5 && 3.0 < 4", "((1 < 2.5) AND (3 < 4))"),
        ("ON AND OFF OR ON AND OFF", "((ON AND OFF) OR (ON AND OFF))"),
        ("NOT ON", "(NOT ON)"),
        ("NOT ON AND OFF", "((NOT ON) AND OFF)"),
        ("NOT ON OR OFF", "((NOT ON) OR OFF)"),
        ("NOT 1 == 2", "(NOT (1 == 2))"),
        ("- A:FOO, bool > 3", "(-A:FOO, bool > 3)"),
        ("-(A:FOO, bool) > 3", "(-A:FOO, bool > 3)"),
        ("[Engine:FIRE_LIGHT] == 1", "([Engine:FIRE_LIGHT] == 1)"),
        ("OFFSET:0366:INT2 == 1", "(OFFSET:366:INT2 == 1)"),
    ];

    for (src, expected) in cases {
        assert_eq!(render(src), expected, "rendering of '{src}'");
    }
}

#[test]
fn binary_operators_group_to_the_right() {
    assert_eq!(
        render("1==1 || 2==2 && 3==3 || 4==4"),
        "((1 == 1) OR (((2 == 2) AND (3 == 3)) OR (4 == 4)))"
    );
    assert_eq!(render("1 + 2 - 3"), "(1 + (2 - 3))");
    assert_eq!(render("1 + 2 * 3 + 4"), "(1 + ((2 * 3) + 4))");
    assert_eq!(
        render("ON AND (OFF OR ON) AND OFF"),
        "(ON AND ((OFF OR ON) AND OFF))"
    );
    assert_eq!(
        render("NOT ON AND NOT OFF OR NOT ON OR NOT OFF"),
        "(((NOT ON) AND (NOT OFF)) OR ((NOT ON) OR (NOT OFF)))"
    );
}

#[test]
fn rendering_round_trips() {
    let sources = [
        "A:FOO, bool < 42",
        "1==1 || 2==2 && 3==3 || 4==4",
        "NOT L:A == 1 AND -(A:B, feet) > 3 OR ([Cat:Id] & 4) == 4",
        "OFFSET:0366:FLOAT8 * 2 >= 0x1F",
    ];
    for src in sources {
        let first = render(src);
        let second = render(&first);
        assert_eq!(first, second, "round trip of '{src}'");
    }
}

#[test]
fn precedence_evaluates_as_expected() {
    let node = parser().parse("1 + 2 * 3 + 4 == 11");
    assert_eq!(evaluate(&node), Some(Value::Boolean(true)));
}

#[test]
fn numeric_evaluation() {
    let cases = [
        ("1 + 2 * 3", 7.0),
        ("2 - 3 / 4", 1.25),
        ("-3 - -4", 1.0),
        ("-3--4", 1.0),
        ("-3+-4", -7.0),
        ("-(1+2)", -3.0),
        ("-(1+2 * 3)", -7.0),
        ("3 * -2", -6.0),
        ("9 & 8", 8.0),
        ("7 & 8", 0.0),
        ("8 & 8", 8.0),
        ("1 + 7 & 15 - 7", 8.0),
        ("1 | 2", 3.0),
        ("3 | 5", 7.0),
        ("1 + 3 | 3 - 1", 6.0),
    ];
    for (src, expected) in cases {
        let node = parser().parse(src);
        assert_eq!(evaluate(&node), Some(Value::Number(expected)), "value of '{src}'");

        // Still usable where a boolean is needed
        let compared = parser().parse(&format!("({src}) > 0"));
        assert_eq!(
            evaluate(&compared),
            Some(Value::Boolean(expected > 0.0)),
            "value of '({src}) > 0'"
        );
    }
}

#[test]
fn syntax_errors_become_error_nodes() {
    let node = parser().parse("(2 + 3");
    let message = node.error_text().expect("should be an error node");
    assert!(message.starts_with("Syntax error"), "{message}");
    assert!(message.contains("end of input"), "{message}");
    assert_eq!(node.to_string(), message);
    assert_eq!(node.value_type(), NodeDataType::Double);

    assert!(parser().parse("").error_text().is_some());
    assert!(parser().parse("1 +").error_text().is_some());
    assert!(parser().parse("ON ON").error_text().is_some());
}

#[test]
fn missing_units_are_reported() {
    let node = parser().parse("A:SOME VARIABLE == 3");
    assert_eq!(
        node.error_text(),
        Some("Missing units for variable 'A:SOME VARIABLE'.")
    );
    assert_eq!(
        parser().try_parse("A:SOME VARIABLE == 3").unwrap_err(),
        ExprError::MissingUnits {
            name: "SOME VARIABLE".to_string(),
            span: 0..15,
        }
    );
}

#[test]
fn unknown_words_are_reported() {
    let node = parser().parse("L:A == 1 AND BANANA");
    let message = node.error_text().expect("should be an error node");
    assert!(message.contains("BANANA"), "{message}");
}

#[test]
fn dialects_without_connection_are_rejected() {
    let connections = Connections::new().with(Dialect::Bus, MockConnection::silent());
    let parser = ExpressionParser::new(connections);
    assert_eq!(parser.parse("[Cat:Id] == 1").error_text(), None);

    let err = parser.try_parse("L:FOO == 1").unwrap_err();
    assert!(matches!(
        err,
        ExprError::UnsupportedDialect {
            dialect: Dialect::Local,
            ..
        }
    ));
}

#[test]
fn variables_are_listed_once_in_order() {
    let node = parser().parse("L:B == 1 AND (A:X, bool + L:B > L:A OR L:B == 2)");
    assert_eq!(
        node.variables(),
        vec![
            Variable::local("B"),
            Variable::simulator("X", "bool"),
            Variable::local("A"),
        ]
    );
    assert!(parser().parse("1 == 1").variables().is_empty());
}

#[test]
fn static_types() {
    let p = parser();
    assert_eq!(p.parse("L:A").value_type(), NodeDataType::Double);
    assert_eq!(p.parse("L:A > 1").value_type(), NodeDataType::Boolean);
    assert_eq!(p.parse("NOT ON").value_type(), NodeDataType::Boolean);
    assert_eq!(p.parse("-L:A").value_type(), NodeDataType::Double);
    assert_eq!(p.parse("1 & 3").value_type(), NodeDataType::Double);
    assert!(p.parse("ON & 1").error_text().is_some());
    assert!(p.parse("L:A AND ON").error_text().is_some());
}
