// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use weir_core::message::{Field, FieldValue, Message};
use yare::parameterized;

fn msg(msg_type: &str) -> Message {
    Message::new(msg_type)
}

fn matches(expression: &str, message: &Message) -> bool {
    MatcherSpecification::new(expression).unwrap().is_match(message)
}

#[test]
fn type_disjunction() {
    let spec = MatcherSpecification::new(
        "Type == \"weir.all-report\" || Type == \"weir.sandbox-terminated\"",
    )
    .unwrap();

    assert!(spec.is_match(&msg("weir.all-report")));
    assert!(spec.is_match(&msg("weir.sandbox-terminated")));
    assert!(!spec.is_match(&msg("other")));
    assert!(!spec.is_match(&Message::default()));
}

#[test]
fn field_conjunction() {
    let mut message = msg("request");
    message.add_field(Field::new("status", 200i64));
    let mut host = Field::new("host", "a.example");
    host.push("b.example").unwrap();
    message.add_field(host);

    assert!(matches(
        "Fields[status] == 200 && Fields[host][0] == \"a.example\"",
        &message
    ));
    assert!(!matches(
        "Fields[status] == 200 && Fields[host][0] == \"b.example\"",
        &message
    ));
}

#[test]
fn field_occurrence_and_array_index() {
    let mut message = msg("request");
    message.add_field(Field::new("host", "a.example"));
    let mut second = Field::new("host", "b.example");
    second.push("c.example").unwrap();
    message.add_field(second);

    assert!(matches("Fields[host] == \"a.example\"", &message));
    assert!(matches("Fields[host][1] == \"b.example\"", &message));
    assert!(matches("Fields[host][1][1] == \"c.example\"", &message));
    assert!(!matches("Fields[host][1][2] == \"c.example\"", &message));
    assert!(!matches("Fields[host][2] == \"a.example\"", &message));
}

#[parameterized(
    eq = { "Fields[missing] == \"x\"" },
    ne = { "Fields[missing] != \"x\"" },
    gt = { "Fields[missing] > 1" },
    le = { "Fields[missing] <= 1" },
)]
fn missing_field_is_false_for_every_relop(expression: &str) {
    // Evaluations involving a missing field are false, != included.
    assert!(!matches(expression, &msg("anything")));
}

#[test]
fn ill_typed_comparison_is_false() {
    let mut message = msg("request");
    message.add_field(Field::new("status", 200i64));
    message.add_field(Field::new("name", "weir"));
    message.add_field(Field::new("blob", FieldValue::Bytes(vec![1, 2, 3])));

    assert!(!matches("Fields[status] == \"200\"", &message));
    assert!(!matches("Fields[name] == 200", &message));
    // Bytes fields never match.
    assert!(!matches("Fields[blob] == \"\\x01\\x02\\x03\"", &message));
}

#[test]
fn boolean_fields_support_eq_and_ne_only() {
    let mut message = msg("request");
    message.add_field(Field::new("ok", true));

    assert!(matches("Fields[ok] == TRUE", &message));
    assert!(matches("Fields[ok] != FALSE", &message));
    assert!(!matches("Fields[ok] == FALSE", &message));
    assert!(MatcherSpecification::new("Fields[ok] > TRUE").is_err());
}

#[test]
fn numeric_header_variables() {
    let mut message = msg("request");
    message.timestamp = 2_000;
    message.severity = Some(3);
    message.pid = Some(42);

    assert!(matches("Timestamp > 1000", &message));
    assert!(matches("Severity <= 3", &message));
    assert!(matches("Pid == 42", &message));
    assert!(!matches("Severity == 7", &message));
}

#[test]
fn absent_severity_compares_as_default() {
    assert!(matches("Severity == 7", &msg("request")));
}

#[test]
fn string_comparison_is_bytewise() {
    let mut message = msg("request");
    message.hostname = Some("beta".to_string());

    assert!(matches("Hostname > \"alpha\"", &message));
    assert!(matches("Hostname < \"gamma\"", &message));
    assert!(matches("Hostname != \"Beta\"", &message));
}

#[test]
fn uuid_matches_hyphenated_form() {
    let message = msg("request");
    let uuid = message.uuid_hyphenated().unwrap();
    assert!(matches(&format!("Uuid == \"{uuid}\""), &message));
}

#[test]
fn and_binds_tighter_than_or() {
    let mut message = msg("a");
    message.severity = Some(1);

    // Parsed as (Type == "b" && Severity == 9) || Severity == 1.
    assert!(matches("Type == \"b\" && Severity == 9 || Severity == 1", &message));
    // Parens force the other grouping.
    assert!(!matches("Type == \"b\" && (Severity == 9 || Severity == 1)", &message));
}

#[test]
fn boolean_literals_are_expressions() {
    let message = msg("x");
    assert!(matches("TRUE", &message));
    assert!(!matches("FALSE", &message));
    assert!(matches("FALSE || Type == \"x\"", &message));
}

#[test]
fn single_quoted_literals() {
    assert!(matches("Type == 'quoted'", &msg("quoted")));
}

#[parameterized(
    dangling_op = { "Type == \"x\" &&" },
    missing_op = { "Type \"x\"" },
    unknown_var = { "Flavor == \"x\"" },
    unbalanced_paren = { "(Type == \"x\"" },
    empty_parens = { "()" },
    bare_literal = { "\"x\"" },
    string_var_numeric_literal = { "Type == 5" },
    numeric_var_string_literal = { "Severity == \"high\"" },
    negative_index = { "Fields[a][-1] == 1" },
)]
fn bad_expressions_fail_to_compile(expression: &str) {
    assert!(MatcherSpecification::new(expression).is_err());
}

#[test]
fn empty_expression_is_rejected() {
    assert_eq!(MatcherSpecification::new("").unwrap_err(), MatcherError::Empty);
    assert_eq!(MatcherSpecification::new("   ").unwrap_err(), MatcherError::Empty);
}

#[test]
fn syntax_error_carries_token_and_position() {
    let err = MatcherSpecification::new("Type == \"x\" ## TRUE").unwrap_err();
    assert_eq!(err, MatcherError::Syntax { token: "#".to_string(), pos: 12 });
}

#[test]
fn recompilation_is_stable() {
    let expression = "Type == \"t\" && Fields[status] >= 500 || Severity < 2";
    let a = MatcherSpecification::new(expression).unwrap();
    let b = MatcherSpecification::new(expression).unwrap();

    let mut message = msg("t");
    message.add_field(Field::new("status", 503i64));
    assert_eq!(a.is_match(&message), b.is_match(&message));

    message.severity = Some(1);
    let other = msg("other");
    for m in [&message, &other] {
        assert_eq!(a.is_match(m), b.is_match(m));
    }
}
