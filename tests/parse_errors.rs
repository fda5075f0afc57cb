use boutinf::datatype::Value;
use boutinf::error::BoutinfError;
use boutinf::predicate::Predicate;
use boutinf::query::parse;

fn parse_error(query: &str) -> String {
    match parse(query) {
        Err(e @ BoutinfError::Parse { .. }) => e.to_string(),
        Err(other) => panic!("expected a parse error for {query}, got {other}"),
        Ok(tree) => panic!("expected a parse error for {query}, got {tree:?}"),
    }
}

#[test]
fn empty_and_blank_queries_accept_everything() {
    assert_eq!(parse("").unwrap(), Predicate::Always);
    assert_eq!(parse("  \n\t ").unwrap(), Predicate::Always);
}

#[test]
fn positional_query() {
    let tree = parse("(equal $pos 0)").unwrap();
    assert_eq!(
        tree,
        Predicate::Equal(Box::new(Predicate::Position), Box::new(Predicate::Literal(Value::Number(0))))
    );
}

#[test]
fn commas_and_whitespace_separate_arguments() {
    let spaced = parse("(matches \"project plan\" $text)").unwrap();
    let comma = parse("( matches \"project plan\",$text )").unwrap();
    let both = parse("(matches\n  \"project plan\" ,\t$text)").unwrap();
    assert_eq!(spaced, comma);
    assert_eq!(spaced, both);
}

#[test]
fn escaped_quotes_stay_inside_the_literal() {
    let tree = parse(r#"(equal $text "say \"hi\" \\ bye")"#).unwrap();
    assert_eq!(
        tree,
        Predicate::Equal(
            Box::new(Predicate::Attribute("text".to_string())),
            Box::new(Predicate::Literal(Value::Text(r#"say "hi" \ bye"#.to_string())))
        )
    );
}

#[test]
fn bare_words_are_text() {
    let tree = parse("(equal $author alice)").unwrap();
    assert_eq!(
        tree,
        Predicate::Equal(
            Box::new(Predicate::Attribute("author".to_string())),
            Box::new(Predicate::Literal(Value::Text("alice".to_string())))
        )
    );
}

#[test]
fn parsing_is_deterministic_and_display_round_trips() {
    let queries = [
        "(equal $pos 0)",
        r#"(and (matches "project plan" $text) (not (equal $author "bob")) (limit 3))"#,
        r#"(or (greater $date "2024-01-01") (contains $participants "say \"x\""))"#,
        "(less $number -5)",
    ];
    for query in queries {
        let first = parse(query).unwrap();
        let second = parse(query).unwrap();
        assert_eq!(first, second);
        let rendered = first.to_string();
        assert_eq!(parse(&rendered).unwrap(), first, "{rendered} should parse back");
    }
}

#[test]
fn unknown_predicate_names_the_catalog() {
    let message = parse_error("(frobnicate $pos 0)");
    assert!(message.contains("Unknown predicate 'frobnicate'"), "{message}");
    assert!(message.contains("equal"), "{message}");
    // names are case sensitive
    parse_error("(EQUAL $pos 0)");
}

#[test]
fn wrong_arity() {
    let message = parse_error("(equal $pos)");
    assert!(message.contains("'equal' takes exactly 2 arguments, got 1"), "{message}");
    let message = parse_error("(equal $pos 0 1)");
    assert!(message.contains("got more"), "{message}");
    parse_error("(not)");
    parse_error("(and)");
    parse_error("(limit)");
}

#[test]
fn limit_takes_only_a_non_negative_number_literal() {
    assert_eq!(parse("(limit 3)").unwrap(), Predicate::Limit(3));
    let message = parse_error("(limit $pos)");
    assert!(message.contains("expects a literal"), "{message}");
    parse_error("(limit (equal $pos 0))");
    parse_error("(limit \"three\")");
    parse_error("(limit -1)");
}

#[test]
fn malformed_text_is_rejected() {
    for query in [
        "(equal $pos 0",
        "equal $pos 0)",
        "(equal $pos 0))",
        "(equal $text \"unterminated)",
        "(equal $pos 0) trailing",
        "()",
        "(equal $ 0)",
        "(equal $pos 0)(equal $pos 1)",
        "(equal $.hidden 0)",
        "(equal $..x 0)",
    ] {
        parse_error(query);
    }
}

#[test]
fn variable_names_are_index_names() {
    assert_eq!(
        parse("(equal $first.name_2-x 0)").unwrap(),
        Predicate::Equal(
            Box::new(Predicate::Attribute("first.name_2-x".to_string())),
            Box::new(Predicate::Literal(Value::Number(0)))
        )
    );
    parse_error("(contains $participants $.x)");
}

#[test]
fn errors_carry_a_position() {
    match parse("(and (equal $pos 0)\n  (bogus 1))") {
        Err(BoutinfError::Parse { line, col, .. }) => {
            assert_eq!(line, Some(2));
            assert_eq!(col, Some(4));
        }
        other => panic!("unexpected {other:?}"),
    }
}
