use rusqlite::types::Value;

use crate::error::StorageError;
use crate::filters::{Field, Filter, Op, Operand, Params};
use crate::testing;

#[test]
fn test_parse_empty() {
    assert_eq!(Filter::parse("").unwrap(), Filter::All);
    assert_eq!(Filter::parse("   ").unwrap(), Filter::All);
}

#[test]
fn test_parse_comparison() {
    assert_eq!(Filter::parse(r#"title ~ "love""#).unwrap(), Filter::compare(Field::Title, Op::Contains, "love"));
    assert_eq!(Filter::parse("year>=2019").unwrap(), Filter::compare(Field::Year, Op::Ge, 2019));
    assert_eq!(Filter::parse("track != -1").unwrap(), Filter::compare(Field::TrackNumber, Op::Ne, -1));
    assert_eq!(Filter::parse("Performer = :who").unwrap(), Filter::compare(Field::Performer, Op::Eq, Operand::param("who")));
    assert_eq!(Filter::parse(r#"path ^= "C:\\Music""#).unwrap(), Filter::compare(Field::Path, Op::StartsWith, r"C:\Music"));
}

#[test]
fn test_parse_precedence() {
    let parsed = Filter::parse(r#"genre = "Pop" or not year < 2000 and kind = "Group""#).unwrap();
    let expected = Filter::Or(vec![
        Filter::compare(Field::Genre, Op::Eq, "Pop"),
        Filter::And(vec![Filter::compare(Field::Year, Op::Lt, 2000).not(), Filter::compare(Field::Kind, Op::Eq, "Group")]),
    ]);
    assert_eq!(parsed, expected);
}

#[test]
fn test_parse_parentheses_and_keyword_case() {
    let parsed = Filter::parse(r#"(genre = "Pop" OR genre = "Rock") AND year = 1999"#).unwrap();
    let expected = Filter::And(vec![
        Filter::Or(vec![Filter::compare(Field::Genre, Op::Eq, "Pop"), Filter::compare(Field::Genre, Op::Eq, "Rock")]),
        Filter::compare(Field::Year, Op::Eq, 1999),
    ]);
    assert_eq!(parsed, expected);
}

#[test]
fn test_keyword_prefix_is_not_a_keyword() {
    // "order" starts with "or" but is not the keyword.
    let err = Filter::parse(r#"title = "x" order"#).unwrap_err();
    assert_eq!(err.index(), 12);
}

#[test]
fn test_parse_display_round_trip() {
    let raw = r#"title ~ "say \"hi\"" and (year >= :from or kind = "Group")"#;
    let parsed = Filter::parse(raw).unwrap();
    assert_eq!(Filter::parse(&parsed.to_string()).unwrap(), parsed);
}

fn compare_value(field: Field, op: Op, value: Value) -> Filter {
    Filter::compare(field, op, Operand::Value(value))
}

#[test]
fn test_display_of_edge_filters_parses_back() {
    let unchanged = vec![
        Filter::All,
        Filter::All.and(Filter::compare(Field::Title, Op::Eq, "x")),
        compare_value(Field::Genre, Op::Eq, Value::Null),
        compare_value(Field::Year, Op::Lt, Value::Real(1.5)),
        compare_value(Field::Year, Op::Ge, Value::Real(2000.0)),
        compare_value(Field::Year, Op::Lt, Value::Real(-2.5e-8)),
        compare_value(Field::Year, Op::Lt, Value::Real(f64::INFINITY)),
        compare_value(Field::Title, Op::Ne, Value::Blob(vec![0, 0xab, 0x10])),
    ];
    let cases = unchanged
        .into_iter()
        .map(|f| (f.clone(), f))
        .chain([(Filter::And(vec![]), Filter::All), (Filter::Or(vec![]), Filter::All.not())]);
    for (filter, expected) in cases {
        let rendered = filter.to_string();
        let parsed = Filter::parse(&rendered).unwrap_or_else(|e| panic!("{}: {}", rendered, e));
        assert_eq!(parsed, expected, "{}", rendered);
    }
    assert_eq!(compare_value(Field::Genre, Op::Eq, Value::Null).to_string(), "genre = null");
    assert_eq!(Filter::All.to_string(), "all");
}

#[test]
fn test_parse_literals() {
    assert_eq!(Filter::parse("ALL").unwrap(), Filter::All);
    assert_eq!(Filter::parse("genre != NULL").unwrap(), compare_value(Field::Genre, Op::Ne, Value::Null));
    assert_eq!(Filter::parse("year > 1e3").unwrap(), compare_value(Field::Year, Op::Gt, Value::Real(1000.0)));
    assert_eq!(Filter::parse(r#"title = x"0aFF""#).unwrap(), compare_value(Field::Title, Op::Eq, Value::Blob(vec![0x0a, 0xff])));
    // A quoted "null" is text.
    assert_eq!(Filter::parse(r#"genre = "null""#).unwrap(), Filter::compare(Field::Genre, Op::Eq, "null"));
}

#[test]
fn test_null_literal_queries_store() {
    let (store, _temp_dir) = testing::seeded_store();
    let filter = Filter::parse("title != null and all").unwrap();
    assert_eq!(store.query_tracks(&filter, &Params::new()).unwrap().len(), 4);
    let filter = Filter::parse("title = null").unwrap();
    assert!(store.query_tracks(&filter, &Params::new()).unwrap().is_empty());
}

#[test]
fn test_syntax_errors() {
    let cases: &[(&str, usize, &str)] = &[
        ("titel = 1", 0, "Unknown field titel; valid fields are id, title, performer, album, kind, path, year, genre, track"),
        ("title 1", 6, "Expected an operator (=, !=, <, <=, >, >=, ~ or ^=)"),
        ("title = ", 8, "Expected a value: a quoted string, a number, null or a :parameter"),
        (r#"title = "abc"#, 8, "Unterminated string"),
        ("(year = 1", 0, "Unclosed parenthesis"),
        ("()", 1, "Empty parentheses"),
        ("year = 1 year = 2", 9, "Unexpected input after the end of the filter"),
        ("year = :", 8, "Expected a parameter name after ':'"),
        ("year = 12ab", 7, "Invalid number"),
        ("year = 1.", 7, "Expected digits after '.'"),
        (r#"title = x"abc""#, 8, "Invalid blob; expected an even number of hex digits in x\"...\""),
    ];
    for (raw, index, feedback) in cases {
        let err = Filter::parse(raw).unwrap_err();
        assert_eq!((err.index(), err.feedback()), (*index, *feedback), "{}", raw);
    }
}

#[test]
fn test_syntax_error_display() {
    let err = Filter::parse("year = 1 )").unwrap_err();
    assert_eq!(
        err.to_string(),
        "Failed to parse filter, invalid syntax:\n\n    year = 1 )\n             ^\n             Unexpected input after the end of the filter"
    );
    let storage: StorageError = err.into();
    assert!(matches!(storage, StorageError::InvalidQuery(_)));
}

#[test]
fn test_parsed_filter_runs_against_store() {
    let (store, _temp_dir) = testing::seeded_store();
    let filter = Filter::parse(r#"performer = :who and (title ^= "Love" or track = 1)"#).unwrap();
    let params: Params = [("who".to_string(), Value::Text("BLACKPINK".to_string()))].into_iter().collect();
    let tracks = store.query_tracks(&filter, &params).unwrap();
    assert_eq!(tracks.iter().map(|t| t.id).collect::<Vec<_>>(), vec![1, 2]);
}
