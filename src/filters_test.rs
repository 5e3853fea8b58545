use rusqlite::types::Value;

use crate::error::StorageError;
use crate::filters::{compile, Field, Filter, Op, Operand, Params, QueryTarget};
use crate::performers::PerformerKind;
use crate::testing;

fn params(pairs: &[(&str, Value)]) -> Params {
    pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
}

#[test]
fn test_compile_binds_every_value() {
    let filter = Filter::compare(Field::Title, Op::Contains, "Love").and(Filter::compare(Field::Year, Op::Ge, Operand::param("from")));
    let compiled = compile(&filter, QueryTarget::Tracks, &params(&[("from", Value::Integer(2019))])).unwrap();
    assert_eq!(compiled.sql, "(instr(t.title, :p0) > 0 AND t.year >= :p1)");
    assert_eq!(
        compiled.params,
        vec![(":p0".to_string(), Value::Text("Love".to_string())), (":p1".to_string(), Value::Integer(2019))]
    );
}

#[test]
fn test_compile_rejects_unbound_param() {
    let filter = Filter::compare(Field::Year, Op::Eq, Operand::param("year"));
    let err = compile(&filter, QueryTarget::Tracks, &Params::new()).unwrap_err();
    assert!(matches!(err, StorageError::InvalidQuery(_)), "{:?}", err);
}

#[test]
fn test_compile_rejects_invalid_param_name() {
    let filter = Filter::compare(Field::Year, Op::Eq, Operand::param("1; DROP TABLE tracks"));
    let err = compile(&filter, QueryTarget::Tracks, &Params::new()).unwrap_err();
    assert!(matches!(err, StorageError::InvalidQuery(_)), "{:?}", err);
}

#[test]
fn test_compile_rejects_field_not_on_target() {
    let filter = Filter::compare(Field::Genre, Op::Eq, "Pop");
    let err = compile(&filter, QueryTarget::Performers, &Params::new()).unwrap_err();
    assert_eq!(err, StorageError::InvalidQuery("field genre cannot be used to query performers".to_string()));
}

#[test]
fn test_compile_kind_by_name() {
    let filter = Filter::compare(Field::Kind, Op::Eq, "Group");
    let compiled = compile(&filter, QueryTarget::Performers, &Params::new()).unwrap();
    assert_eq!(compiled.params, vec![(":p0".to_string(), Value::Integer(1))]);

    let err = compile(&Filter::compare(Field::Kind, Op::Eq, "Band"), QueryTarget::Performers, &Params::new()).unwrap_err();
    assert!(matches!(err, StorageError::InvalidQuery(_)), "{:?}", err);
}

#[test]
fn test_compile_empty_combinators() {
    let p = Params::new();
    assert_eq!(compile(&Filter::All, QueryTarget::Tracks, &p).unwrap().sql, "1 = 1");
    assert_eq!(compile(&Filter::And(vec![]), QueryTarget::Tracks, &p).unwrap().sql, "1 = 1");
    assert_eq!(compile(&Filter::Or(vec![]), QueryTarget::Tracks, &p).unwrap().sql, "1 = 0");
}

#[test]
fn test_query_tracks() {
    let (store, _temp_dir) = testing::seeded_store();
    let filter = Filter::compare(Field::Performer, Op::Eq, "BLACKPINK").and(Filter::compare(Field::TrackNumber, Op::Gt, 1));
    let tracks = store.query_tracks(&filter, &Params::new()).unwrap();
    assert_eq!(tracks.iter().map(|t| t.id).collect::<Vec<_>>(), vec![2]);
}

#[test]
fn test_query_tracks_with_params_and_not() {
    let (store, _temp_dir) = testing::seeded_store();
    let filter = Filter::compare(Field::Album, Op::Eq, Operand::param("album")).and(Filter::compare(Field::Kind, Op::Eq, PerformerKind::Unknown).not());
    let tracks = store.query_tracks(&filter, &params(&[("album", Value::Text("Solo".to_string()))])).unwrap();
    assert_eq!(tracks.iter().map(|t| t.title.as_str()).collect::<Vec<_>>(), vec!["Solo"]);
}

#[test]
fn test_query_values_are_not_interpolated() {
    let (store, _temp_dir) = testing::seeded_store();
    let filter = Filter::compare(Field::Title, Op::Eq, "x' OR '1' = '1");
    assert!(store.query_tracks(&filter, &Params::new()).unwrap().is_empty());
    assert_eq!(store.list_tracks().unwrap().len(), 4);
}

#[test]
fn test_contains_is_case_sensitive() {
    let (store, _temp_dir) = testing::seeded_store();
    let lower = store.query_tracks(&Filter::compare(Field::Title, Op::Contains, "love"), &Params::new()).unwrap();
    let upper = store.query_tracks(&Filter::compare(Field::Title, Op::Contains, "Love"), &Params::new()).unwrap();
    assert!(lower.is_empty());
    assert_eq!(upper.len(), 1);
}

#[test]
fn test_query_performers_and_albums() {
    let (store, _temp_dir) = testing::seeded_store();
    let people = store.query_performers(&Filter::compare(Field::Kind, Op::Ne, "Unknown"), &Params::new()).unwrap();
    assert_eq!(people.iter().map(|p| p.name.as_str()).collect::<Vec<_>>(), vec!["BLACKPINK", "Jennie"]);

    let albums = store.query_albums(&Filter::compare(Field::Path, Op::StartsWith, "/music/jennie"), &Params::new()).unwrap();
    assert_eq!(albums.len(), 1);
    assert_eq!(albums[0].name, "Solo");
}

#[test]
fn test_display() {
    let filter = Filter::compare(Field::Title, Op::Contains, "say \"hi\"")
        .and(Filter::compare(Field::Year, Op::Ge, Operand::param("from")).or(Filter::compare(Field::Kind, Op::Eq, "Group")));
    assert_eq!(filter.to_string(), r#"(title ~ "say \"hi\"" and (year >= :from or kind = "Group"))"#);
}
