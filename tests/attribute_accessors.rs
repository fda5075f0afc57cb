use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use tempfile::TempDir;

use boutinf::datatype::Value;
use boutinf::engine::Engine;
use boutinf::error::BoutinfError;
use boutinf::index::IndexStore;
use boutinf::source::{MemorySource, Message};

fn setup() -> (TempDir, Arc<IndexStore>, Engine) {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(IndexStore::open(dir.path()).unwrap());
    let source = Arc::new(MemorySource::new());
    let start = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
    source.post(Message::new(1, 7, "alice", "project plan draft", start)).unwrap();
    source.post(Message::new(2, 7, "bob", "lunch?", start + Duration::days(1))).unwrap();
    source.post(Message::new(3, 7, "carol", "plan approved", start + Duration::days(2))).unwrap();
    source.join(7, "bob").unwrap();
    source.join(7, "alice").unwrap();
    source.join(7, "alice").unwrap();
    let engine = Engine::new(Arc::clone(&store), source);
    (dir, store, engine)
}

const CANDIDATES: [u64; 3] = [3, 2, 1];

#[test]
fn source_miss_warms_the_index() {
    let (_dir, store, engine) = setup();
    let author = store.index_for("author").unwrap();
    assert!(author.is_empty().unwrap());
    let found = engine.select("(equal $author bob)", &CANDIDATES).unwrap();
    assert_eq!(found, vec![2]);
    assert_eq!(author.len().unwrap(), 3);
    assert_eq!(author.get(1).unwrap(), Some(Value::Text("alice".to_string())));
    assert!(author.is_dirty());
}

#[test]
fn indexed_values_win_over_the_source() {
    let (_dir, store, engine) = setup();
    store.index_for("author").unwrap().put(1, Value::from("mallory")).unwrap();
    assert_eq!(engine.select("(equal $author mallory)", &CANDIDATES).unwrap(), vec![1]);
    assert!(engine.select("(equal $author alice)", &CANDIDATES).unwrap().is_empty());
}

#[test]
fn missing_attributes_never_match() {
    let (_dir, store, engine) = setup();
    assert!(engine.select("(equal $mood happy)", &CANDIDATES).unwrap().is_empty());
    assert!(engine.select("(matches \"\" $mood)", &CANDIDATES).unwrap().is_empty());
    assert!(engine.select("(greater $mood 1)", &CANDIDATES).unwrap().is_empty());
    assert!(engine.select("(contains $mood happy)", &CANDIDATES).unwrap().is_empty());
    assert_eq!(engine.select("(not (equal $mood happy))", &CANDIDATES).unwrap(), vec![3, 2, 1]);
    // unknown message numbers behave the same
    assert!(engine.select("(equal $author alice)", &[42u64]).unwrap().is_empty());
    assert!(store.index_for("mood").unwrap().is_empty().unwrap());
}

#[test]
fn keyword_matching_on_text() {
    let (_dir, _store, engine) = setup();
    assert_eq!(engine.select("(matches plan $text)", &CANDIDATES).unwrap(), vec![3, 1]);
    assert_eq!(engine.select("(matches \"Project, plan!\" $text)", &CANDIDATES).unwrap(), vec![1]);
    assert_eq!(engine.select("(matches \"\" $text)", &CANDIDATES).unwrap(), vec![3, 2, 1]);
    // dates match through their RFC 3339 text, token by token: "02" alone
    // also occurs inside "2024", while "02t" only inside "02T00"
    assert_eq!(engine.select("(matches \"2024-03-02\" $date)", &CANDIDATES).unwrap(), vec![3, 2, 1]);
    assert_eq!(engine.select("(matches \"03-02T\" $date)", &CANDIDATES).unwrap(), vec![2]);
}

#[test]
fn participants() {
    let (_dir, _store, engine) = setup();
    assert_eq!(engine.select("(contains $participants alice)", &CANDIDATES).unwrap(), vec![3, 2, 1]);
    assert!(engine.select("(contains $participants carol)", &CANDIDATES).unwrap().is_empty());
    // lists compare element by element
    let query = "(equal $participants $participants)";
    assert_eq!(engine.select(query, &CANDIDATES).unwrap(), vec![3, 2, 1]);
}

#[test]
fn dates() {
    let (_dir, _store, engine) = setup();
    assert_eq!(engine.select("(less $date $now)", &CANDIDATES).unwrap(), vec![3, 2, 1]);
    assert_eq!(engine.select("(greater $date \"2024-03-01\")", &CANDIDATES).unwrap(), vec![3, 2]);
    assert_eq!(engine.select("(equal $date 2024-03-02)", &CANDIDATES).unwrap(), vec![2]);
    assert_eq!(
        engine.select("(less $date \"2024-03-02T12:00:00+02:00\")", &CANDIDATES).unwrap(),
        vec![2, 1]
    );
}

#[test]
fn numbers_compare_with_numeric_text() {
    let (_dir, _store, engine) = setup();
    assert_eq!(engine.select("(equal $bout 7)", &CANDIDATES).unwrap(), vec![3, 2, 1]);
    assert_eq!(engine.select("(equal $bout \" 7 \")", &CANDIDATES).unwrap(), vec![3, 2, 1]);
    assert_eq!(engine.select("(greater $number \"2\")", &CANDIDATES).unwrap(), vec![3]);
}

fn type_error(engine: &Engine, query: &str) -> String {
    match engine.select(query, &CANDIDATES) {
        Err(e @ BoutinfError::EvaluationType(_)) => e.to_string(),
        other => panic!("expected a type error for {query}, got {other:?}"),
    }
}

#[test]
fn type_errors_abort_the_evaluation() {
    let (_dir, _store, engine) = setup();
    let message = type_error(&engine, "(equal $participants alice)");
    assert!(message.starts_with("Type mismatch"), "{message}");
    let message = type_error(&engine, "(greater $author b)");
    assert!(message.contains("Ordering comparison not allowed between text values"), "{message}");
    type_error(&engine, "(and $text)");
    type_error(&engine, "(contains $author a)");
    type_error(&engine, "(greater $number abc)");
    type_error(&engine, "(matches $participants $text)");
    // the first candidate passes, the second fails: nothing is returned
    type_error(&engine, "(or (equal $pos 0) (greater $author b))");
}

#[test]
fn ids_beyond_the_number_range_are_type_errors() {
    let (_dir, _store, engine) = setup();
    match engine.select("(greater $number 0)", &[u64::MAX]) {
        Err(BoutinfError::EvaluationType(message)) => assert!(message.contains("does not fit"), "{message}"),
        other => panic!("expected a type error, got {other:?}"),
    }
    let huge = Message::new(u64::MAX, 7, "zed", "far out", Utc::now());
    assert!(matches!(huge.attribute("number"), Err(BoutinfError::EvaluationType(_))));
    assert!(matches!(engine.index_message(&huge), Ok(())));
    assert_eq!(engine.select("(greater $number 0)", &[i64::MAX as u64]).unwrap(), vec![i64::MAX as u64]);
}
