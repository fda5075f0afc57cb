use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};

use boutinf::datatype::Value;
use boutinf::engine::Engine;
use boutinf::index::IndexStore;
use boutinf::source::{Message, MessageSource, SqliteSource};

fn populated() -> SqliteSource {
    let source = SqliteSource::in_memory().unwrap();
    let start = Utc.with_ymd_and_hms(2023, 11, 5, 9, 0, 0).unwrap();
    source.post(&Message::new(10, 1, "alice", "morning all", start)).unwrap();
    source.post(&Message::new(11, 1, "bob", "what's up?", start + Duration::hours(1))).unwrap();
    source.post(&Message::new(12, 1, "alice", "same time", start + Duration::hours(1))).unwrap();
    source.post(&Message::new(20, 2, "carol", "other bout", start)).unwrap();
    source.join(1, "bob").unwrap();
    source.join(1, "alice").unwrap();
    source.join(1, "bob").unwrap();
    source
}

#[test]
fn attributes_of_a_message() {
    let source = populated();
    let start = Utc.with_ymd_and_hms(2023, 11, 5, 9, 0, 0).unwrap();
    assert_eq!(source.attribute(10, "author").unwrap(), Some(Value::from("alice")));
    assert_eq!(source.attribute(10, "text").unwrap(), Some(Value::from("morning all")));
    assert_eq!(source.attribute(10, "bout").unwrap(), Some(Value::from(1i64)));
    assert_eq!(source.attribute(10, "number").unwrap(), Some(Value::from(10i64)));
    assert_eq!(source.attribute(10, "date").unwrap(), Some(Value::from(start)));
    assert_eq!(
        source.attribute(11, "participants").unwrap(),
        Some(Value::List(vec![Value::from("alice"), Value::from("bob")]))
    );
    assert_eq!(source.attribute(20, "participants").unwrap(), Some(Value::List(vec![])));
    assert_eq!(source.attribute(10, "mood").unwrap(), None);
    assert_eq!(source.attribute(99, "author").unwrap(), None);
    assert_eq!(source.attribute(99, "participants").unwrap(), None);
}

#[test]
fn reposting_replaces_the_message() {
    let source = populated();
    let message = Message::new(10, 1, "alice", "edited", Utc::now());
    source.post(&message).unwrap();
    assert_eq!(source.attribute(10, "text").unwrap(), Some(Value::from("edited")));
}

#[test]
fn messages_of_a_bout_newest_first() {
    let source = populated();
    let numbers: Vec<u64> = source.messages(1).unwrap().iter().map(|m| m.number).collect();
    // 11 and 12 share a date, the higher number comes first
    assert_eq!(numbers, vec![12, 11, 10]);
    assert_eq!(source.messages(2).unwrap()[0].author, "carol");
    assert!(source.messages(3).unwrap().is_empty());
}

#[test]
fn engine_over_sqlite() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(IndexStore::open(dir.path()).unwrap());
    let engine = Engine::new(Arc::clone(&store), Arc::new(populated()));
    let found = engine.messages(1, "(and (equal $author alice) (equal $pos 0))").unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].number, 12);
    let up = engine.messages(1, "(matches \"up?\" $text)").unwrap();
    assert_eq!(up.iter().map(|m| m.number).collect::<Vec<_>>(), vec![11]);
    let with_bob = engine.messages(1, "(contains $participants bob)").unwrap();
    assert_eq!(with_bob.len(), 3);
    assert_eq!(store.index_for("participants").unwrap().len().unwrap(), 3);
}

#[test]
fn indexing_posted_messages() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(IndexStore::open(dir.path()).unwrap());
    let source = Arc::new(SqliteSource::in_memory().unwrap());
    let engine = Engine::new(Arc::clone(&store), Arc::clone(&source) as Arc<dyn MessageSource>);
    let message = Message::new(5, 3, "dave", "indexed up front", Utc::now());
    source.post(&message).unwrap();
    engine.index_message(&message).unwrap();
    for name in Message::ATTRIBUTES {
        assert_eq!(store.index_for(name).unwrap().get(5).unwrap(), message.attribute(name).unwrap());
    }
    assert_eq!(store.flush_all().unwrap(), 4);
    // `$number` comes from the candidate, no index is kept for it
    assert!(!store.statistics().unwrap().contains("number:"));
    assert!(!boutinf::persist::index_path(dir.path(), "number").exists());
}
