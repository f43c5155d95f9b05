use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use kissen_meta::{
    BackendError, MemoryBackend, MetaBackend, MetaData, ObjectMeta, QueryDelete, QueryInsert,
    QuerySelect, QueryUpdate, Table,
};
use serde::{Deserialize, Serialize};
use test_case::test_case;

use super::*;

/// Memory backend that counts write statements.
struct CountingBackend {
    inner: MemoryBackend,
    writes: AtomicU64,
}

impl CountingBackend {
    fn new() -> Self {
        Self {
            inner: MemoryBackend::new(Table::object("savable")),
            writes: AtomicU64::new(0),
        }
    }

    fn writes(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }
}

impl MetaBackend for CountingBackend {
    fn table(&self) -> &Table {
        self.inner.table()
    }

    fn execute_select(&self, query: &QuerySelect) -> std::result::Result<Vec<Vec<String>>, BackendError> {
        self.inner.execute_select(query)
    }

    fn execute_update(&self, query: &QueryUpdate) -> std::result::Result<u64, BackendError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.execute_update(query)
    }

    fn execute_insert(&self, query: &QueryInsert) -> std::result::Result<u64, BackendError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.execute_insert(query)
    }

    fn execute_delete(&self, query: &QueryDelete) -> std::result::Result<u64, BackendError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.execute_delete(query)
    }
}

fn storage() -> (Arc<CountingBackend>, Arc<ObjectMeta>) {
    let backend = Arc::new(CountingBackend::new());
    let meta = Arc::new(ObjectMeta::new(backend.clone()));
    (backend, meta)
}

type Log = Arc<Mutex<Vec<(ListExecution, Vec<i32>, Vec<i32>)>>>;

fn observed(items: Vec<i32>) -> (KissenList<i32>, Log) {
    let log: Log = Arc::default();
    let sink = Arc::clone(&log);
    let list = KissenList::from(items).with_action(Box::new(
        move |execution: ListExecution, before: &[i32], after: &[i32]| -> Result<()> {
            sink.lock()
                .unwrap()
                .push((execution, before.to_vec(), after.to_vec()));
            Ok(())
        },
    ));
    (list, log)
}

// ============================================================================
// KissenList
// ============================================================================

#[test]
fn test_action_fires_only_on_change() {
    let (mut list, log) = observed(vec![1, 2, 3]);

    assert!(!list.remove(&9).unwrap());
    assert!(!list.remove_if(|v| *v > 10).unwrap());
    assert!(log.lock().unwrap().is_empty());

    assert!(list.remove(&2).unwrap());
    let log = log.lock().unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0], (ListExecution::Remove, vec![1, 2, 3], vec![1, 3]));
}

#[test]
fn test_failing_action_rolls_back() {
    let mut list = KissenList::from(vec![1, 2]).with_action(Box::new(
        |execution: ListExecution, _: &[i32], _: &[i32]| -> Result<()> {
            Err(SavableError::Rejected {
                execution,
                reason: "read only".to_string(),
            })
        },
    ));

    let err = list.add(3).unwrap_err();
    assert!(matches!(
        err,
        SavableError::Rejected {
            execution: ListExecution::Add,
            ..
        }
    ));
    assert_eq!(list.as_slice(), &[1, 2]);

    assert!(list.clear().is_err());
    assert_eq!(list.len(), 2);
}

#[test]
fn test_replace_counts_and_keeps_positions() {
    let (mut list, log) = observed(vec![1, 7, 2, 7, 7]);
    let count = list.replace(|v| *v == 7, 0).unwrap();

    assert_eq!(count, 3);
    assert_eq!(list.as_slice(), &[1, 0, 2, 0, 0]);
    assert_eq!(log.lock().unwrap()[0].0, ListExecution::Replace);
}

#[test]
fn test_replace_or_insert() {
    let (mut list, _) = observed(vec![1, 2]);
    assert_eq!(list.replace_or_insert(|v| *v == 5, 5).unwrap(), 0);
    assert_eq!(list.as_slice(), &[1, 2, 5]);
    assert_eq!(list.replace_or_insert(|v| *v == 2, 4).unwrap(), 1);
    assert_eq!(list.as_slice(), &[1, 4, 5]);
    assert_eq!(list.replace_value(&4, 2).unwrap(), 1);
}

#[test]
fn test_invert() {
    let (mut list, _) = observed(vec![1]);
    assert_eq!(list.invert(2).unwrap(), (true, true));
    assert_eq!(list.invert(1).unwrap(), (false, true));
    assert_eq!(list.as_slice(), &[2]);
}

#[test]
fn test_clear_and_add_all_fires_once() {
    let (mut list, log) = observed(vec![1, 2]);
    list.clear_and_add_all([3, 4, 5]).unwrap();

    assert_eq!(list.as_slice(), &[3, 4, 5]);
    let log = log.lock().unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0], (ListExecution::AddAll, vec![1, 2], vec![3, 4, 5]));
}

#[test]
fn test_indexed_operations() {
    let (mut list, log) = observed(vec![1, 2, 3, 4, 5]);

    assert_eq!(list.set(0, 9).unwrap(), 1);
    list.insert(5, 6).unwrap();
    assert!(list.insert_all(1, [7, 8]).unwrap());
    assert_eq!(list.as_slice(), &[9, 7, 8, 2, 3, 4, 5, 6]);

    assert_eq!(list.remove_at(1).unwrap(), 7);
    list.remove_range(0..2).unwrap();
    assert_eq!(list.as_slice(), &[2, 3, 4, 5, 6]);

    let executions: Vec<_> = log.lock().unwrap().iter().map(|e| e.0).collect();
    assert_eq!(
        executions,
        vec![
            ListExecution::Set,
            ListExecution::AddIndex,
            ListExecution::AddAllIndexIncluded,
            ListExecution::RemoveIndex,
            ListExecution::RemoveRange,
        ]
    );
}

#[test_case(|l: &mut KissenList<i32>| l.set(3, 0).map(|_| ()) ; "set past end")]
#[test_case(|l: &mut KissenList<i32>| l.insert(4, 0) ; "insert past end")]
#[test_case(|l: &mut KissenList<i32>| l.remove_at(3).map(|_| ()) ; "remove past end")]
#[test_case(|l: &mut KissenList<i32>| l.remove_range(2..5) ; "range past end")]
fn test_out_of_bounds(op: fn(&mut KissenList<i32>) -> Result<()>) {
    let (mut list, log) = observed(vec![1, 2, 3]);
    assert!(matches!(op(&mut list), Err(SavableError::IndexOutOfBounds { .. })));
    assert_eq!(list.as_slice(), &[1, 2, 3]);
    assert!(log.lock().unwrap().is_empty());
}

#[test]
fn test_bulk_operations() {
    let (mut list, _) = observed(vec![1, 2, 3, 4]);
    assert!(list.remove_all(&[1, 4, 9]).unwrap());
    assert!(!list.retain_all(&[2, 3]).unwrap());
    assert!(list.add_all([5]).unwrap());
    list.replace_all(|v| v * 10).unwrap();
    assert_eq!(list.as_slice(), &[20, 30, 50]);
}

// ============================================================================
// SavableRecordList
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Note {
    id: String,
    text: String,
}

fn note(id: &str, text: &str) -> Note {
    Note {
        id: id.to_string(),
        text: text.to_string(),
    }
}

#[test]
fn test_record_list_roundtrip() {
    let mut list = SavableList::new();
    let mut records = SavableRecordList::<Note>::new(&mut list);
    records.add(&note("a", "first")).unwrap();
    records.insert(0, &note("b", "second")).unwrap();

    assert!(records.contains(&note("a", "first")).unwrap());
    assert_eq!(
        records.to_record_list().unwrap(),
        vec![note("b", "second"), note("a", "first")]
    );
    assert!(records.remove(&note("b", "second")).unwrap());
    assert_eq!(records.len(), 1);
}

#[test_case(vec![], 0, vec![] ; "no match leaves list unchanged")]
#[test_case(vec![note("a", "x")], 1, vec![note("a", "new")] ; "single match replaced")]
#[test_case(
    vec![note("a", "x"), note("b", "y"), note("a", "z")],
    2,
    vec![note("a", "new"), note("b", "y"), note("a", "new")]
    ; "several matches all replaced"
)]
fn test_replace_record(initial: Vec<Note>, expected_count: usize, expected: Vec<Note>) {
    let mut list = SavableList::new();
    let mut records = SavableRecordList::<Note>::new(&mut list);
    records.add_all_records(&initial).unwrap();

    let count = records.replace_record(|n| n.id == "a", &note("a", "new")).unwrap();
    assert_eq!(count, expected_count);
    assert_eq!(records.to_record_list().unwrap(), expected);
}

#[test]
fn test_remove_if_record_skips_undecodable() {
    let mut list = SavableList::from(vec!["not json".to_string()]);
    let mut records = SavableRecordList::<Note>::new(&mut list);
    records.add_all_records(&[note("a", "x"), note("b", "y")]).unwrap();

    assert!(records.remove_if_record(|n| n.id == "a").unwrap());
    assert!(records.remove_all_records(&[note("b", "y")]).unwrap());
    assert!(records.to_record_list().is_err());
    assert_eq!(list.as_slice(), &["not json".to_string()]);
}

// ============================================================================
// SavableMap
// ============================================================================

#[test]
fn test_set_writes_through_and_skips_unchanged() {
    let (backend, meta) = storage();
    let mut map = SavableMap::new("banid1", meta.clone());

    assert_eq!(map.set("name", Some("spam")).unwrap(), None);
    let writes = backend.writes();
    assert_eq!(meta.get_string("banid1", "name").unwrap().as_deref(), Some("spam"));

    map.set("name", Some("spam")).unwrap();
    assert_eq!(backend.writes(), writes);

    assert_eq!(map.set("name", None).unwrap().as_deref(), Some("spam"));
    assert!(!map.contains_key("name"));
    assert_eq!(meta.get_string("banid1", "name").unwrap(), None);
}

#[test]
fn test_put_is_memory_only() {
    let (backend, meta) = storage();
    let mut map = SavableMap::new("p", meta.clone());
    map.put("nick", Some("Alex".to_string()));
    map.put_list("homes", vec!["spawn".to_string()]);
    map.put_list_value("homes", "mine".to_string());
    map.get_list_mut("homes").unwrap().add("base".to_string()).unwrap();

    assert_eq!(backend.writes(), 0);
    assert_eq!(map.get("nick"), Some("Alex"));
    assert_eq!(map.get_list("homes").unwrap().as_slice(), &["spawn", "mine", "base"]);
    assert!(map.remove_list_value("homes", "mine"));
    assert!(meta.get_data("p").is_empty());
}

#[test]
fn test_transient_list_stays_transient() {
    let (backend, meta) = storage();
    let mut map = SavableMap::new("p1", meta.clone());
    map.put_list("k", vec!["session".to_string()]);

    assert!(map.set_list_value("k", "durable".to_string()).unwrap());
    assert!(map.delete_list_value("k", "session").unwrap());
    map.record_list::<Note>("k").add(&note("a", "x")).unwrap();

    assert!(!map.get_list("k").unwrap().has_action());
    assert_eq!(map.get_list("k").unwrap().as_slice().len(), 2);
    assert_eq!(backend.writes(), 0);
    assert_eq!(meta.get_string_list("p1", "k").unwrap(), None);
}

#[test]
fn test_set_list_value_creates_persisted_list() {
    let (_, meta) = storage();
    let mut map = SavableMap::new("p1", meta.clone());
    assert!(map.set_list_value("k", "durable".to_string()).unwrap());
    assert!(map.get_list("k").unwrap().has_action());
    assert_eq!(meta.get_string_list("p1", "k").unwrap(), Some(vec!["durable".to_string()]));
    assert!(!map.delete_list_value("missing", "durable").unwrap());
}

#[test_case("_flag", "on" ; "plain scalar")]
#[test_case("_tags", "[\"x\"]" ; "scalar shaped like a list")]
fn test_prefixed_scalar_is_rejected(key: &str, value: &str) {
    let (backend, meta) = storage();
    let mut map = SavableMap::new("p2", meta.clone());

    assert!(matches!(
        map.set(key, Some(value)),
        Err(SavableError::Meta(kissen_meta::MetaError::ReservedKey(_)))
    ));
    assert!(!map.contains_key(key));
    assert_eq!(backend.writes(), 0);
    assert_eq!(meta.get_string_list("p2", "tags").unwrap(), None);

    map.put(key, Some(value.to_string()));
    assert!(map.flush().is_err());
    assert!(meta.get_data("p2").is_empty());
}

#[test]
fn test_set_if_absent_and_get_not_null() {
    let (_, meta) = storage();
    let mut map = SavableMap::new("p", meta);
    assert!(map.set_if_absent("rank", "guest").unwrap());
    assert!(!map.set_if_absent("rank", "admin").unwrap());
    assert_eq!(map.get_not_null("rank").unwrap(), "guest");
    assert!(matches!(
        map.get_not_null("missing"),
        Err(SavableError::MissingKey { .. })
    ));
}

#[test]
fn test_set_list_persists_later_mutations() {
    let (_, meta) = storage();
    let mut map = SavableMap::new("permissiongroupmod", meta.clone());
    map.set_list("group_member", vec!["alice".to_string()]).unwrap();

    map.get_list_mut("group_member")
        .unwrap()
        .add("bob".to_string())
        .unwrap();
    assert_eq!(
        meta.get_string_list("permissiongroupmod", "group_member").unwrap(),
        Some(vec!["alice".to_string(), "bob".to_string()])
    );

    assert!(map.delete_list_value("group_member", "alice").unwrap());
    assert!(map.set_list_value("group_member", "carol".to_string()).unwrap());
    assert_eq!(
        meta.get_string_list("permissiongroupmod", "group_member").unwrap(),
        Some(vec!["bob".to_string(), "carol".to_string()])
    );

    assert_eq!(
        map.delete_list("group_member").unwrap(),
        Some(vec!["bob".to_string(), "carol".to_string()])
    );
    assert_eq!(meta.get_string_list("permissiongroupmod", "group_member").unwrap(), None);
}

#[test]
fn test_set_list_if_absent() {
    let (_, meta) = storage();
    let mut map = SavableMap::new("p", meta);
    assert!(map.set_list_if_absent("a", vec!["1".to_string()]).unwrap());
    assert!(!map.set_list_if_absent("a", vec!["2".to_string()]).unwrap());
    assert!(map.put_list_if_absent("b", Vec::new()));
    assert!(!map.put_list_if_absent("b", Vec::new()));
    assert_eq!(map.get_list_not_null("a").unwrap().as_slice(), &["1"]);
    assert!(map.get_list_not_null("c").is_err());
}

#[test]
fn test_record_list_persists() {
    let (_, meta) = storage();
    let mut map = SavableMap::new("p", meta.clone());
    map.record_list::<Note>("notes").add(&note("a", "x")).unwrap();

    let reloaded = SavableMap::from_data("p", meta.clone(), meta.get_data("p"));
    assert_eq!(reloaded.records::<Note>("notes").unwrap(), vec![note("a", "x")]);
    assert!(reloaded.records::<Note>("other").unwrap().is_empty());
}

// ============================================================================
// Savable
// ============================================================================

#[derive(Debug)]
struct Warp {
    name: String,
    repository: SavableMap,
}

impl Warp {
    fn load(meta: Arc<ObjectMeta>, name: &str, seed: Option<MetaData>) -> Result<Self> {
        let repository = setup_repository(meta, "warp", name, &["world"], seed)?;
        Ok(Self {
            name: name.to_string(),
            repository,
        })
    }
}

impl Savable for Warp {
    fn save_id(&self) -> &str {
        "warp"
    }

    fn raw_id(&self) -> &str {
        &self.name
    }

    fn repository(&self) -> &SavableMap {
        &self.repository
    }

    fn repository_mut(&mut self) -> &mut SavableMap {
        &mut self.repository
    }
}

fn seed(values: &[(&str, &str)]) -> MetaData {
    let mut data = MetaData::default();
    for (key, value) in values {
        data.values.insert((*key).to_string(), (*value).to_string());
    }
    data
}

#[test]
fn test_setup_requires_keys() {
    let (_, meta) = storage();
    let err = Warp::load(meta, "spawn", None).unwrap_err();
    match err {
        SavableError::Initialize { id, missing } => {
            assert_eq!(id, "warpspawn");
            assert_eq!(missing, vec!["world".to_string()]);
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn test_setup_new_entity_writes_seed_and_id() {
    let (_, meta) = storage();
    let warp = Warp::load(meta.clone(), "spawn", Some(seed(&[("world", "overworld")]))).unwrap();

    assert_eq!(warp.id(), "warpspawn");
    assert_eq!(warp.repository().get("id"), Some("spawn"));

    let stored = meta.get_data("warpspawn");
    assert_eq!(stored.values.get("world").map(String::as_str), Some("overworld"));
    assert_eq!(stored.values.get("id").map(String::as_str), Some("spawn"));

    let loaded = Warp::load(meta, "spawn", None).unwrap();
    assert_eq!(loaded.repository().get("world"), Some("overworld"));
}

#[test]
fn test_delete_purges() {
    let (_, meta) = storage();
    let mut warp = Warp::load(meta.clone(), "spawn", Some(seed(&[("world", "overworld")]))).unwrap();
    warp.repository_mut()
        .set_list("visitors", vec!["alice".to_string()])
        .unwrap();

    assert_eq!(warp.delete().unwrap(), 3);
    assert!(warp.repository().is_empty());
    assert!(meta.get_data("warpspawn").is_empty());
}

// ============================================================================
// Property tests
// ============================================================================

mod properties {
    use proptest::prelude::*;

    use super::*;

    #[derive(Debug, Clone)]
    enum Op {
        Add(u8),
        Remove(u8),
        Invert(u8),
        Replace(u8, u8),
        Clear,
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            any::<u8>().prop_map(Op::Add),
            any::<u8>().prop_map(Op::Remove),
            any::<u8>().prop_map(Op::Invert),
            (any::<u8>(), any::<u8>()).prop_map(|(a, b)| Op::Replace(a, b)),
            Just(Op::Clear),
        ]
    }

    proptest! {
        /// The last value seen by the action always equals the list contents.
        #[test]
        fn prop_action_mirrors_list(ops in prop::collection::vec(op(), 0..40)) {
            let mirror: Arc<Mutex<Vec<u8>>> = Arc::default();
            let sink = Arc::clone(&mirror);
            let mut list = KissenList::new().with_action(Box::new(
                move |_: ListExecution, _: &[u8], after: &[u8]| -> Result<()> {
                    *sink.lock().unwrap() = after.to_vec();
                    Ok(())
                },
            ));

            for op in ops {
                match op {
                    Op::Add(v) => { list.add(v).unwrap(); }
                    Op::Remove(v) => { list.remove(&v).unwrap(); }
                    Op::Invert(v) => { list.invert(v).unwrap(); }
                    Op::Replace(old, new) => { list.replace_value(&old, new).unwrap(); }
                    Op::Clear => list.clear().unwrap(),
                }
                let mirrored = mirror.lock().unwrap().clone();
                prop_assert_eq!(mirrored.as_slice(), list.as_slice());
            }
        }
    }
}
