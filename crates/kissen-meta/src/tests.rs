use std::sync::Arc;

use proptest::prelude::*;
use serde::{Deserialize, Serialize};
use test_case::test_case;

use super::*;
use crate::sql::{DbLocation, DuckDbBackend, SqlDialect, SqlStatements, Statement};

#[derive(Debug, Clone, Copy)]
enum Backend {
    Memory,
    DuckDb,
}

fn meta_for(backend: Backend) -> Meta {
    let table = Table::object("meta");
    match backend {
        Backend::Memory => Meta::new(Arc::new(MemoryBackend::new(table))),
        Backend::DuckDb => Meta::new(Arc::new(DuckDbBackend::in_memory(table).unwrap())),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Home {
    world: String,
    x: i64,
    y: i64,
    z: i64,
}

// ============================================================================
// Filter evaluation
// ============================================================================

fn row_field(column: Column) -> &'static str {
    match column {
        Column::TotalId => "banid7",
        Column::Key => "name",
        Column::Value => "griefing",
    }
}

#[test_case(vec![], true ; "no filters match everything")]
#[test_case(vec![FilterQuery::equals(Column::TotalId, "banid7")], true ; "single equals")]
#[test_case(vec![FilterQuery::new(Column::TotalId, "banid", FilterType::StartsWith)], true ; "prefix")]
#[test_case(vec![FilterQuery::new(Column::Value, "ing", FilterType::EndsWith)], true ; "suffix")]
#[test_case(vec![
    FilterQuery::equals(Column::TotalId, "banid7"),
    FilterQuery::equals(Column::Key, "duration"),
], false ; "and requires both")]
#[test_case(vec![
    FilterQuery::equals(Column::Key, "duration"),
    FilterQuery::equals(Column::Key, "name").with_operator(FilterOperator::Or),
], true ; "or accepts either")]
#[test_case(vec![
    FilterQuery::equals(Column::Key, "name"),
    FilterQuery::equals(Column::Key, "duration").with_operator(FilterOperator::Or),
    FilterQuery::equals(Column::TotalId, "other"),
], true ; "and binds tighter than or")]
fn test_filter_evaluation(filters: Vec<FilterQuery>, expected: bool) {
    assert_eq!(FilterQuery::evaluate(&filters, row_field), expected);
}

// ============================================================================
// Typed access
// ============================================================================

#[test_case(Backend::Memory ; "memory")]
#[test_case(Backend::DuckDb ; "duckdb")]
fn test_set_none_deletes(backend: Backend) {
    let meta = meta_for(backend);
    meta.set_string("p1", "nick", Some("Steve")).unwrap();
    assert_eq!(meta.get_string("p1", "nick").unwrap().as_deref(), Some("Steve"));
    assert!(meta.contains("p1", "nick").unwrap());

    meta.set_string("p1", "nick", None).unwrap();
    assert_eq!(meta.get_string("p1", "nick").unwrap(), None);
    assert!(!meta.contains("p1", "nick").unwrap());
}

#[test_case(Backend::Memory ; "memory")]
#[test_case(Backend::DuckDb ; "duckdb")]
fn test_set_overwrites(backend: Backend) {
    let meta = meta_for(backend);
    meta.set_int("p1", "level", Some(3)).unwrap();
    meta.set_int("p1", "level", Some(4)).unwrap();
    assert_eq!(meta.get_int("p1", "level").unwrap(), Some(4));

    let rows = meta
        .select([Column::Key])
        .where_eq(Column::TotalId, "p1")
        .execute()
        .unwrap();
    assert_eq!(rows, vec![vec!["level".to_string()]]);
}

#[test_case(Backend::Memory ; "memory")]
#[test_case(Backend::DuckDb ; "duckdb")]
fn test_named_accessors(backend: Backend) {
    let meta = meta_for(backend);
    meta.set_long("p", "long", Some(i64::MIN)).unwrap();
    meta.set_short("p", "short", Some(-12)).unwrap();
    meta.set_byte("p", "byte", Some(i8::MAX)).unwrap();
    meta.set_double("p", "double", Some(0.1)).unwrap();
    meta.set_float("p", "float", Some(2.5)).unwrap();
    meta.set_boolean("p", "flag", Some(true)).unwrap();

    assert_eq!(meta.get_long("p", "long").unwrap(), Some(i64::MIN));
    assert_eq!(meta.get_short("p", "short").unwrap(), Some(-12));
    assert_eq!(meta.get_byte("p", "byte").unwrap(), Some(i8::MAX));
    assert_eq!(meta.get_double("p", "double").unwrap(), Some(0.1));
    assert_eq!(meta.get_float("p", "float").unwrap(), Some(2.5));
    assert_eq!(meta.get_boolean("p", "flag").unwrap(), Some(true));
    assert_eq!(meta.get_boolean("p", "missing").unwrap(), None);
}

#[test]
fn test_decode_failure_is_codec_error() {
    let meta = meta_for(Backend::Memory);
    meta.set_string("p", "level", Some("high")).unwrap();
    let err = meta.get_int("p", "level").unwrap_err();
    assert!(matches!(
        err,
        MetaError::Codec(CodecError::Invalid {
            kind: ValueKind::Int,
            ..
        })
    ));
}

#[test]
fn test_memory_records_value_kind() {
    let backend = Arc::new(MemoryBackend::new(Table::object("meta")));
    let meta = Meta::new(backend.clone());
    meta.set_long("p", "coins", Some(5)).unwrap();
    meta.set_string_list("p", "homes", Some(&["a".to_string()][..])).unwrap();

    assert_eq!(backend.kind_of("p", "coins"), Some(ValueKind::Long));
    assert_eq!(backend.kind_of("p", "_homes"), Some(ValueKind::List));
}

#[test]
fn test_memory_replace_is_never_observed_half_done() {
    let backend = Arc::new(MemoryBackend::new(Table::object("meta")));
    let meta = Meta::new(backend.clone());
    meta.set_int("p", "score", Some(0)).unwrap();

    std::thread::scope(|scope| {
        let reader = scope.spawn(|| {
            (0..2_000).all(|_| meta.get_string("p", "score").unwrap().is_some())
        });
        for score in 1..=2_000 {
            meta.set_int("p", "score", Some(score)).unwrap();
        }
        assert!(reader.join().unwrap(), "reader saw the row missing");
    });

    assert_eq!(meta.get_int("p", "score").unwrap(), Some(2_000));
    assert_eq!(backend.len(), 1);

    meta.set_int("p", "score", None).unwrap();
    assert!(backend.is_empty());
}

#[test]
fn test_value_kind_names_roundtrip() {
    for kind in [
        ValueKind::String,
        ValueKind::Long,
        ValueKind::Int,
        ValueKind::Short,
        ValueKind::Byte,
        ValueKind::Double,
        ValueKind::Float,
        ValueKind::Boolean,
        ValueKind::Record,
        ValueKind::List,
    ] {
        assert_eq!(kind.as_str().parse::<ValueKind>().unwrap(), kind);
    }
    assert!("uuid".parse::<ValueKind>().is_err());
}

proptest! {
    #[test]
    fn prop_long_roundtrip(value: i64) {
        let meta = meta_for(Backend::Memory);
        meta.set_long("p", "k", Some(value)).unwrap();
        prop_assert_eq!(meta.get_long("p", "k").unwrap(), Some(value));
    }

    #[test]
    fn prop_int_short_byte_roundtrip(a: i32, b: i16, c: i8) {
        let meta = meta_for(Backend::Memory);
        meta.set_int("p", "a", Some(a)).unwrap();
        meta.set_short("p", "b", Some(b)).unwrap();
        meta.set_byte("p", "c", Some(c)).unwrap();
        prop_assert_eq!(meta.get_int("p", "a").unwrap(), Some(a));
        prop_assert_eq!(meta.get_short("p", "b").unwrap(), Some(b));
        prop_assert_eq!(meta.get_byte("p", "c").unwrap(), Some(c));
    }

    #[test]
    fn prop_float_roundtrip(
        d in any::<f64>().prop_filter("finite", |v| v.is_finite()),
        f in any::<f32>().prop_filter("finite", |v| v.is_finite()),
    ) {
        let meta = meta_for(Backend::Memory);
        meta.set_double("p", "d", Some(d)).unwrap();
        meta.set_float("p", "f", Some(f)).unwrap();
        prop_assert_eq!(meta.get_double("p", "d").unwrap(), Some(d));
        prop_assert_eq!(meta.get_float("p", "f").unwrap(), Some(f));
    }

    #[test]
    fn prop_string_roundtrip(value in ".*") {
        let meta = meta_for(Backend::Memory);
        meta.set_string("p", "s", Some(&value)).unwrap();
        prop_assert_eq!(meta.get_string("p", "s").unwrap(), Some(value));
    }
}

// ============================================================================
// Records, lists and scopes
// ============================================================================

#[test_case(Backend::Memory ; "memory")]
#[test_case(Backend::DuckDb ; "duckdb")]
fn test_record_roundtrip(backend: Backend) {
    let meta = meta_for(backend);
    let home = Home {
        world: "world_nether".to_string(),
        x: -120,
        y: 64,
        z: 3_000,
    };
    meta.set_record("p1", "home", Some(&home)).unwrap();
    assert_eq!(meta.get_record::<Home>("p1", "home").unwrap(), Some(home));

    meta.set_record::<Home>("p1", "home", None).unwrap();
    assert_eq!(meta.get_record::<Home>("p1", "home").unwrap(), None);
}

#[test_case(Backend::Memory ; "memory")]
#[test_case(Backend::DuckDb ; "duckdb")]
fn test_string_list_keeps_order(backend: Backend) {
    let meta = meta_for(backend);
    let list = vec!["zeta".to_string(), "alpha".to_string(), "mid \"quoted\"".to_string()];
    meta.set_string_list("p1", "friends", Some(list.as_slice())).unwrap();

    assert_eq!(meta.get_string_list("p1", "friends").unwrap(), Some(list));
    assert!(meta.contains("p1", "_friends").unwrap());

    meta.set_string_list("p1", "friends", Some(&[][..])).unwrap();
    assert_eq!(meta.get_string_list("p1", "friends").unwrap(), None);
}

#[test_case(Backend::Memory ; "memory")]
#[test_case(Backend::DuckDb ; "duckdb")]
fn test_list_prefix_is_reserved_for_scalars(backend: Backend) {
    let meta = meta_for(backend);
    meta.set_string_list("p2", "tags", Some(&["x".to_string()][..])).unwrap();

    assert!(matches!(
        meta.set_string("p2", "_flag", Some("on")),
        Err(MetaError::ReservedKey(key)) if key == "_flag"
    ));
    assert!(matches!(
        meta.set_string("p2", "_tags", Some("[\"y\"]")),
        Err(MetaError::ReservedKey(_))
    ));
    assert!(matches!(meta.set_int("p2", "_level", Some(1)), Err(MetaError::ReservedKey(_))));
    assert!(matches!(meta.delete("p2", "_tags"), Err(MetaError::ReservedKey(_))));

    assert_eq!(meta.get_string("p2", "_flag").unwrap(), None);
    assert_eq!(meta.get_string_list("p2", "tags").unwrap(), Some(vec!["x".to_string()]));
}

#[test]
fn test_unscoped_uses_undefined_total_id() {
    let meta = meta_for(Backend::Memory);
    meta.unscoped().set::<i32>("motd_version", Some(&2)).unwrap();

    assert_eq!(meta.get_int(UNDEFINED, "motd_version").unwrap(), Some(2));
    assert_eq!(meta.unscoped().get::<i32>("motd_version").unwrap(), Some(2));
    assert_eq!(meta.unscoped().total_id(), "_UNDEFINED_");
}

#[test]
fn test_scope_isolates_total_ids() {
    let meta = meta_for(Backend::Memory);
    let alice = meta.scope("alice");
    let bob = meta.scope("bob");
    alice.set_string("rank", Some("admin")).unwrap();

    assert_eq!(alice.get_string("rank").unwrap().as_deref(), Some("admin"));
    assert_eq!(bob.get_string("rank").unwrap(), None);

    alice.delete("rank").unwrap();
    assert!(!alice.contains("rank").unwrap());
}

#[test_case(Backend::Memory ; "memory")]
#[test_case(Backend::DuckDb ; "duckdb")]
fn test_purge_removes_only_owner(backend: Backend) {
    let meta = meta_for(backend);
    meta.set_string("a", "x", Some("1")).unwrap();
    meta.set_string("a", "y", Some("2")).unwrap();
    meta.set_string("b", "x", Some("3")).unwrap();

    assert_eq!(meta.purge("a").unwrap(), 2);
    assert!(!meta.contains("a", "x").unwrap());
    assert_eq!(meta.get_string("b", "x").unwrap().as_deref(), Some("3"));
}

#[test_case(Backend::Memory ; "memory")]
#[test_case(Backend::DuckDb ; "duckdb")]
fn test_update_directives(backend: Backend) {
    let meta = meta_for(backend);
    meta.set_string("banid1", "ban_type", Some("mute")).unwrap();
    meta.set_string("banid2", "ban_type", Some("mute")).unwrap();
    meta.set_string("banid3", "ban_type", Some("kick")).unwrap();

    let changed = meta
        .update([QueryUpdateDirective::new(Column::Value, "ban")])
        .where_eq(Column::Key, "ban_type")
        .and_eq(Column::Value, "mute")
        .execute()
        .unwrap();

    assert_eq!(changed, 2);
    assert_eq!(meta.get_string("banid1", "ban_type").unwrap().as_deref(), Some("ban"));
    assert_eq!(meta.get_string("banid3", "ban_type").unwrap().as_deref(), Some("kick"));
}

#[test_case(Backend::Memory ; "memory")]
#[test_case(Backend::DuckDb ; "duckdb")]
fn test_prefix_filter_treats_wildcards_literally(backend: Backend) {
    let meta = meta_for(backend);
    meta.set_string("ban_1", "name", Some("a")).unwrap();
    meta.set_string("banx1", "name", Some("b")).unwrap();

    let rows = meta
        .select([Column::TotalId])
        .where_filter(Column::TotalId, "ban_", FilterType::StartsWith)
        .execute()
        .unwrap();
    assert_eq!(rows, vec![vec!["ban_1".to_string()]]);
}

#[test_case(Backend::Memory ; "memory")]
#[test_case(Backend::DuckDb ; "duckdb")]
fn test_value_suffix_filter(backend: Backend) {
    let meta = meta_for(backend);
    meta.set_string("a", "greeting", Some("hello")).unwrap();
    meta.set_string("b", "greeting", Some("yellow")).unwrap();

    let rows = meta
        .select([Column::TotalId, Column::Value])
        .where_filter(Column::Value, "llo", FilterType::EndsWith)
        .execute()
        .unwrap();
    assert_eq!(rows, vec![vec!["a".to_string(), "hello".to_string()]]);
}

// ============================================================================
// Object meta
// ============================================================================

fn object_meta() -> ObjectMeta {
    ObjectMeta::new(Arc::new(MemoryBackend::new(Table::object("objects"))))
}

#[test]
fn test_get_data_splits_values_and_lists() {
    let objects = object_meta();
    objects.set_string("permissiongroupadmin", "name", Some("admin")).unwrap();
    objects
        .set_string_list("permissiongroupadmin", "group_member", Some(&["alice".to_string()][..]))
        .unwrap();

    let data = objects.get_data("permissiongroupadmin");
    assert_eq!(data.values.get("name").map(String::as_str), Some("admin"));
    assert_eq!(data.lists.get("group_member"), Some(&vec!["alice".to_string()]));
    assert_eq!(data.len(), 2);
    assert!(objects.get_data("missing").is_empty());
}

#[test]
fn test_get_data_by_prefix_groups_by_owner() {
    let objects = object_meta();
    objects.set_string("banid1", "name", Some("spam")).unwrap();
    objects.set_string("banid1", "ban_type", Some("mute")).unwrap();
    objects.set_string("banid2", "name", Some("hack")).unwrap();
    objects.set_string("permissiongroupx", "name", Some("x")).unwrap();

    let bans = objects.get_data_by_prefix("banid").unwrap();
    assert_eq!(bans.keys().collect::<Vec<_>>(), vec!["banid1", "banid2"]);
    assert_eq!(bans["banid1"].values.len(), 2);
}

#[test]
fn test_insert_data_batch() {
    let objects = object_meta();
    let mut data = MetaData::default();
    data.values.insert("id".to_string(), "7".to_string());
    data.values.insert("name".to_string(), "spam".to_string());
    data.lists.insert("notes".to_string(), vec!["a".to_string(), "b".to_string()]);
    data.lists.insert("empty".to_string(), Vec::new());

    assert_eq!(objects.insert_data("banid7", &data).unwrap(), 3);
    data.lists.remove("empty");
    assert_eq!(objects.get_data("banid7"), data);
}

#[test]
fn test_insert_data_rejects_prefixed_scalar() {
    let objects = object_meta();
    let mut data = MetaData::default();
    data.values.insert("name".to_string(), "spam".to_string());
    data.values.insert("_flag".to_string(), "on".to_string());

    assert!(matches!(
        objects.insert_data("banid8", &data),
        Err(MetaError::ReservedKey(key)) if key == "_flag"
    ));
    assert!(objects.get_data("banid8").is_empty());
}

// ============================================================================
// SQL generation
// ============================================================================

fn statements(dialect: SqlDialect) -> SqlStatements {
    SqlStatements::new(Table::object("meta"), dialect)
}

#[test]
fn test_select_sql() {
    let query = QuerySelect::new([Column::Value])
        .where_eq(Column::TotalId, "abc")
        .and_eq(Column::Key, "name");
    assert_eq!(
        statements(SqlDialect::DuckDb).select(&query),
        Statement {
            sql: r#"SELECT "value" FROM "meta" WHERE "uuid" = ? AND "identifier" = ?"#.to_string(),
            params: vec!["abc".to_string(), "name".to_string()],
        }
    );
}

#[test_case(Column::TotalId, FilterType::StartsWith, "ban_", r#""uuid" LIKE ? ESCAPE '!'"#, "ban!_%" ; "prefix escapes underscore")]
#[test_case(Column::Key, FilterType::EndsWith, "100%", r#""identifier" LIKE ? ESCAPE '!'"#, "%100!%" ; "suffix escapes percent")]
#[test_case(Column::Value, FilterType::Equals, "x", r#""value" = ?"#, r#""x""# ; "value equality is json encoded")]
#[test_case(Column::Value, FilterType::StartsWith, "he", r#""value" LIKE ? ESCAPE '!'"#, r#""he%"# ; "value prefix keeps opening quote")]
#[test_case(Column::Value, FilterType::EndsWith, "lo", r#""value" LIKE ? ESCAPE '!'"#, r#"%lo""# ; "value suffix keeps closing quote")]
fn test_filter_sql(column: Column, filter_type: FilterType, value: &str, clause: &str, param: &str) {
    let query = QuerySelect::new([Column::Key]).where_filter(column, value, filter_type);
    let statement = statements(SqlDialect::DuckDb).select(&query);
    assert_eq!(
        statement.sql,
        format!(r#"SELECT "identifier" FROM "meta" WHERE {clause}"#)
    );
    assert_eq!(statement.params, vec![param.to_string()]);
}

#[test]
fn test_update_binds_assignments_before_filters() {
    let query = QueryUpdate::new([
        QueryUpdateDirective::new(Column::Value, "5"),
        QueryUpdateDirective::new(Column::Key, "level"),
    ])
    .where_eq(Column::TotalId, "a")
    .or_eq(Column::TotalId, "b");

    let statement = statements(SqlDialect::DuckDb).update(&query);
    assert_eq!(
        statement.sql,
        r#"UPDATE "meta" SET "value" = ?, "identifier" = ? WHERE "uuid" = ? OR "uuid" = ?"#
    );
    assert_eq!(statement.params, vec![r#""5""#, "level", "a", "b"]);
}

#[test]
fn test_mysql_insert_and_delete_sql() {
    let stmts = statements(SqlDialect::MySql);
    let insert = QueryInsert::new([
        MetaRow::new("p", "a", ValueKind::Int, "1"),
        MetaRow::new("p", "b", ValueKind::String, "two"),
    ]);
    let statement = stmts.insert(&insert);
    assert_eq!(
        statement.sql,
        "REPLACE INTO `meta` (`uuid`, `identifier`, `type`, `value`) VALUES (?, ?, ?, ?), (?, ?, ?, ?)"
    );
    assert_eq!(statement.params, vec!["p", "a", "int", r#""1""#, "p", "b", "string", r#""two""#]);

    let delete = stmts.delete(&QueryDelete::new().where_eq(Column::TotalId, "p"));
    assert_eq!(delete.sql, "DELETE FROM `meta` WHERE `uuid` = ?");
}

#[test]
fn test_mysql_ddl_enforces_json() {
    let ddl = statements(SqlDialect::MySql).create_table();
    assert!(ddl.starts_with("CREATE TABLE IF NOT EXISTS `meta`"));
    assert!(ddl.contains("`value` JSON NOT NULL CHECK (JSON_VALID(`value`))"));
    assert!(ddl.contains("PRIMARY KEY (`uuid`, `identifier`)"));
}

#[test]
fn test_quote_escapes_identifiers() {
    assert_eq!(SqlDialect::DuckDb.quote(r#"we"ird"#), r#""we""ird""#);
    assert_eq!(SqlDialect::MySql.quote("we`ird"), "`we``ird`");
}

#[test]
fn test_decode_value_passes_through_non_json() {
    assert_eq!(sql::decode_value(r#""plain""#.to_string()), "plain");
    assert_eq!(sql::decode_value("{\"a\":1}".to_string()), "{\"a\":1}");
}

#[test]
fn test_duckdb_file_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("kissen.duckdb");
    {
        let backend = DuckDbBackend::open(Table::object("meta"), DbLocation::File(path.clone())).unwrap();
        let meta = Meta::new(Arc::new(backend));
        meta.set_boolean("p", "vanished", Some(true)).unwrap();
    }

    let backend = DuckDbBackend::open(Table::object("meta"), DbLocation::File(path)).unwrap();
    let meta = Meta::new(Arc::new(backend));
    assert_eq!(meta.get_boolean("p", "vanished").unwrap(), Some(true));
}
