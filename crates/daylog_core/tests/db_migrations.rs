use daylog_core::db::migrations::latest_version;
use daylog_core::db::{ensure_schema_ready, open_db, open_db_in_memory, DbError};
use rusqlite::{params, Connection};

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    assert_table_exists(&conn, "days");
    assert_table_exists(&conn, "projects");
    assert_table_exists(&conn, "time_records");
    ensure_schema_ready(&conn).unwrap();
}

#[test]
fn reopening_a_file_database_keeps_schema_version() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("daylog.db");

    let first = open_db(&path).unwrap();
    assert_eq!(schema_version(&first), latest_version());
    drop(first);

    let second = open_db(&path).unwrap();
    assert_eq!(schema_version(&second), latest_version());
    assert_table_exists(&second, "time_records");
}

#[test]
fn newer_schema_version_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 42;").unwrap();
    drop(conn);

    match open_db(&path).unwrap_err() {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 42);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn raw_connection_is_not_schema_ready() {
    let conn = Connection::open_in_memory().unwrap();
    match ensure_schema_ready(&conn).unwrap_err() {
        DbError::UninitializedConnection { actual_version, .. } => assert_eq!(actual_version, 0),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn foreign_keys_are_enforced() {
    let conn = open_db_in_memory().unwrap();
    let enabled: i64 = conn
        .query_row("PRAGMA foreign_keys;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(enabled, 1);
}

#[test]
fn days_reject_out_of_range_month() {
    let conn = open_db_in_memory().unwrap();

    insert_day(&conn, "2024-12-31", 12).unwrap();
    assert!(insert_day(&conn, "2024-13-01", 13).is_err());
    assert!(insert_day(&conn, "2024-00-01", 0).is_err());
}

#[test]
fn time_records_reject_negative_duration_and_unknown_day() {
    let conn = open_db_in_memory().unwrap();
    insert_day(&conn, "2024-03-01", 3).unwrap();
    conn.execute(
        "INSERT INTO projects (name, parent_id, full_path, depth) VALUES ('study', NULL, 'study', 0);",
        [],
    )
    .unwrap();
    let project_id = conn.last_insert_rowid();

    assert!(insert_record(&conn, 20240301_0001, "2024-03-01", project_id, -60).is_err());
    assert!(insert_record(&conn, 20240302_0001, "2024-03-02", project_id, 60).is_err());
    insert_record(&conn, 20240301_0001, "2024-03-01", project_id, 60).unwrap();
}

#[test]
fn deleting_a_day_cascades_to_its_records() {
    let conn = open_db_in_memory().unwrap();
    insert_day(&conn, "2024-03-01", 3).unwrap();
    conn.execute(
        "INSERT INTO projects (name, parent_id, full_path, depth) VALUES ('study', NULL, 'study', 0);",
        [],
    )
    .unwrap();
    let project_id = conn.last_insert_rowid();
    insert_record(&conn, 20240301_0001, "2024-03-01", project_id, 60).unwrap();

    conn.execute("DELETE FROM days WHERE date = '2024-03-01';", [])
        .unwrap();
    let remaining: i64 = conn
        .query_row("SELECT COUNT(*) FROM time_records;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(remaining, 0);
}

fn insert_day(conn: &Connection, date: &str, month: u32) -> rusqlite::Result<usize> {
    conn.execute(
        "INSERT INTO days (date, year, month, getup_time) VALUES (?1, 2024, ?2, '07:00');",
        params![date, month],
    )
}

fn insert_record(
    conn: &Connection,
    logical_id: i64,
    date: &str,
    project_id: i64,
    duration: i64,
) -> rusqlite::Result<usize> {
    conn.execute(
        "INSERT INTO time_records (
            logical_id, date, start_timestamp, end_timestamp, start_time, end_time,
            project_id, duration
        ) VALUES (?1, ?2, 0, 60, '07:00', '07:01', ?3, ?4);",
        params![logical_id, date, project_id, duration],
    )
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}
