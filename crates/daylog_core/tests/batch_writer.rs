use daylog_core::ingest::stats::compute_day_stats;
use daylog_core::repo::day_repo::{count_days, count_records, load_day_records};
use daylog_core::{
    import, open_db, open_db_in_memory, replace_month, Activity, DayRecord, ImportData,
    WriteError,
};
use rusqlite::Connection;

fn day(year: i32, month: u32, day_of_month: u32, paths: &[(&str, &str, &str)]) -> DayRecord {
    let mut record = DayRecord::new(year, month, day_of_month);
    record.getup_time = paths.first().map(|(start, _, _)| (*start).to_string());
    record.activities = paths
        .iter()
        .map(|(start, end, path)| Activity::new(*start, *end, *path))
        .collect();
    compute_day_stats(&mut record).unwrap();
    record
}

fn ordinary_day(year: i32, month: u32, day_of_month: u32) -> DayRecord {
    day(
        year,
        month,
        day_of_month,
        &[
            ("07:00", "07:30", "routine_grooming"),
            ("07:30", "11:00", "study_math"),
            ("11:00", "12:00", "exercise_anaerobic"),
        ],
    )
}

fn count_projects(conn: &Connection) -> i64 {
    conn.query_row("SELECT COUNT(*) FROM projects;", [], |row| row.get(0))
        .unwrap()
}

#[test]
fn import_writes_days_records_and_projects() {
    let conn = open_db_in_memory().unwrap();
    let data = ImportData::from_days(&[ordinary_day(2024, 3, 1), ordinary_day(2024, 3, 2)]);

    let summary = import(&conn, &data).unwrap();
    assert_eq!(summary.days_written, 2);
    assert_eq!(summary.records_written, 6);
    assert_eq!(summary.projects_inserted, 6);

    assert_eq!(count_days(&conn).unwrap(), 2);
    assert_eq!(count_records(&conn).unwrap(), 6);

    let records = load_day_records(&conn, "2024-03-02").unwrap();
    let paths: Vec<&str> = records.iter().map(|r| r.project_path.as_str()).collect();
    assert_eq!(paths, vec!["routine_grooming", "study_math", "exercise_anaerobic"]);
    assert_eq!(records[1].duration_seconds, 210 * 60);
    assert_eq!(records[0].logical_id, 20240302_0001);
}

#[test]
fn reimporting_the_same_batch_is_idempotent() {
    let conn = open_db_in_memory().unwrap();
    let data = ImportData::from_days(&[ordinary_day(2024, 3, 1)]);

    import(&conn, &data).unwrap();
    let second = import(&conn, &data).unwrap();

    assert_eq!(second.projects_inserted, 0);
    assert_eq!(count_days(&conn).unwrap(), 1);
    assert_eq!(count_records(&conn).unwrap(), 3);
}

#[test]
fn reimporting_a_shorter_day_drops_its_stale_records() {
    let conn = open_db_in_memory().unwrap();
    import(&conn, &ImportData::from_days(&[ordinary_day(2024, 3, 1)])).unwrap();

    let shorter = day(
        2024,
        3,
        1,
        &[("07:00", "09:00", "study_math"), ("09:00", "10:00", "recreation_game")],
    );
    import(&conn, &ImportData::from_days(&[shorter])).unwrap();

    let activity_count: i64 = conn
        .query_row(
            "SELECT activity_count FROM days WHERE date = '2024-03-01';",
            [],
            |row| row.get(0),
        )
        .unwrap();
    let records = load_day_records(&conn, "2024-03-01").unwrap();
    assert_eq!(activity_count, 2);
    assert_eq!(records.len(), 2);
    assert_eq!(records[1].project_path, "recreation_game");
    assert_eq!(count_records(&conn).unwrap(), 2);
}

#[test]
fn failing_day_rolls_back_the_whole_batch() {
    let conn = open_db_in_memory().unwrap();
    let mut data = ImportData::from_days(&[ordinary_day(2024, 3, 1), ordinary_day(2024, 3, 2)]);
    data.days[1].month = 13;

    let err = import(&conn, &data).unwrap_err();
    assert!(matches!(err, WriteError::Db(_)), "unexpected error: {err}");

    assert_eq!(count_days(&conn).unwrap(), 0);
    assert_eq!(count_records(&conn).unwrap(), 0);
    assert_eq!(count_projects(&conn), 0);
}

#[test]
fn record_without_its_day_rolls_back_the_batch() {
    let conn = open_db_in_memory().unwrap();
    let mut data = ImportData::from_days(&[ordinary_day(2024, 3, 1)]);
    data.days.clear();

    assert!(import(&conn, &data).is_err());
    assert_eq!(count_records(&conn).unwrap(), 0);
    assert_eq!(count_projects(&conn), 0);
}

#[test]
fn replace_month_only_touches_that_month() {
    let conn = open_db_in_memory().unwrap();
    let initial = ImportData::from_days(&[
        ordinary_day(2024, 1, 30),
        ordinary_day(2024, 1, 31),
        ordinary_day(2024, 2, 1),
    ]);
    import(&conn, &initial).unwrap();

    let january = ImportData::from_days(&[day(
        2024,
        1,
        15,
        &[("08:00", "09:00", "study_english"), ("09:00", "10:00", "recreation_game")],
    )]);
    let summary = replace_month(&conn, 2024, 1, &january).unwrap();

    assert_eq!(summary.days_deleted, 2);
    assert_eq!(summary.records_deleted, 6);
    assert_eq!(count_days(&conn).unwrap(), 2);
    assert!(load_day_records(&conn, "2024-01-31").unwrap().is_empty());
    assert_eq!(load_day_records(&conn, "2024-01-15").unwrap().len(), 2);
    assert_eq!(load_day_records(&conn, "2024-02-01").unwrap().len(), 3);
}

#[test]
fn replacing_december_leaves_next_january_alone() {
    let conn = open_db_in_memory().unwrap();
    import(
        &conn,
        &ImportData::from_days(&[ordinary_day(2023, 12, 31), ordinary_day(2024, 1, 1)]),
    )
    .unwrap();

    let summary = replace_month(&conn, 2023, 12, &ImportData::default()).unwrap();

    assert_eq!(summary.days_deleted, 1);
    assert_eq!(count_days(&conn).unwrap(), 1);
    assert_eq!(load_day_records(&conn, "2024-01-01").unwrap().len(), 3);
}

#[test]
fn failed_replace_keeps_the_old_month() {
    let conn = open_db_in_memory().unwrap();
    import(&conn, &ImportData::from_days(&[ordinary_day(2024, 5, 1)])).unwrap();

    let mut broken = ImportData::from_days(&[ordinary_day(2024, 5, 2)]);
    broken.days[0].month = 13;
    assert!(replace_month(&conn, 2024, 5, &broken).is_err());

    assert_eq!(count_days(&conn).unwrap(), 1);
    assert_eq!(load_day_records(&conn, "2024-05-01").unwrap().len(), 3);
}

#[test]
fn batches_persist_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("days.db");
    {
        let conn = open_db(&path).unwrap();
        import(&conn, &ImportData::from_days(&[ordinary_day(2024, 6, 1)])).unwrap();
    }

    let conn = open_db(&path).unwrap();
    assert_eq!(count_days(&conn).unwrap(), 1);
    let getup: String = conn
        .query_row(
            "SELECT getup_time FROM days WHERE date = '2024-06-01';",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(getup, "07:00");
}

#[test]
fn writer_refuses_unmigrated_connection() {
    let conn = Connection::open_in_memory().unwrap();
    let err = import(&conn, &ImportData::default()).unwrap_err();
    assert!(matches!(err, WriteError::Db(_)));
}
