use daylog_core::open_db_in_memory;
use daylog_core::repo::project_repo::{list_projects, ProjectRepoError, ProjectResolver};
use rusqlite::{Connection, Transaction, TransactionBehavior};

#[test]
fn nested_path_creates_every_ancestor_in_order() {
    let conn = open_db_in_memory().unwrap();
    let mut resolver = ProjectResolver::new(&conn);
    resolver.preload_and_resolve(["a_b_c"]).unwrap();

    let projects = list_projects(&conn).unwrap();
    assert_eq!(projects.len(), 3);

    let by_path = |path: &str| projects.iter().find(|p| p.full_path == path).unwrap();
    let (a, ab, abc) = (by_path("a"), by_path("a_b"), by_path("a_b_c"));
    assert_eq!((a.parent_id, a.depth), (None, 0));
    assert_eq!((ab.parent_id, ab.depth), (Some(a.id), 1));
    assert_eq!((abc.parent_id, abc.depth), (Some(ab.id), 2));
    assert_eq!(abc.name, "c");
    assert!(a.id < ab.id && ab.id < abc.id);

    assert_eq!(resolver.get_id("a_b_c").unwrap(), abc.id);
    assert_eq!(resolver.inserted_count(), 3);
}

#[test]
fn shared_ancestors_are_inserted_once() {
    let conn = open_db_in_memory().unwrap();
    let mut resolver = ProjectResolver::new(&conn);
    resolver
        .preload_and_resolve(["study_math", "study_english", "study_math", "sleep"])
        .unwrap();

    assert_eq!(resolver.inserted_count(), 4);
    assert_eq!(count_projects(&conn), 4);
}

#[test]
fn get_id_for_unloaded_path_is_an_error() {
    let conn = open_db_in_memory().unwrap();
    let mut resolver = ProjectResolver::new(&conn);
    resolver.preload_and_resolve(["study_math"]).unwrap();

    match resolver.get_id("recreation_game").unwrap_err() {
        ProjectRepoError::Unresolved(path) => assert_eq!(path, "recreation_game"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn new_resolver_starts_with_empty_cache_and_reuses_rows() {
    let conn = open_db_in_memory().unwrap();
    let first_id = {
        let mut first = ProjectResolver::new(&conn);
        first.preload_and_resolve(["exercise_cardio"]).unwrap();
        first.get_id("exercise_cardio").unwrap()
    };

    let mut second = ProjectResolver::new(&conn);
    assert!(second.get_id("exercise_cardio").is_err());

    second.preload_and_resolve(["exercise_cardio"]).unwrap();
    assert_eq!(second.get_id("exercise_cardio").unwrap(), first_id);
    assert_eq!(second.inserted_count(), 0);
}

#[test]
fn ids_from_a_rolled_back_batch_do_not_leak_into_the_next() {
    let conn = open_db_in_memory().unwrap();
    {
        let tx = Transaction::new_unchecked(&conn, TransactionBehavior::Immediate).unwrap();
        let mut resolver = ProjectResolver::new(&tx);
        resolver.preload_and_resolve(["routine_grooming"]).unwrap();
        tx.rollback().unwrap();
    }
    assert_eq!(count_projects(&conn), 0);

    let mut resolver = ProjectResolver::new(&conn);
    resolver.preload_and_resolve(["routine_grooming"]).unwrap();
    assert_eq!(resolver.inserted_count(), 2);
    assert_eq!(count_projects(&conn), 2);
}

#[test]
fn malformed_path_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let mut resolver = ProjectResolver::new(&conn);

    assert!(matches!(
        resolver.preload_and_resolve(["study__math"]),
        Err(ProjectRepoError::InvalidPath(_))
    ));
}

fn count_projects(conn: &Connection) -> i64 {
    conn.query_row("SELECT COUNT(*) FROM projects;", [], |row| row.get(0))
        .unwrap()
}
