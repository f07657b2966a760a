use daylog_core::repo::day_repo::{count_days, count_records, load_day_records};
use daylog_core::{
    convert_sources, import_sources, open_db_in_memory, read_sources, replace_month_from_sources,
    Converter, ConverterConfig, MonthKey, SourceFile,
};

const JANUARY: &str = "y2024
0130
0700getup
1200study_math
2300recreation_game
0131
0710getup
1200study_english
2330recreation_bilibili
";

const FEBRUARY: &str = "y2024
0201
0700getup
0730routine_grooming
1200study_math
0202
0705getup
0900exercise_cardio
2200recreation_zhihu
";

fn converter() -> Converter {
    Converter::new(ConverterConfig::default()).unwrap()
}

fn sources() -> Vec<SourceFile> {
    vec![
        SourceFile::new("2024-02.txt", FEBRUARY),
        SourceFile::new("2024-01.txt", JANUARY),
    ]
}

#[test]
fn month_boundary_gets_overnight_sleep() {
    let output = convert_sources(&converter(), &sources());

    let february = &output.months[&MonthKey::new(2024, 2)];
    let first = &february[0];
    assert_eq!(first.date, "2024-02-01");

    let sleep = &first.activities[0];
    assert_eq!(sleep.project_path, "sleep_night");
    assert_eq!(sleep.start_time, "23:30");
    assert_eq!(sleep.end_time, "07:00");
    assert_eq!(sleep.duration_seconds, 27_000);
    assert_eq!(first.stats.sleep_night_time, 27_000);
    assert_eq!(sleep.logical_id, 20240201_0001);
}

#[test]
fn merged_output_is_ordered_and_independent_of_input_order() {
    let forward = convert_sources(&converter(), &sources());
    let mut reversed_sources = sources();
    reversed_sources.reverse();
    let reversed = convert_sources(&converter(), &reversed_sources);

    let dates: Vec<&str> = forward.days().map(|day| day.date.as_str()).collect();
    assert_eq!(dates, vec!["2024-01-30", "2024-01-31", "2024-02-01", "2024-02-02"]);

    let forward_days: Vec<_> = forward.days().cloned().collect();
    let reversed_days: Vec<_> = reversed.days().cloned().collect();
    assert_eq!(forward_days, reversed_days);
    assert_eq!(forward.outcomes[0].name, "2024-02.txt");
}

#[test]
fn import_persists_linked_days_and_is_repeatable() {
    let conn = open_db_in_memory().unwrap();
    let (output, summary) = import_sources(&conn, &converter(), &sources()).unwrap();

    assert_eq!(output.rejected().count(), 0);
    assert_eq!(summary.days_written, 4);
    assert_eq!(count_days(&conn).unwrap(), 4);

    let records = load_day_records(&conn, "2024-02-01").unwrap();
    assert_eq!(records[0].project_path, "sleep_night");
    assert_eq!(records[0].duration_seconds, 27_000);

    let before = count_records(&conn).unwrap();
    import_sources(&conn, &converter(), &sources()).unwrap();
    assert_eq!(count_records(&conn).unwrap(), before);
}

#[test]
fn replace_month_from_sources_writes_only_the_requested_month() {
    let conn = open_db_in_memory().unwrap();
    let (_, summary) =
        replace_month_from_sources(&conn, &converter(), &sources(), MonthKey::new(2024, 2))
            .unwrap();

    assert_eq!(summary.days_written, 2);
    assert_eq!(count_days(&conn).unwrap(), 2);
    assert!(load_day_records(&conn, "2024-01-31").unwrap().is_empty());
    assert_eq!(
        load_day_records(&conn, "2024-02-01").unwrap()[0].project_path,
        "sleep_night"
    );
}

#[test]
fn rejected_source_does_not_block_the_others() {
    let mut inputs = sources();
    inputs.push(SourceFile::new("broken.txt", "0301\n0700getup\n"));

    let output = convert_sources(&converter(), &inputs);
    assert_eq!(output.days().count(), 4);

    let rejected: Vec<&str> = output.rejected().map(|o| o.name.as_str()).collect();
    assert_eq!(rejected, vec!["broken.txt"]);
}

#[test]
fn files_on_disk_are_read_before_conversion() {
    let dir = tempfile::tempdir().unwrap();
    let january = dir.path().join("january.txt");
    let february = dir.path().join("february.txt");
    std::fs::write(&january, JANUARY).unwrap();
    std::fs::write(&february, FEBRUARY).unwrap();

    let sources = read_sources(&[january, february]).unwrap();
    assert_eq!(sources.len(), 2);

    let output = convert_sources(&converter(), &sources);
    assert_eq!(output.months.len(), 2);
}

#[test]
fn month_boundary_links_even_when_month_ends_early() {
    let january = SourceFile::new(
        "2024-01.txt",
        "y2024\n0129\n0700getup\n1200study_math\n2330recreation_game\n",
    );
    let february = SourceFile::new("2024-02.txt", FEBRUARY);

    let output = convert_sources(&converter(), &[january, february]);
    let first = &output.months[&MonthKey::new(2024, 2)][0];

    assert_eq!(first.activities[0].project_path, "sleep_night");
    assert_eq!(first.activities[0].duration_seconds, 27_000);
}

#[test]
fn month_opening_with_a_nap_is_not_linked() {
    let february = SourceFile::new(
        "2024-02.txt",
        "y2024\n0201\n0700getup\n1200study_math\n1300sleep_day\n2300sleep_night\n",
    );

    let output = convert_sources(&converter(), &[SourceFile::new("2024-01.txt", JANUARY), february]);
    let first = &output.months[&MonthKey::new(2024, 2)][0];

    assert!(first.has_sleep);
    assert_eq!(first.activities.len(), 3);
    assert_eq!(first.activities[0].project_path, "study_math");
}
