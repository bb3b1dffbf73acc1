use reflow_core::db::establish_connection;
use reflow_core::error::CoreError;
use reflow_core::facade::ReflowFacade;
use reflow_core::models::{
    ConstraintTarget, Constraint, ExceptionVariant, NewConstraintData, NewInstanceExceptionData,
    NewPatternData, NewSeriesData, PatternKind,
};
use reflow_core::reflow::{reflow, ReflowInput};
use reflow_core::repository::{
    ConstraintRepository, ExceptionRepository, PatternRepository, SeriesRepository,
    SnapshotRepository, SqliteRepository,
};
use reflow_core::time::{LocalDate, LocalTime};
use tempfile::TempDir;

async fn setup_test_db() -> (SqliteRepository, TempDir) {
    let temp_dir = tempfile::tempdir().expect("failed to create temp directory");
    let db_path = temp_dir.path().join("test.db");

    let pool = establish_connection(&db_path.to_string_lossy())
        .await
        .expect("failed to establish test database connection");

    (SqliteRepository::new(pool), temp_dir)
}

fn date(y: i32, m: u32, d: u32) -> LocalDate {
    LocalDate::new(y, m, d).unwrap()
}

#[tokio::test]
async fn series_pattern_and_reflow_round_trip() {
    let (repo, _temp_dir) = setup_test_db().await;

    let series = repo
        .create_series(NewSeriesData { title: "Morning run".into(), ..Default::default() })
        .await
        .unwrap();

    repo.add_pattern(NewPatternData {
        series_id: series.id,
        kind: PatternKind::Daily,
        time: Some(LocalTime::new(7, 0, 0).unwrap()),
        duration_minutes: 30,
        fixed: true,
        all_day: false,
        time_window: None,
        days_before: 0,
        days_after: 0,
        condition: None,
        adaptive_duration: false,
    })
    .await
    .unwrap();

    let window_start = date(2025, 6, 1);
    let window_end = date(2025, 6, 1);
    let snapshot = repo.load_snapshot(window_start, window_end).await.unwrap();

    let input = ReflowInput {
        series: &snapshot.series,
        chain_links: &snapshot.chain_links,
        constraints: &snapshot.constraints,
        exceptions: &snapshot.exceptions,
        completions: &snapshot.completions,
        series_tags: &snapshot.series_tags,
        window_start,
        window_end,
        workload: None,
    };
    let output = reflow(&input);

    assert_eq!(output.assignments.len(), 1);
    assert!(output.conflicts.is_empty());
    assert_eq!(output.assignments[0].time.time(), LocalTime::new(7, 0, 0).unwrap());
}

#[tokio::test]
async fn no_overlap_constraint_forces_a_conflict_when_both_instances_are_fixed() {
    let (repo, _temp_dir) = setup_test_db().await;

    let a = repo.create_series(NewSeriesData { title: "Standup".into(), ..Default::default() }).await.unwrap();
    let b = repo.create_series(NewSeriesData { title: "Review".into(), ..Default::default() }).await.unwrap();

    for series in [&a, &b] {
        repo.add_pattern(NewPatternData {
            series_id: series.id,
            kind: PatternKind::Daily,
            time: Some(LocalTime::new(9, 0, 0).unwrap()),
            duration_minutes: 60,
            fixed: true,
            all_day: false,
            time_window: None,
            days_before: 0,
            days_after: 0,
            condition: None,
            adaptive_duration: false,
        })
        .await
        .unwrap();
    }

    repo.add_constraint(NewConstraintData {
        constraint: Constraint::NoOverlap {
            a: ConstraintTarget::Series(a.id),
            b: ConstraintTarget::Series(b.id),
        },
    })
    .await
    .unwrap();

    let window_start = date(2025, 6, 1);
    let window_end = date(2025, 6, 1);
    let snapshot = repo.load_snapshot(window_start, window_end).await.unwrap();

    let input = ReflowInput {
        series: &snapshot.series,
        chain_links: &snapshot.chain_links,
        constraints: &snapshot.constraints,
        exceptions: &snapshot.exceptions,
        completions: &snapshot.completions,
        series_tags: &snapshot.series_tags,
        window_start,
        window_end,
        workload: None,
    };
    let output = reflow(&input);

    // Both instances are fixed at the same time, so neither can move; the
    // engine still assigns both instances and surfaces the overlap.
    assert_eq!(output.assignments.len(), 2);
    assert!(!output.conflicts.is_empty());
}

#[tokio::test]
async fn cancelled_exception_removes_the_instance_from_the_window() {
    let (repo, _temp_dir) = setup_test_db().await;

    let series = repo.create_series(NewSeriesData { title: "Weigh-in".into(), ..Default::default() }).await.unwrap();
    repo.add_pattern(NewPatternData {
        series_id: series.id,
        kind: PatternKind::Daily,
        time: Some(LocalTime::new(7, 0, 0).unwrap()),
        duration_minutes: 10,
        fixed: true,
        all_day: false,
        time_window: None,
        days_before: 0,
        days_after: 0,
        condition: None,
        adaptive_duration: false,
    })
    .await
    .unwrap();

    let target_date = date(2025, 6, 2);
    repo.upsert_exception(NewInstanceExceptionData {
        series_id: series.id,
        original_date: target_date,
        variant: ExceptionVariant::Cancelled,
    })
    .await
    .unwrap();

    let window_start = date(2025, 6, 1);
    let window_end = date(2025, 6, 3);
    let snapshot = repo.load_snapshot(window_start, window_end).await.unwrap();

    let input = ReflowInput {
        series: &snapshot.series,
        chain_links: &snapshot.chain_links,
        constraints: &snapshot.constraints,
        exceptions: &snapshot.exceptions,
        completions: &snapshot.completions,
        series_tags: &snapshot.series_tags,
        window_start,
        window_end,
        workload: None,
    };
    let output = reflow(&input);

    assert_eq!(output.assignments.len(), 2);
    assert!(output.assignments.iter().all(|a| a.date != target_date));
}

#[tokio::test]
async fn a_cancelled_instance_rejects_a_later_reschedule() {
    let (repo, _temp_dir) = setup_test_db().await;
    let series = repo.create_series(NewSeriesData { title: "Checkup".into(), ..Default::default() }).await.unwrap();

    repo.upsert_exception(NewInstanceExceptionData {
        series_id: series.id,
        original_date: date(2025, 6, 2),
        variant: ExceptionVariant::Cancelled,
    })
    .await
    .unwrap();

    let result = repo
        .upsert_exception(NewInstanceExceptionData {
            series_id: series.id,
            original_date: date(2025, 6, 2),
            variant: ExceptionVariant::Rescheduled { new_time: date(2025, 6, 2).at(LocalTime::new(9, 0, 0).unwrap()) },
        })
        .await;

    assert!(matches!(result, Err(CoreError::CancelledInstance(_))));
}

#[tokio::test]
async fn deleting_a_series_with_logged_completions_is_rejected() {
    use reflow_core::models::NewCompletionData;
    use reflow_core::repository::CompletionRepository;

    let (repo, _temp_dir) = setup_test_db().await;
    let series = repo.create_series(NewSeriesData { title: "Journaling".into(), ..Default::default() }).await.unwrap();

    repo.log_completion(NewCompletionData {
        series_id: series.id,
        instance_date: date(2025, 6, 1),
        start_time: None,
        end_time: None,
    })
    .await
    .unwrap();

    let result = repo.delete_series(series.id).await;
    assert!(matches!(result, Err(CoreError::CompletionsExist(_))));
}

#[tokio::test]
async fn facade_reuses_cached_result_until_the_snapshot_changes() {
    let (repo, _temp_dir) = setup_test_db().await;
    let series = repo.create_series(NewSeriesData { title: "Stretch".into(), ..Default::default() }).await.unwrap();
    repo.add_pattern(NewPatternData {
        series_id: series.id,
        kind: PatternKind::Daily,
        time: Some(LocalTime::new(8, 0, 0).unwrap()),
        duration_minutes: 15,
        fixed: true,
        all_day: false,
        time_window: None,
        days_before: 0,
        days_after: 0,
        condition: None,
        adaptive_duration: false,
    })
    .await
    .unwrap();

    let facade = ReflowFacade::new(repo);
    let window_start = date(2025, 6, 1);
    let window_end = date(2025, 6, 1);

    let first = facade.reflow_window(window_start, window_end).await.unwrap();
    assert_eq!(first.assignments.len(), 1);

    // A second call against the same window is deterministic, whether served
    // from cache or recomputed from a freshly hydrated snapshot.
    use reflow_core::models::NewCompletionData;
    use reflow_core::repository::CompletionRepository;
    facade
        .repository()
        .log_completion(NewCompletionData {
            series_id: series.id,
            instance_date: date(2025, 5, 1),
            start_time: None,
            end_time: None,
        })
        .await
        .unwrap();

    let second = facade.reflow_window(window_start, window_end).await.unwrap();
    assert_eq!(second.assignments.len(), first.assignments.len());

    facade.invalidate();
    let window_start2 = date(2025, 6, 2);
    let window_end2 = date(2025, 6, 2);
    let third = facade.reflow_window(window_start2, window_end2).await.unwrap();
    assert_eq!(third.assignments.len(), 1);
}
