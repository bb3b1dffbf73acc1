use std::collections::HashMap;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use reflow_core::instance::SeriesWithPatterns;
use reflow_core::models::{ConstraintTarget, Constraint, Pattern, PatternKind, Series};
use reflow_core::reflow::{reflow, ReflowInput};
use reflow_core::time::{LocalDate, LocalTime};
use uuid::Uuid;

fn date(y: i32, m: u32, d: u32) -> LocalDate {
    LocalDate::new(y, m, d).unwrap()
}

fn flexible_series(n: usize, duration: i64) -> Vec<SeriesWithPatterns> {
    (0..n)
        .map(|i| {
            let series_id = Uuid::now_v7();
            let series = Series {
                id: series_id,
                title: format!("series-{i}"),
                start_date: None,
                end_date: None,
                locked: false,
                tags: vec![],
                cycling: None,
            };
            let pattern = Pattern {
                id: Uuid::now_v7(),
                series_id,
                kind: PatternKind::Daily,
                time: None,
                duration_minutes: duration,
                fixed: false,
                all_day: false,
                time_window: None,
                days_before: 0,
                days_after: 0,
                condition: None,
                adaptive_duration: false,
            };
            SeriesWithPatterns { series, patterns: vec![pattern] }
        })
        .collect()
}

/// Every pair of series in `n` is mutually `NoOverlap`, forcing the search to
/// actually branch rather than placing everything at its ideal time.
fn dense_no_overlap_constraints(series: &[SeriesWithPatterns]) -> Vec<Constraint> {
    let mut constraints = Vec::new();
    for i in 0..series.len() {
        for j in (i + 1)..series.len() {
            constraints.push(Constraint::NoOverlap {
                a: ConstraintTarget::Series(series[i].series.id),
                b: ConstraintTarget::Series(series[j].series.id),
            });
        }
    }
    constraints
}

fn bench_single_day_ten_items(c: &mut Criterion) {
    let series = flexible_series(10, 60);
    let constraints = dense_no_overlap_constraints(&series);
    let series_tags = HashMap::new();
    let day = date(2025, 6, 2);

    c.bench_function("reflow_single_day_10_items", |b| {
        b.iter(|| {
            let input = ReflowInput {
                series: black_box(&series),
                chain_links: &[],
                constraints: black_box(&constraints),
                exceptions: &[],
                completions: &[],
                series_tags: &series_tags,
                window_start: day,
                window_end: day,
                workload: None,
            };
            reflow(black_box(&input))
        })
    });
}

fn bench_one_week_hundred_items(c: &mut Criterion) {
    // 15 series over a 7-day window produces roughly 100 candidate instances.
    let series = flexible_series(15, 45);
    let series_tags = HashMap::new();
    let window_start = date(2025, 6, 2);
    let window_end = date(2025, 6, 8);

    let mut group = c.benchmark_group("reflow_week_window");
    group.bench_function(BenchmarkId::new("items", "~100"), |b| {
        b.iter(|| {
            let input = ReflowInput {
                series: black_box(&series),
                chain_links: &[],
                constraints: &[],
                exceptions: &[],
                completions: &[],
                series_tags: &series_tags,
                window_start,
                window_end,
                workload: None,
            };
            reflow(black_box(&input))
        })
    });
    group.finish();
}

/// Ten fixed, mutually-overlapping instances: every `NoOverlap` pair is
/// impossible to satisfy, so `backtrack_search` exhausts its search space and
/// every call falls through to `fallback::handle_no_solution`.
fn bench_unsolvable_ten_items(c: &mut Criterion) {
    let fixed_time = LocalTime::new(9, 0, 0).unwrap();
    let series: Vec<SeriesWithPatterns> = (0..10)
        .map(|i| {
            let series_id = Uuid::now_v7();
            let series = Series {
                id: series_id,
                title: format!("fixed-{i}"),
                start_date: None,
                end_date: None,
                locked: false,
                tags: vec![],
                cycling: None,
            };
            let pattern = Pattern {
                id: Uuid::now_v7(),
                series_id,
                kind: PatternKind::Daily,
                time: Some(fixed_time),
                duration_minutes: 60,
                fixed: true,
                all_day: false,
                time_window: None,
                days_before: 0,
                days_after: 0,
                condition: None,
                adaptive_duration: false,
            };
            SeriesWithPatterns { series, patterns: vec![pattern] }
        })
        .collect();
    let constraints = dense_no_overlap_constraints(&series);
    let series_tags = HashMap::new();
    let day = date(2025, 6, 2);

    c.bench_function("reflow_unsolvable_10_items", |b| {
        b.iter(|| {
            let input = ReflowInput {
                series: black_box(&series),
                chain_links: &[],
                constraints: black_box(&constraints),
                exceptions: &[],
                completions: &[],
                series_tags: &series_tags,
                window_start: day,
                window_end: day,
                workload: None,
            };
            reflow(black_box(&input))
        })
    });
}

criterion_group!(
    benches,
    bench_single_day_ten_items,
    bench_one_week_hundred_items,
    bench_unsolvable_ten_items
);
criterion_main!(benches);
