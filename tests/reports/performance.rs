//! Performance report aggregation.

use std::thread;
use std::time::Duration;

use lookout_debug::{PerformanceReport, ReportAggregator, percentile};
use lookout_foundation::Category;

use crate::{recorder, report};

fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

#[test]
fn nearest_rank_percentiles() {
    let sorted = [ms(10), ms(20), ms(30), ms(40), ms(100)];
    assert_eq!(percentile(&sorted, 50.0), ms(30));
    assert_eq!(percentile(&sorted, 95.0), ms(100));
    assert_eq!(percentile(&sorted, 99.0), ms(100));
}

#[test]
fn report_percentiles_match_durations() {
    let recorder = recorder();
    let reports: Vec<_> = [40, 10, 100, 30, 20]
        .into_iter()
        .enumerate()
        .map(|(i, millis)| report(&recorder, &format!("r{i}"), 200, millis))
        .collect();

    let perf = PerformanceReport::from_reports(&reports);
    assert_eq!(perf.total_requests, 5);
    assert_eq!(perf.p50, ms(30));
    assert_eq!(perf.p95, ms(100));
    assert_eq!(perf.p99, ms(100));
    assert_eq!(perf.min_duration, ms(10));
    assert_eq!(perf.max_duration, ms(100));
    assert_eq!(perf.average_duration, ms(40));
    // Nothing is strictly slower than P95 here.
    assert!(perf.slow_requests.is_empty());
}

#[test]
fn empty_input_gives_zero_report() {
    let perf = ReportAggregator::default().generate_performance_report(Some(&[]));
    assert_eq!(perf.total_requests, 0);
    assert_eq!(perf.p95, Duration::ZERO);
    assert_eq!(perf.error_rate, 0.0);
    assert!(perf.module_breakdown.is_empty());
}

#[test]
fn error_requests_are_newest_first_and_capped() {
    let recorder = recorder();
    let reports: Vec<_> = (0..15)
        .map(|i| report(&recorder, &format!("r{i}"), if i % 3 == 0 { 200 } else { 500 }, 5))
        .collect();

    let perf = PerformanceReport::from_reports(&reports);
    assert_eq!(perf.error_requests.len(), 10);
    assert_eq!(perf.error_requests[0].request_id, "r14");
    assert!((perf.error_rate - 10.0 / 15.0).abs() < 1e-9);
}

#[test]
fn slow_requests_exceed_p95_longest_first() {
    let recorder = recorder();
    let mut reports: Vec<_> = (0..40)
        .map(|i| report(&recorder, &format!("fast{i}"), 200, 10))
        .collect();
    reports.push(report(&recorder, "slow1", 200, 500));
    reports.push(report(&recorder, "slow2", 200, 900));

    let perf = PerformanceReport::from_reports(&reports);
    assert_eq!(perf.p95, ms(10));
    let slow: Vec<_> = perf.slow_requests.iter().map(|r| r.request_id.as_str()).collect();
    assert_eq!(slow, vec!["slow2", "slow1"]);
}

#[test]
fn breakdown_percentages_sum_to_one_hundred() {
    let recorder = recorder();
    let aggregator = ReportAggregator::default();
    for id in ["a", "b"] {
        recorder.start_request(id, "GET", "/").unwrap();
        for category in [Category::Controller, Category::Database, Category::View] {
            let outer = recorder.start_timing("op", category, Some(id)).unwrap();
            thread::sleep(Duration::from_millis(1));
            recorder.end_timing(&outer).unwrap();
        }
        let ctx = recorder.end_request(id, 200, None).unwrap();
        aggregator.generate_request_report(&ctx, 200, None);
    }

    let perf = aggregator.generate_performance_report(None);
    assert_eq!(perf.module_breakdown.len(), 3);
    let sum: f64 = perf.module_breakdown.iter().map(|m| m.percentage).sum();
    assert!((sum - 100.0).abs() < 1e-6, "sum was {sum}");
    assert_eq!(perf.module(Category::Database).unwrap().calls, 2);
}

#[test]
fn breakdown_is_empty_without_span_time() {
    let recorder = recorder();
    let reports = vec![report(&recorder, "r1", 200, 10)];
    assert!(PerformanceReport::from_reports(&reports).module_breakdown.is_empty());
}
