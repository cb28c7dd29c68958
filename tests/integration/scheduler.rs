//! Cron scheduling and guarded job execution

use crate::test_utils::{at, scan_date, today, TestPipeline};
use limitflag::core::scheduler::{parse_schedule, run_job, JobScheduler, ScheduledJob};
use limitflag::db::ScreenerStore;
use limitflag::error::ScreenerError;

#[test]
fn default_cron_expressions_parse() {
    assert!(parse_schedule("0 0 20 * * Sun").is_ok());
    assert!(parse_schedule("0 5 15 * * Mon-Fri").is_ok());
}

#[test]
fn invalid_cron_expression_is_a_config_error() {
    let err = parse_schedule("every sunday").unwrap_err();
    assert!(matches!(err, ScreenerError::Config(_)));
}

#[tokio::test]
async fn universe_job_runs_once_per_scan_day() {
    let t = TestPipeline::new();
    let evening = at(scan_date(), 20, 0);

    assert!(run_job(&t.pipeline, ScheduledJob::UniverseScan, evening).await.unwrap());
    assert!(!run_job(&t.pipeline, ScheduledJob::UniverseScan, evening).await.unwrap());
    assert_eq!(t.store.scan_candidates(scan_date()).await.unwrap().len(), 3);
}

#[tokio::test]
async fn daily_job_respects_the_close_guard() {
    let t = TestPipeline::new();
    run_job(&t.pipeline, ScheduledJob::UniverseScan, at(scan_date(), 20, 0))
        .await
        .unwrap();

    assert!(!run_job(&t.pipeline, ScheduledJob::DailyRun, at(today(), 10, 0)).await.unwrap());
    assert!(run_job(&t.pipeline, ScheduledJob::DailyRun, at(today(), 15, 5)).await.unwrap());
    assert_eq!(t.store.signal_count().await, 1);
}

#[tokio::test]
async fn scheduler_starts_and_stops() {
    let t = TestPipeline::new();
    let scheduler = JobScheduler::new(t.pipeline.clone()).unwrap();

    assert!(!scheduler.is_running().await);
    scheduler.start().await;
    assert!(scheduler.is_running().await);
    scheduler.stop().await;
    assert!(!scheduler.is_running().await);
}
