//! Chained stage runs, run guards and signal queries

use crate::test_utils::{at, scan_date, today, TestPipeline};
use chrono::NaiveDate;
use limitflag::db::ScreenerStore;
use limitflag::models::{SignalStatus, SignalType};

#[tokio::test]
async fn weekly_scan_then_daily_run_emits_one_buy_signal() {
    let t = TestPipeline::new();

    let universe = t.pipeline.run_universe_scan(scan_date()).await.unwrap();
    assert_eq!(universe.passed, 3);

    let daily = t.pipeline.run_daily(today()).await.unwrap();
    assert_eq!(daily.universe_date, Some(scan_date()));

    let pool = daily.pool.unwrap();
    assert_eq!(pool.passed, 2);

    let pattern = daily.pattern.unwrap();
    assert_eq!(pattern.emitted, 1);
    let signal = &pattern.signals[0];
    assert_eq!(signal.code, "AAA");
    assert_eq!(signal.signal_type, SignalType::Buy);
    assert_eq!(signal.stop_loss_price, 45.0);
}

#[tokio::test]
async fn repeated_daily_runs_keep_one_signal_per_code_and_day() {
    let t = TestPipeline::new();
    t.pipeline.run_universe_scan(scan_date()).await.unwrap();

    t.pipeline.run_daily(today()).await.unwrap();
    let second = t.pipeline.run_daily(today()).await.unwrap();

    assert_eq!(second.pattern.unwrap().duplicates, 1);
    assert_eq!(t.store.signal_count().await, 1);
    assert_eq!(t.store.pool_candidates(today()).await.unwrap().len(), 2);
}

#[tokio::test]
async fn daily_run_without_universe_is_empty_success() {
    let t = TestPipeline::new();
    let report = t.pipeline.run_daily(today()).await.unwrap();

    assert_eq!(report.universe_date, None);
    assert!(report.pool.is_none());
    assert!(report.pattern.is_none());
}

#[tokio::test]
async fn daily_run_ignores_universe_scans_after_its_date() {
    let t = TestPipeline::new();
    let later = NaiveDate::from_ymd_opt(2024, 6, 16).unwrap();
    t.pipeline.run_universe_scan(later).await.unwrap();

    let report = t.pipeline.run_daily(today()).await.unwrap();
    assert_eq!(report.universe_date, None);
}

#[tokio::test]
async fn latest_snapshots_resolve_from_store_and_cache() {
    let t = TestPipeline::new();
    assert!(t.pipeline.latest_universe(today()).await.unwrap().is_none());

    t.pipeline.run_universe_scan(scan_date()).await.unwrap();
    t.pipeline.run_daily(today()).await.unwrap();

    let (date, universe) = t.pipeline.latest_universe(today()).await.unwrap().unwrap();
    assert_eq!(date, scan_date());
    assert_eq!(universe.len(), 3);

    let pool = t.pipeline.latest_pool(today()).await.unwrap();
    assert_eq!(pool.len(), 2);
}

#[tokio::test]
async fn universe_guard_runs_once_on_the_configured_weekday() {
    let t = TestPipeline::new();
    let monday = NaiveDate::from_ymd_opt(2024, 6, 10).unwrap();

    assert!(!t.pipeline.should_run_universe_scan(monday).await.unwrap());
    assert!(t.pipeline.should_run_universe_scan(scan_date()).await.unwrap());

    t.pipeline.run_universe_scan(scan_date()).await.unwrap();
    assert!(!t.pipeline.should_run_universe_scan(scan_date()).await.unwrap());
}

#[tokio::test]
async fn daily_guard_waits_for_the_close_on_trading_days() {
    let t = TestPipeline::new();
    let saturday = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();

    assert!(!t.pipeline.should_run_daily(at(today(), 14, 59)).await.unwrap());
    assert!(!t.pipeline.should_run_daily(at(saturday, 16, 0)).await.unwrap());
    assert!(t.pipeline.should_run_daily(at(today(), 15, 5)).await.unwrap());

    t.pipeline.run_universe_scan(scan_date()).await.unwrap();
    t.pipeline.run_daily(today()).await.unwrap();
    assert!(!t.pipeline.should_run_daily(at(today(), 16, 0)).await.unwrap());
}

#[tokio::test]
async fn signal_queries_cover_day_history_and_summary() {
    let t = TestPipeline::new();
    t.pipeline.run_universe_scan(scan_date()).await.unwrap();
    t.pipeline.run_daily(today()).await.unwrap();

    let pending = t
        .pipeline
        .signals_for_day(today(), Some(SignalStatus::Pending))
        .await
        .unwrap();
    assert_eq!(pending.len(), 1);
    let confirmed = t
        .pipeline
        .signals_for_day(today(), Some(SignalStatus::Confirmed))
        .await
        .unwrap();
    assert!(confirmed.is_empty());

    let detail = t.pipeline.signal_detail(pending[0].id).await.unwrap();
    assert_eq!(detail.code, "AAA");

    let history = t.pipeline.signal_history(today(), 30).await.unwrap();
    assert_eq!(history.len(), 1);
    let later = NaiveDate::from_ymd_opt(2024, 9, 1).unwrap();
    assert!(t.pipeline.signal_history(later, 30).await.unwrap().is_empty());

    let summary = t.pipeline.signal_summary("AAA").await.unwrap();
    assert_eq!(summary.stats.len(), 1);
    assert_eq!(summary.stats[0].count, 1);
    assert_eq!(summary.stats[0].status, SignalStatus::Pending);
    assert_eq!(summary.latest.unwrap().id, pending[0].id);

    let empty = t.pipeline.signal_summary("BBB").await.unwrap();
    assert!(empty.stats.is_empty());
    assert!(empty.latest.is_none());
}

#[tokio::test]
async fn scan_history_lists_newest_first() {
    let t = TestPipeline::new();
    let next_week = NaiveDate::from_ymd_opt(2024, 6, 16).unwrap();
    t.pipeline.run_universe_scan(scan_date()).await.unwrap();
    t.pipeline.run_universe_scan(next_week).await.unwrap();

    let history = t.pipeline.scan_history(10).await.unwrap();
    assert_eq!(history, vec![(next_week, 3), (scan_date(), 3)]);

    assert_eq!(t.pipeline.scan_history(1).await.unwrap().len(), 1);
}
