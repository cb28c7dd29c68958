//! Pool filter: daily volume golden cross + 120-minute momentum streak

use crate::test_utils::{flat_intraday_bars, scan_date, today, TestPipeline};
use limitflag::cache::{cache_key, snapshot_key};
use limitflag::db::ScreenerStore;
use limitflag::models::{Granularity, ScanCandidate, Stage};
use limitflag::pipeline::PoolFilter;

async fn universe(t: &TestPipeline) -> Vec<ScanCandidate> {
    t.pipeline
        .run_universe_scan(scan_date())
        .await
        .unwrap()
        .candidates
}

#[tokio::test]
async fn pool_filter_requires_cross_and_streak() {
    let t = TestPipeline::new();
    let filter = PoolFilter::new(t.pipeline.context().clone());

    let report = filter.run(today(), universe(&t).await).await.unwrap();

    assert_eq!(report.total, 3);
    let codes: Vec<&str> = report.candidates.iter().map(|c| c.code.as_str()).collect();
    assert_eq!(codes, vec!["AAA", "EEE"], "DDD has flat volume and no cross");

    let aaa = &report.candidates[0];
    assert!(aaa.golden_cross);
    assert_eq!(aaa.as_of_date, today());
    assert_eq!(aaa.momentum_status, "MACD histogram expanding for 8 bars");
    assert!(aaa.short_vol_ma.unwrap() > aaa.long_vol_ma.unwrap());
}

#[tokio::test]
async fn pool_filter_replaces_rows_for_the_date() {
    let t = TestPipeline::new();
    let filter = PoolFilter::new(t.pipeline.context().clone());
    let candidates = universe(&t).await;

    filter.run(today(), candidates.clone()).await.unwrap();
    filter.run(today(), candidates).await.unwrap();

    let stored = t.store.pool_candidates(today()).await.unwrap();
    assert_eq!(stored.len(), 2);
    assert!(t.cache.contains(&snapshot_key(Stage::PoolFilter, today())));
}

#[tokio::test]
async fn volume_cross_result_is_cached_for_the_day() {
    let t = TestPipeline::new();
    let filter = PoolFilter::new(t.pipeline.context().clone());

    let cross = filter.volume_golden_cross("DDD", today()).await.unwrap();
    assert!(!cross.crossed);
    assert!(t.cache.contains(&cache_key(Stage::VolumeCross, "DDD", today())));

    let again = filter.volume_golden_cross("DDD", today()).await.unwrap();
    assert_eq!(cross, again);
}

#[tokio::test]
async fn short_daily_history_rejects_without_error() {
    let t = TestPipeline::new();
    let filter = PoolFilter::new(t.pipeline.context().clone());

    let cross = filter.volume_golden_cross("ZZZ", today()).await.unwrap();
    assert!(!cross.crossed);
    assert_eq!(cross.short_vol_ma, None);
}

#[tokio::test]
async fn too_few_intraday_bars_counts_as_insufficient() {
    let t = TestPipeline::new();
    t.market
        .insert_series("AAA", Granularity::Min120, flat_intraday_bars(12));
    let filter = PoolFilter::new(t.pipeline.context().clone());

    let report = filter.run(today(), universe(&t).await).await.unwrap();

    assert_eq!(report.insufficient, 1);
    assert!(report.candidates.iter().all(|c| c.code != "AAA"));
}

#[tokio::test]
async fn flat_intraday_momentum_is_rejected() {
    let t = TestPipeline::new();
    t.market
        .insert_series("EEE", Granularity::Min120, flat_intraday_bars(22));
    let filter = PoolFilter::new(t.pipeline.context().clone());

    let streak = filter.momentum_streak("EEE", today()).await.unwrap();
    assert_eq!(streak, None);
}
