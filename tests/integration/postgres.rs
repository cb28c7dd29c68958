//! PostgresStore against a live database. Skipped unless TEST_DATABASE_URL is set.

use crate::test_utils::today;
use chrono::{Days, Utc};
use limitflag::db::{PostgresStore, ScreenerStore};
use limitflag::error::ScreenerError;
use limitflag::models::{Granularity, NewTradeSignal, SeriesRange, SignalType};
use limitflag::services::SeriesProvider;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;

async fn connect() -> Option<Arc<PostgresStore>> {
    let url = std::env::var("TEST_DATABASE_URL").ok()?;
    Some(Arc::new(PostgresStore::connect(&url).await.unwrap()))
}

fn unique_code(prefix: &str) -> String {
    format!("{}{}", prefix, Utc::now().timestamp_nanos_opt().unwrap_or_default())
}

fn signal(code: &str, price: f64) -> NewTradeSignal {
    NewTradeSignal {
        code: code.to_string(),
        name: code.to_string(),
        signal_type: SignalType::Buy,
        signal_date: today(),
        signal_price: price,
        limit_event_date: today().checked_sub_days(Days::new(5)).unwrap(),
        pullback_days: 5,
        volume_ratio: 2.0,
        price_change_pct: 6.0,
        upper_shadow_pct: 1.0,
        stop_loss_price: 45.0,
        stop_loss_reason: "limit-up pivot".to_string(),
        rationale: "breakout".to_string(),
    }
}

#[tokio::test]
async fn concurrent_reads_complete_together() {
    let Some(store) = connect().await else {
        return;
    };

    let mut reads = JoinSet::new();
    for i in 0..16 {
        let store = store.clone();
        reads.spawn(async move {
            store
                .fetch_series(
                    &format!("NOPE{}", i),
                    Granularity::Daily,
                    SeriesRange::last_days(today(), 30),
                )
                .await
        });
    }

    let all = tokio::time::timeout(Duration::from_secs(10), async {
        let mut done = 0;
        while let Some(result) = reads.join_next().await {
            assert!(result.unwrap().unwrap().is_empty());
            done += 1;
        }
        done
    })
    .await
    .unwrap();
    assert_eq!(all, 16);
}

#[tokio::test]
async fn rejected_batch_leaves_no_signals() {
    let Some(store) = connect().await else {
        return;
    };
    let first = unique_code("A");
    let second = unique_code("B");

    let result = store
        .insert_signals(&[signal(&first, 49.82), signal(&second, f64::NAN)])
        .await;
    assert!(matches!(result, Err(ScreenerError::Persistence(_))));
    assert!(!store
        .signal_exists(&first, today(), SignalType::Buy)
        .await
        .unwrap());

    let inserted = store
        .insert_signals(&[signal(&first, 49.82), signal(&first, 49.82)])
        .await
        .unwrap();
    assert_eq!(inserted.len(), 1);
}
