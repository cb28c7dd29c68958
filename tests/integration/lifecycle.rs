//! Manual signal status transitions

use crate::test_utils::{scan_date, today, TestPipeline};
use limitflag::error::ScreenerError;
use limitflag::models::{SignalStatus, TradeSignal};

async fn emitted_signal(t: &TestPipeline) -> TradeSignal {
    t.pipeline.run_universe_scan(scan_date()).await.unwrap();
    let report = t.pipeline.run_daily(today()).await.unwrap();
    report.pattern.unwrap().signals.remove(0)
}

#[tokio::test]
async fn confirm_appends_note_to_rationale() {
    let t = TestPipeline::new();
    let signal = emitted_signal(&t).await;

    let confirmed = t
        .pipeline
        .lifecycle()
        .confirm(signal.id, Some("filled at open"))
        .await
        .unwrap();

    assert_eq!(confirmed.status, SignalStatus::Confirmed);
    assert_eq!(
        confirmed.rationale,
        format!("{}\nUpdate: filled at open", signal.rationale)
    );
}

#[tokio::test]
async fn confirm_without_note_keeps_rationale() {
    let t = TestPipeline::new();
    let signal = emitted_signal(&t).await;

    let confirmed = t.pipeline.lifecycle().confirm(signal.id, None).await.unwrap();

    assert_eq!(confirmed.status, SignalStatus::Confirmed);
    assert_eq!(confirmed.rationale, signal.rationale);
}

#[tokio::test]
async fn notes_accumulate_across_transitions() {
    let t = TestPipeline::new();
    let signal = emitted_signal(&t).await;
    let lifecycle = t.pipeline.lifecycle();

    lifecycle.confirm(signal.id, Some("entered")).await.unwrap();
    let invalid = lifecycle
        .invalidate(signal.id, "gap down below stop")
        .await
        .unwrap();

    assert_eq!(invalid.status, SignalStatus::Invalid);
    assert!(invalid.rationale.starts_with(&signal.rationale));
    assert!(invalid
        .rationale
        .ends_with("\nUpdate: entered\nUpdate: gap down below stop"));

    let stored = t.pipeline.signal_detail(signal.id).await.unwrap();
    assert_eq!(stored, invalid);
}

#[tokio::test]
async fn unknown_signal_id_is_not_found() {
    let t = TestPipeline::new();

    let err = t
        .pipeline
        .lifecycle()
        .transition(999, SignalStatus::Confirmed, None)
        .await
        .unwrap_err();
    assert!(matches!(err, ScreenerError::NotFound { id: 999 }));

    let err = t.pipeline.signal_detail(999).await.unwrap_err();
    assert!(matches!(err, ScreenerError::NotFound { id: 999 }));
}
