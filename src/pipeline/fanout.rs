//! Bounded per-instrument fan-out with a merge step

use crate::error::{Result, ScreenerError};
use crate::models::{Instrument, PoolCandidate, ScanCandidate, Stage};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, warn};

/// Anything the fan-out can evaluate on its own
pub trait Instrumented {
    fn code(&self) -> &str;
}

impl Instrumented for Instrument {
    fn code(&self) -> &str {
        &self.code
    }
}

impl Instrumented for ScanCandidate {
    fn code(&self) -> &str {
        &self.code
    }
}

impl Instrumented for PoolCandidate {
    fn code(&self) -> &str {
        &self.code
    }
}

#[derive(Debug)]
pub struct FanOutOutcome<T> {
    pub passed: Vec<T>,
    pub evaluated: usize,
    /// Filtered for missing or short series
    pub insufficient: usize,
    /// Fetch/compute failures converted to rejections
    pub failed: usize,
}

/// Run `eval` over every item with at most `concurrency` in flight.
///
/// Each task owns its working data; results are merged only after the whole
/// batch completes. A task error or panic rejects that instrument alone.
pub async fn fan_out<I, T, F, Fut>(
    stage: Stage,
    items: Vec<I>,
    concurrency: usize,
    eval: F,
) -> FanOutOutcome<T>
where
    I: Instrumented + Send + 'static,
    T: Send + 'static,
    F: Fn(I) -> Fut,
    Fut: Future<Output = Result<Option<T>>> + Send + 'static,
{
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut join_set: JoinSet<(String, Result<Option<T>>)> = JoinSet::new();
    let evaluated = items.len();

    for item in items {
        let code = item.code().to_string();
        let semaphore = Arc::clone(&semaphore);
        let task = eval(item);

        join_set.spawn(async move {
            let _permit = match semaphore.acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => {
                    let err = ScreenerError::transient(code.clone(), e.to_string());
                    return (code, Err(err));
                }
            };
            (code, task.await)
        });
    }

    let mut outcome = FanOutOutcome {
        passed: Vec::new(),
        evaluated,
        insufficient: 0,
        failed: 0,
    };

    while let Some(joined) = join_set.join_next().await {
        match joined {
            Ok((_, Ok(Some(value)))) => outcome.passed.push(value),
            Ok((_, Ok(None))) => {}
            Ok((code, Err(ScreenerError::DataUnavailable { reason, .. }))) => {
                debug!(stage = %stage, code = %code, reason = %reason, "Insufficient data, skipping");
                outcome.insufficient += 1;
            }
            Ok((code, Err(e))) => {
                warn!(stage = %stage, code = %code, error = %e, "Instrument evaluation failed, treating as rejected");
                outcome.failed += 1;
            }
            Err(e) => {
                error!(stage = %stage, error = %e, "Evaluation task aborted");
                outcome.failed += 1;
            }
        }
    }

    outcome
}
