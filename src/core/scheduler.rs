//! Cron-based scheduler triggering the guarded pipeline runs

use crate::error::{Result, ScreenerError};
use crate::pipeline::ScreeningPipeline;
use chrono::{Local, NaiveDateTime};
use cron::Schedule;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduledJob {
    UniverseScan,
    DailyRun,
}

impl fmt::Display for ScheduledJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduledJob::UniverseScan => f.write_str("universe_scan"),
            ScheduledJob::DailyRun => f.write_str("daily_run"),
        }
    }
}

/// Run `job` if its guard allows it at `now`. Returns whether it ran.
pub async fn run_job(
    pipeline: &ScreeningPipeline,
    job: ScheduledJob,
    now: NaiveDateTime,
) -> Result<bool> {
    let today = now.date();
    match job {
        ScheduledJob::UniverseScan => {
            if !pipeline.should_run_universe_scan(today).await? {
                debug!(job = %job, date = %today, "Guard declined run");
                return Ok(false);
            }
            pipeline.run_universe_scan(today).await?;
        }
        ScheduledJob::DailyRun => {
            if !pipeline.should_run_daily(now).await? {
                debug!(job = %job, date = %today, "Guard declined run");
                return Ok(false);
            }
            pipeline.run_daily(today).await?;
        }
    }
    Ok(true)
}

pub fn parse_schedule(expr: &str) -> Result<Schedule> {
    Schedule::from_str(expr)
        .map_err(|e| ScreenerError::Config(format!("Invalid cron expression '{}': {}", expr, e)))
}

/// One tokio loop per cron schedule, each sleeping until its next tick
pub struct JobScheduler {
    pipeline: ScreeningPipeline,
    jobs: Vec<(ScheduledJob, Schedule)>,
    handles: Arc<RwLock<Vec<JoinHandle<()>>>>,
}

impl JobScheduler {
    pub fn new(pipeline: ScreeningPipeline) -> Result<Self> {
        let schedule = &pipeline.context().config.schedule;
        let jobs = vec![
            (ScheduledJob::UniverseScan, parse_schedule(&schedule.weekly_cron)?),
            (ScheduledJob::DailyRun, parse_schedule(&schedule.daily_cron)?),
        ];

        info!(
            weekly_cron = %schedule.weekly_cron,
            daily_cron = %schedule.daily_cron,
            "JobScheduler: created"
        );

        Ok(Self {
            pipeline,
            jobs,
            handles: Arc::new(RwLock::new(Vec::new())),
        })
    }

    pub async fn start(&self) {
        let mut handles = self.handles.write().await;

        for (job, schedule) in &self.jobs {
            let job = *job;
            let schedule = schedule.clone();
            let pipeline = self.pipeline.clone();

            handles.push(tokio::spawn(async move {
                info!(job = %job, "JobScheduler: waiting for cron schedule...");

                loop {
                    let Some(next_tick) = schedule.upcoming(Local).next() else {
                        tokio::time::sleep(tokio::time::Duration::from_secs(60)).await;
                        continue;
                    };
                    let now = Local::now();
                    if next_tick > now {
                        let duration = (next_tick - now).to_std().unwrap_or_default();
                        tokio::time::sleep(duration).await;
                    }

                    info!(job = %job, "JobScheduler: cron tick");
                    match run_job(&pipeline, job, Local::now().naive_local()).await {
                        Ok(true) => info!(job = %job, "JobScheduler: job finished"),
                        Ok(false) => {}
                        Err(e) => error!(job = %job, error = %e, "JobScheduler: job failed"),
                    }
                }
            }));
        }

        info!(jobs = handles.len(), "JobScheduler: started successfully");
    }

    pub async fn stop(&self) {
        let mut handles = self.handles.write().await;
        for handle in handles.drain(..) {
            handle.abort();
        }
        info!("JobScheduler: stopped");
    }

    pub async fn is_running(&self) -> bool {
        !self.handles.read().await.is_empty()
    }
}
