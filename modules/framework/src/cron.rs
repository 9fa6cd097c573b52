use crate::Processor;
use std::time::Duration;
use time::PrimitiveDateTime;
use tracing::{error, info};

/// Runs a maintenance job once. The job receives the wall-clock time it was
/// started at and reports what it repaired.
pub async fn one_go<J>(job: &J, now: PrimitiveDateTime) -> Result<J::Output, J::Error>
where
    J: Processor<PrimitiveDateTime> + Sync,
{
    let report = job.process(now).await?;
    info!(monotonic_counter.cron_execute = 1);
    Ok(report)
}

/// Drives [`one_go`] on a fixed interval until the task is aborted.
///
/// A failed run is logged and the schedule keeps going; missed ticks are
/// skipped rather than bunched up.
pub async fn run_interval<J>(job: J, period: Duration)
where
    J: Processor<PrimitiveDateTime> + Sync,
    J::Output: std::fmt::Debug,
    J::Error: std::fmt::Display,
{
    let mut clock = tokio::time::interval(period);
    clock.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    loop {
        clock.tick().await;
        match one_go(&job, crate::now_time()).await {
            Ok(report) => info!(?report, "scheduled job completed"),
            Err(e) => error!("scheduled job failed: {e}"),
        }
    }
}
