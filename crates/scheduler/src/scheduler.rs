use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};

use casewatch_common::types::Profile;
use casewatch_engine::Pipeline;

/// Fixed-cadence driver for the tracking pipeline.
///
/// The first cycle starts immediately. Cycles run inline in the loop, so two
/// cycles never overlap. When a cycle overruns, one catch-up cycle starts as
/// soon as it finishes; any further missed ticks are dropped and the cadence
/// realigns to the original interval boundaries.
pub struct Scheduler {
    pipeline: Pipeline,
    profiles: Vec<Profile>,
    interval: Duration,
}

impl Scheduler {
    pub fn new(pipeline: Pipeline, profiles: Vec<Profile>, interval_mins: u64) -> Self {
        Self {
            pipeline,
            profiles,
            interval: Duration::from_secs(interval_mins.saturating_mul(60)),
        }
    }

    /// Run forever. Stop it by dropping the future (e.g. from `select!`).
    pub async fn run(&self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!(
            interval_secs = self.interval.as_secs(),
            profiles = self.profiles.len(),
            "Scheduler started"
        );

        loop {
            ticker.tick().await;

            let started = Instant::now();
            let summary = self.pipeline.run_cycle(&self.profiles).await;
            let elapsed = started.elapsed();

            if elapsed > self.interval {
                tracing::warn!(
                    elapsed_secs = elapsed.as_secs(),
                    interval_secs = self.interval.as_secs(),
                    "Cycle overran the polling interval"
                );
            }
            tracing::debug!(?summary, "Idle until next tick");
        }
    }
}
