//! Single-threaded cooperative tick loop (spec §4.5).

use crate::job::JobContext;
use crate::lock::ClusterLock;
use crate::metrics;
use crate::registry::JobRegistry;
use chrono::Utc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info, warn};

pub struct TickLoop {
    registry: JobRegistry,
    lock: ClusterLock,
    ctx: JobContext,
    tick_interval: Duration,
}

impl TickLoop {
    pub fn new(registry: JobRegistry, lock: ClusterLock, ctx: JobContext, tick_interval: Duration) -> Self {
        Self {
            registry,
            lock,
            ctx,
            tick_interval,
        }
    }

    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!(jobs = self.registry.len(), "scheduler tick loop starting");
        let mut interval = tokio::time::interval(self.tick_interval);

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("scheduler received shutdown signal");
                        break;
                    }
                }
                _ = interval.tick() => {
                    self.tick().await;
                }
            }
        }

        self.lock.release().await;
    }

    async fn tick(&mut self) {
        let holding = if self.lock.is_held() {
            self.lock.refresh().await
        } else {
            self.lock.try_acquire().await
        };

        if !holding {
            return;
        }

        let now = Utc::now();
        for scheduled in self.registry.iter_mut() {
            if !scheduled.is_due(now) {
                continue;
            }

            let name = scheduled.name();
            let job = scheduled.job.clone();
            let ctx = self.ctx.clone();

            let started = std::time::Instant::now();
            let outcome = tokio::spawn(async move { job.run(&ctx).await }).await;
            let elapsed = started.elapsed().as_secs_f64();
            metrics::observe_duration(name, elapsed);

            match outcome {
                Ok(Ok(())) => {
                    metrics::inc_success(name);
                }
                Ok(Err(e)) => {
                    metrics::inc_failure(name);
                    error!(job = name, error = %e, "scheduled job returned an error");
                }
                Err(join_err) => {
                    metrics::inc_failure(name);
                    if join_err.is_panic() {
                        warn!(job = name, "scheduled job panicked; recovered, continuing tick");
                    } else {
                        error!(job = name, error = %join_err, "scheduled job task failed to complete");
                    }
                }
            }

            scheduled.advance(now);
        }
    }
}
