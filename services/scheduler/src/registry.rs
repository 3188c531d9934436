//! Insertion-ordered `ScheduledJob` registry (spec §4.5).
//!
//! Cadence is validated once, at startup, against every registered job —
//! grounded in `db-pool`'s "verify before serving" posture and in
//! `ScheduledJob::new`'s own-crate cron validation elsewhere in the
//! retrieval pack. An invalid expression here is a fatal boot error, not a
//! per-tick failure.

use crate::job::Job;
use chrono::{DateTime, Utc};
use cron::Schedule;
use std::str::FromStr;
use std::sync::Arc;

pub struct ScheduledJob {
    pub job: Arc<dyn Job>,
    pub cron_expression: String,
    schedule: Schedule,
    next_run: Option<DateTime<Utc>>,
}

impl ScheduledJob {
    pub fn new(job: Arc<dyn Job>, cron_expression: &str) -> Result<Self, String> {
        let schedule = Schedule::from_str(cron_expression)
            .map_err(|e| format!("invalid cron expression for job '{}': {e}", job.name()))?;
        let next_run = schedule.upcoming(Utc).next();
        Ok(Self {
            job,
            cron_expression: cron_expression.to_string(),
            schedule,
            next_run,
        })
    }

    pub fn name(&self) -> &'static str {
        self.job.name()
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        matches!(self.next_run, Some(t) if now >= t)
    }

    pub fn advance(&mut self, now: DateTime<Utc>) {
        self.next_run = self.schedule.after(&now).next();
    }
}

/// Insertion-ordered set of jobs; names must be unique.
pub struct JobRegistry {
    jobs: Vec<ScheduledJob>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self { jobs: Vec::new() }
    }

    pub fn register(&mut self, job: Arc<dyn Job>, cron_expression: &str) -> Result<(), String> {
        if self.jobs.iter().any(|j| j.name() == job.name()) {
            return Err(format!("duplicate scheduled job name: {}", job.name()));
        }
        self.jobs.push(ScheduledJob::new(job, cron_expression)?);
        Ok(())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut ScheduledJob> {
        self.jobs.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

impl Default for JobRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::JobContext;
    use async_trait::async_trait;

    struct NoopJob(&'static str);

    #[async_trait]
    impl Job for NoopJob {
        fn name(&self) -> &'static str {
            self.0
        }
        async fn run(&self, _ctx: &JobContext) -> Result<(), crate::job::JobError> {
            Ok(())
        }
    }

    #[test]
    fn rejects_invalid_cadence() {
        let err = ScheduledJob::new(Arc::new(NoopJob("x")), "not a cron expression");
        assert!(err.is_err());
    }

    #[test]
    fn rejects_duplicate_names() {
        let mut registry = JobRegistry::new();
        registry.register(Arc::new(NoopJob("dup")), "0 0 * * * *").unwrap();
        let result = registry.register(Arc::new(NoopJob("dup")), "0 0 * * * *");
        assert!(result.is_err());
    }

    #[test]
    fn due_after_advance_waits_for_next_tick() {
        let mut scheduled = ScheduledJob::new(Arc::new(NoopJob("x")), "* * * * * *").unwrap();
        let now = Utc::now();
        scheduled.advance(now);
        assert!(!scheduled.is_due(now));
    }
}
