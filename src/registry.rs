//! In-memory job registry.
//!
//! The registry is the single shared record of every known job, keyed by
//! [`JobId`]. Reads return clones so callers never hold the lock, and writes
//! go through [`JobRegistry::update`] so the registry can enforce the state
//! machine: terminal records (`completed`/`error`) are immutable, and the
//! terminal timestamp that drives TTL eviction is stamped on the transition.

use crate::error::{Error, Result};
use crate::types::{Job, JobId};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use std::time::{Duration, Instant};

/// Shared in-memory map of job records
#[derive(Debug, Default)]
pub struct JobRegistry {
    jobs: RwLock<HashMap<JobId, Job>>,
}

impl JobRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fresh `starting` record for `id`
    pub fn create(&self, id: JobId) -> Result<()> {
        let mut jobs = self
            .jobs
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if jobs.contains_key(&id) {
            return Err(Error::DuplicateJob(id.to_string()));
        }
        jobs.insert(id, Job::new());
        Ok(())
    }

    /// Snapshot of a job record, if it exists
    pub fn get(&self, id: &JobId) -> Option<Job> {
        self.jobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    /// Mutate a job record in place.
    ///
    /// Updates against a record that already reached `completed` or `error`
    /// are silently dropped (with a log line) so late progress events cannot
    /// resurrect a finished job. When the mutation itself moves the record
    /// into a terminal state, the terminal timestamp is stamped here.
    pub fn update<F>(&self, id: &JobId, mutate: F) -> Result<()>
    where
        F: FnOnce(&mut Job),
    {
        let mut jobs = self
            .jobs
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let job = jobs
            .get_mut(id)
            .ok_or_else(|| Error::JobNotFound(id.to_string()))?;

        if job.is_terminal() {
            tracing::warn!(job_id = %id, status = %job.status, "Ignoring update to terminal job");
            return Ok(());
        }

        mutate(job);

        if job.is_terminal() && job.terminal_at.is_none() {
            job.terminal_at = Some(Instant::now());
        }

        Ok(())
    }

    /// Remove terminal records whose terminal transition is older than `ttl`.
    /// Returns the number of evicted records. Live jobs are never touched.
    pub fn evict_terminal(&self, ttl: Duration) -> usize {
        let mut jobs = self
            .jobs
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = jobs.len();
        jobs.retain(|_, job| match job.terminal_at {
            Some(at) => at.elapsed() < ttl,
            None => true,
        });
        let evicted = before - jobs.len();
        if evicted > 0 {
            tracing::debug!(evicted, remaining = jobs.len(), "Evicted expired job records");
        }
        evicted
    }

    /// Number of tracked records (live and terminal)
    pub fn len(&self) -> usize {
        self.jobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// True when no records are tracked
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
