//! Protocol state driven by server notifications.
//!
//! One [`ProtocolState`] lives in the I/O task (authoritative) and one in
//! the façade (a mirror fed by the event channel). Both apply the same
//! transitions in the same order, so they never diverge.

use std::collections::HashMap;

use crate::messages::JobNotification;

/// Pool-assigned extranonce parameters plus the worker-side counter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtranonceState {
    /// Pool-assigned coinbase prefix, hex.
    pub extranonce1: String,

    /// Width of the extranonce2 field in bytes.
    pub extranonce2_size: u32,

    /// Worker-side counter; resets to zero whenever the prefix, the width,
    /// or the active job changes.
    pub extranonce2: u32,
}

/// Extranonce parameters captured when a job was announced.
///
/// Submits format against this snapshot rather than the live state, which
/// tolerates a `mining.set_extranonce` landing between the notification
/// and the submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobEntry {
    /// Extranonce1 in force when the job arrived.
    pub extranonce1: String,

    /// Extranonce2 width in force when the job arrived.
    pub extranonce2_size: u32,
}

/// Connection-scoped protocol state: extranonce, difficulty, and the table
/// of jobs the pool will still accept shares for.
#[derive(Debug)]
pub struct ProtocolState {
    extranonce: ExtranonceState,
    difficulty: f64,
    current: Option<JobNotification>,
    jobs: HashMap<String, JobEntry>,
}

impl Default for ProtocolState {
    fn default() -> Self {
        Self::new()
    }
}

impl ProtocolState {
    pub fn new() -> Self {
        Self {
            extranonce: ExtranonceState::default(),
            difficulty: 1.0,
            current: None,
            jobs: HashMap::new(),
        }
    }

    /// Current share difficulty.
    pub fn difficulty(&self) -> f64 {
        self.difficulty
    }

    /// Replace the share difficulty (`mining.set_difficulty`).
    pub fn set_difficulty(&mut self, difficulty: f64) {
        self.difficulty = difficulty;
    }

    /// Current extranonce parameters.
    pub fn extranonce(&self) -> &ExtranonceState {
        &self.extranonce
    }

    /// Replace the extranonce parameters (subscribe result or
    /// `mining.set_extranonce`). The counter resets when either changes.
    pub fn set_extranonce(&mut self, extranonce1: String, extranonce2_size: u32) {
        let changed = self.extranonce.extranonce1 != extranonce1
            || self.extranonce.extranonce2_size != extranonce2_size;
        self.extranonce.extranonce1 = extranonce1;
        self.extranonce.extranonce2_size = extranonce2_size;
        if changed {
            self.extranonce.extranonce2 = 0;
        }
    }

    /// Accept a `mining.notify`.
    ///
    /// Clears the job table first when `clean_jobs` is set, stores the
    /// notification as current, snapshots the live extranonce parameters
    /// into the table, and resets the counter if the active job changed.
    pub fn apply_notify(&mut self, notification: JobNotification) {
        if notification.clean_jobs {
            self.jobs.clear();
        }

        let job_changed = self
            .current
            .as_ref()
            .map_or(true, |current| current.job_id != notification.job_id);
        if job_changed {
            self.extranonce.extranonce2 = 0;
        }

        self.jobs.insert(
            notification.job_id.clone(),
            JobEntry {
                extranonce1: self.extranonce.extranonce1.clone(),
                extranonce2_size: self.extranonce.extranonce2_size,
            },
        );
        self.current = Some(notification);
    }

    /// The most recent notification, if any job has arrived yet.
    pub fn current(&self) -> Option<&JobNotification> {
        self.current.as_ref()
    }

    /// Snapshot for a job id, if the pool still accepts shares for it.
    pub fn job_entry(&self, job_id: &str) -> Option<&JobEntry> {
        self.jobs.get(job_id)
    }

    /// Hand out the next extranonce2 value, advancing the counter.
    pub fn next_extranonce2(&mut self) -> u32 {
        let value = self.extranonce.extranonce2;
        self.extranonce.extranonce2 = self.extranonce.extranonce2.wrapping_add(1);
        value
    }

    #[cfg(test)]
    pub fn jobs_len(&self) -> usize {
        self.jobs.len()
    }
}
