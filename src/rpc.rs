//! Outbound request tracking and response correlation.
//!
//! Every tracked request gets a freshly minted id and a pending-table entry
//! with a deadline. An entry leaves the table exactly once: matched by a
//! response, expired by the deadline sweep, or drained at teardown.

use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;

use crate::messages::StratumMethod;

/// A request awaiting its response.
#[derive(Debug, Clone)]
pub struct PendingCall {
    /// Method the request carried.
    pub method: StratumMethod,

    /// When the call times out.
    pub deadline: Instant,

    /// Façade-side marker echoed back with the outcome.
    pub token: u64,
}

/// Mints message ids and correlates responses to pending calls.
///
/// Ids are strictly increasing within a connection; the table never holds
/// two calls with the same id.
#[derive(Debug)]
pub struct RpcTracker {
    next_id: u64,
    pending: HashMap<u64, PendingCall>,
}

impl RpcTracker {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            pending: HashMap::new(),
        }
    }

    /// Mint an id without tracking a response (`mining.suggest_difficulty`).
    pub fn mint_untracked(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Mint an id and register the call in the pending table.
    pub fn begin(
        &mut self,
        method: StratumMethod,
        token: u64,
        timeout: Duration,
    ) -> u64 {
        let id = self.mint_untracked();
        let previous = self.pending.insert(
            id,
            PendingCall {
                method,
                deadline: Instant::now() + timeout,
                token,
            },
        );
        debug_assert!(previous.is_none(), "duplicate pending id {}", id);
        id
    }

    /// Remove and return the call matching a response id, if any.
    pub fn complete(&mut self, id: u64) -> Option<PendingCall> {
        self.pending.remove(&id)
    }

    /// Remove and return every call whose deadline has passed.
    pub fn sweep(&mut self, now: Instant) -> Vec<(u64, PendingCall)> {
        let expired: Vec<u64> = self
            .pending
            .iter()
            .filter(|(_, call)| call.deadline <= now)
            .map(|(&id, _)| id)
            .collect();

        expired
            .into_iter()
            .filter_map(|id| self.pending.remove(&id).map(|call| (id, call)))
            .collect()
    }

    /// Remove and return every pending call (connection teardown).
    pub fn drain(&mut self) -> Vec<(u64, PendingCall)> {
        self.pending.drain().collect()
    }

    #[cfg(test)]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}
