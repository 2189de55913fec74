//! Per-process critical section for chain appends.
//!
//! Two concurrent appends to the same process race on
//! "read tail → compute next hash → insert" and can fork the chain.
//! The lock table hands out one mutex per process id, created on demand
//! and garbage-collected once no writer holds it. Different processes
//! never contend.
//!
//! For multi-instance deployments this critical section belongs in
//! storage (advisory lock or row lock on a tail marker); an in-process
//! mutex is only visible inside one instance.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use halite_types::ProcessId;

/// On-demand, garbage-collected table of per-process mutexes.
#[derive(Default)]
pub struct ProcessLocks {
    inner: Mutex<HashMap<ProcessId, Arc<Mutex<()>>>>,
}

impl ProcessLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the mutex for `process_id`, creating it on first use.
    ///
    /// Entries whose mutex nobody else holds are collected on every
    /// call, so the table stays bounded by the number of processes with
    /// in-flight appends.
    pub fn handle(&self, process_id: &ProcessId) -> Arc<Mutex<()>> {
        let mut table = self
            .inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        // Collect handles with no outstanding writer (only the table's
        // own reference remains).
        table.retain(|_, handle| Arc::strong_count(handle) > 1);

        Arc::clone(
            table
                .entry(process_id.clone())
                .or_insert_with(|| Arc::new(Mutex::new(()))),
        )
    }

    /// Number of live entries (for tests).
    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
