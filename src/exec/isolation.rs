// src/exec/isolation.rs

//! Process-wide mutual exclusion for isolated invocations.

use std::sync::{Arc, OnceLock};

use tokio::sync::{Mutex, OwnedMutexGuard};

/// A single mutex shared by every isolated invocation that uses the same
/// handle. [`Isolation::global`] is the one the whole process shares.
#[derive(Debug, Clone, Default)]
pub struct Isolation {
    lock: Arc<Mutex<()>>,
}

impl Isolation {
    /// A fresh lock, independent of the global one.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn global() -> Self {
        static GLOBAL: OnceLock<Isolation> = OnceLock::new();
        GLOBAL.get_or_init(Isolation::new).clone()
    }

    /// Wait until no other isolated invocation holds the lock.
    pub async fn acquire(&self) -> OwnedMutexGuard<()> {
        self.lock.clone().lock_owned().await
    }
}
