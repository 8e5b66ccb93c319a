//! In-process half of the per-credential sync guard

use crate::types::CredentialId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::OwnedMutexGuard;

/// One async mutex per credential
///
/// [`try_acquire`](Self::try_acquire) never waits: a held lock means a sync
/// for that credential is already running in this process. The returned guard
/// releases the lock when dropped, including during a panic unwind.
#[derive(Clone, Default)]
pub struct SyncLocks {
    locks: Arc<Mutex<HashMap<CredentialId, Arc<tokio::sync::Mutex<()>>>>>,
}

impl SyncLocks {
    /// Create an empty lock map
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the lock for `credential` if nobody holds it
    pub fn try_acquire(&self, credential: CredentialId) -> Option<OwnedMutexGuard<()>> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(locks.entry(credential).or_default())
        };
        lock.try_lock_owned().ok()
    }

    /// True while a guard for `credential` is alive
    pub fn is_held(&self, credential: CredentialId) -> bool {
        let locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks
            .get(&credential)
            .is_some_and(|lock| lock.try_lock().is_err())
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_fails_while_held() {
        let locks = SyncLocks::new();
        let guard = locks.try_acquire(CredentialId(1)).unwrap();

        assert!(locks.try_acquire(CredentialId(1)).is_none());
        assert!(locks.is_held(CredentialId(1)));

        drop(guard);
        assert!(!locks.is_held(CredentialId(1)));
        assert!(locks.try_acquire(CredentialId(1)).is_some());
    }

    #[test]
    fn credentials_are_independent() {
        let locks = SyncLocks::new();
        let _a = locks.try_acquire(CredentialId(1)).unwrap();
        assert!(locks.try_acquire(CredentialId(2)).is_some());
    }

    #[test]
    fn clones_share_state() {
        let locks = SyncLocks::new();
        let other = locks.clone();
        let _guard = locks.try_acquire(CredentialId(3)).unwrap();
        assert!(other.try_acquire(CredentialId(3)).is_none());
    }
}
