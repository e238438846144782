use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::types::AccountId;

/// one mutex per account; a caller holding an account's lock is its only writer
#[derive(Debug, Default)]
pub struct AccountLocks {
    locks: Mutex<HashMap<AccountId, Arc<Mutex<()>>>>,
}

impl AccountLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn mutex_for(&self, account_id: AccountId) -> Arc<Mutex<()>> {
        self.locks
            .lock()
            .entry(account_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// run `f` holding the locks of every account in `ids`, taken in sorted
    /// id order so two multi-account callers never deadlock
    pub fn with_accounts<R>(&self, ids: &[AccountId], f: impl FnOnce() -> R) -> R {
        let mut ids = ids.to_vec();
        ids.sort();
        ids.dedup();

        let mutexes: Vec<Arc<Mutex<()>>> = ids.iter().map(|id| self.mutex_for(*id)).collect();
        let _guards: Vec<_> = mutexes.iter().map(|m| m.lock()).collect();
        f()
    }

    pub fn with_account<R>(&self, id: AccountId, f: impl FnOnce() -> R) -> R {
        self.with_accounts(&[id], f)
    }
}
