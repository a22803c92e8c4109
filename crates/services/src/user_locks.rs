use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use quiz_core::model::UserId;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// One async mutex per user, created on first use.
///
/// Holding the guard serializes every read-modify-write of that user's
/// progress inside this process. Different users never wait on each other.
/// Entries nobody holds or waits on are dropped on the next `lock` call, so
/// the table stays bounded by the users currently in flight.
#[derive(Debug, Default, Clone)]
pub struct UserLocks {
    inner: Arc<Mutex<HashMap<UserId, Arc<AsyncMutex<()>>>>>,
}

impl UserLocks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `user_id`'s record.
    pub async fn lock(&self, user_id: UserId) -> OwnedMutexGuard<()> {
        let slot = {
            let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            // the map's own Arc is the only reference once guards and waiters are gone
            map.retain(|id, slot| *id == user_id || Arc::strong_count(slot) > 1);
            Arc::clone(map.entry(user_id).or_default())
        };
        slot.lock_owned().await
    }

    /// Number of users with a live entry.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_user_waits_other_user_does_not() {
        let locks = UserLocks::new();
        let alice = UserId::generate();
        let bob = UserId::generate();

        let held = locks.lock(alice).await;

        let blocked = tokio::time::timeout(Duration::from_millis(50), locks.lock(alice)).await;
        assert!(blocked.is_err());

        let other = tokio::time::timeout(Duration::from_millis(50), locks.lock(bob)).await;
        assert!(other.is_ok());

        drop(held);
        let again = tokio::time::timeout(Duration::from_millis(50), locks.lock(alice)).await;
        assert!(again.is_ok());
        assert_eq!(locks.len(), 2);
    }

    #[tokio::test]
    async fn idle_entries_are_pruned() {
        let locks = UserLocks::new();
        for _ in 0..10 {
            let guard = locks.lock(UserId::generate()).await;
            drop(guard);
        }

        let held = locks.lock(UserId::generate()).await;
        assert_eq!(locks.len(), 1);

        let waiting_user = UserId::generate();
        let first = locks.lock(waiting_user).await;
        let pending = {
            let locks = locks.clone();
            tokio::spawn(async move { drop(locks.lock(waiting_user).await) })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        // a third user's lock must not prune entries that are held or awaited
        drop(locks.lock(UserId::generate()).await);
        assert_eq!(locks.len(), 3);

        drop(first);
        pending.await.unwrap();
        drop(held);
        drop(locks.lock(UserId::generate()).await);
        assert_eq!(locks.len(), 1);
    }
}
