use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Per-user lock registry serializing cart mutations
///
/// Every cart mutation holds its user's lock across the whole
/// read-modify-recompute-write sequence, so two concurrent requests for the
/// same user cannot both observe the same cart state and double-apply a
/// change. Different users' carts stay fully independent. The storage
/// layer's unique constraints remain the last-resort conflict detector for
/// writes arriving from outside this process.
#[derive(Clone, Default)]
pub struct UserLocks {
    inner: Arc<Mutex<HashMap<i32, Arc<Mutex<()>>>>>,
}

impl UserLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get (or lazily create) the lock for a user
    ///
    /// Entries no one holds a handle to are evicted on the way in, so the
    /// registry tracks at most the users with an operation in flight rather
    /// than every user id ever seen.
    pub async fn for_user(&self, user_id: i32) -> Arc<Mutex<()>> {
        let mut registry = self.inner.lock().await;
        registry.retain(|_, lock| Arc::strong_count(lock) > 1);
        registry
            .entry(user_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    #[cfg(test)]
    async fn tracked_users(&self) -> usize {
        self.inner.lock().await.len()
    }
}
