//! Single-writer-per-project locking.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Async mutex per project name. Different projects never contend.
#[derive(Debug, Default)]
pub struct ProjectLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl ProjectLocks {
    /// Empty lock table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive write access to `project_name`.
    pub async fn acquire(&self, project_name: &str) -> OwnedMutexGuard<()> {
        let lock = self
            .locks
            .entry(project_name.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        lock.lock_owned().await
    }

    /// Drop the lock entry of a deleted project when nobody holds or awaits
    /// it. Returns whether the entry was removed.
    ///
    /// Every holder and waiter owns a clone of the `Arc`, and cloning happens
    /// under the map's shard lock, so a count of one means the table is the
    /// only owner.
    pub fn forget(&self, project_name: &str) -> bool {
        self.locks
            .remove_if(project_name, |_, lock| Arc::strong_count(lock) == 1)
            .is_some()
    }

    /// Number of projects with a lock entry.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    /// Whether no project has been locked yet.
    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn same_project_is_exclusive() {
        let locks = Arc::new(ProjectLocks::new());
        let guard = locks.acquire("p").await;

        let contender = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.acquire("p").await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        contender.await.unwrap();
    }

    #[tokio::test]
    async fn different_projects_do_not_block() {
        let locks = ProjectLocks::new();
        let _a = locks.acquire("a").await;
        let b = tokio::time::timeout(Duration::from_millis(100), locks.acquire("b")).await;
        assert!(b.is_ok());
        assert_eq!(locks.len(), 2);
    }

    #[tokio::test]
    async fn forget_keeps_a_lock_that_is_held_or_awaited() {
        let locks = Arc::new(ProjectLocks::new());
        let guard = locks.acquire("p").await;

        let (acquired_tx, acquired_rx) = oneshot::channel();
        let (release_tx, release_rx) = oneshot::channel::<()>();
        let waiter = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.acquire("p").await;
                let _ = acquired_tx.send(());
                let _ = release_rx.await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!locks.forget("p"));

        drop(guard);
        acquired_rx.await.unwrap();
        assert!(!locks.forget("p"));
        // still the same mutex, so a third writer must wait
        let third = tokio::time::timeout(Duration::from_millis(50), locks.acquire("p")).await;
        assert!(third.is_err());

        release_tx.send(()).unwrap();
        waiter.await.unwrap();
        assert!(locks.forget("p"));
        assert!(locks.is_empty());
    }
}
