//! Per-profile write serialization
//!
//! Writes to one (owner, name) run one at a time inside this process; writes
//! to different profiles and all reads proceed in parallel. Entries are
//! dropped once no writer holds or waits on them.

use dashmap::DashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;

type ProfileKey = (String, String);

/// One writer's interest in a profile entry. Dropping it, whether the write
/// finished or the future was cancelled, removes the entry once the map holds
/// the only clone of its lock.
struct Claim<'a> {
    locks: &'a DashMap<ProfileKey, Arc<Mutex<()>>>,
    key: ProfileKey,
}

impl Drop for Claim<'_> {
    fn drop(&mut self) {
        self.locks
            .remove_if(&self.key, |_, m| Arc::strong_count(m) == 1);
    }
}

#[derive(Default)]
pub struct ProfileLocks {
    locks: DashMap<ProfileKey, Arc<Mutex<()>>>,
}

impl ProfileLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `op` while holding the write lock of (owner, name)
    pub async fn serialize<F, Fut, T>(&self, owner: &str, name: &str, op: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        // Declared before the lock clone so it drops after it
        let claim = Claim {
            locks: &self.locks,
            key: (owner.to_string(), name.to_string()),
        };
        let lock = Arc::clone(self.locks.entry(claim.key.clone()).or_default().value());

        let _guard = lock.lock().await;
        op().await
    }

    /// Number of profiles with a writer in flight
    pub fn active(&self) -> usize {
        self.locks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_profile_writes_do_not_overlap() {
        let locks = Arc::new(ProfileLocks::new());
        let inside = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let (locks, inside, peak) = (locks.clone(), inside.clone(), peak.clone());
            handles.push(tokio::spawn(async move {
                locks
                    .serialize("a", "North Field", || async {
                        let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(2)).await;
                        inside.fetch_sub(1, Ordering::SeqCst);
                    })
                    .await
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        assert_eq!(peak.load(Ordering::SeqCst), 1);
        assert_eq!(locks.active(), 0);
    }

    /// Writers dropped mid-wait or mid-write leave no entries behind
    #[tokio::test]
    async fn test_cancelled_writers_release_entries() {
        let locks = ProfileLocks::new();

        for i in 0..100 {
            let name = format!("Field {}", i % 4);
            let out = tokio::time::timeout(
                Duration::from_millis(1),
                locks.serialize("a", &name, || tokio::time::sleep(Duration::from_secs(60))),
            )
            .await;
            assert!(out.is_err());
        }
        assert_eq!(locks.active(), 0);

        // A writer cancelled while queued behind a live one
        let holder = locks.serialize("a", "North Field", || {
            tokio::time::sleep(Duration::from_millis(20))
        });
        let queued = tokio::time::timeout(
            Duration::from_millis(1),
            locks.serialize("a", "North Field", || async {}),
        );
        let (_, queued) = tokio::join!(holder, queued);
        assert!(queued.is_err());
        assert_eq!(locks.active(), 0);
    }

    #[tokio::test]
    async fn test_different_profiles_run_concurrently() {
        let locks = Arc::new(ProfileLocks::new());
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();

        let waiter = {
            let locks = locks.clone();
            tokio::spawn(async move {
                locks
                    .serialize("a", "North Field", || async move {
                        rx.await.unwrap();
                    })
                    .await
            })
        };

        // Completes while the first profile's lock is still held
        locks
            .serialize("a", "East Field", || async move {
                tx.send(()).unwrap();
            })
            .await;
        waiter.await.unwrap();
    }
}
