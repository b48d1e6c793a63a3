//! Per-room serialization.
//!
//! Every mutation of a session's live state (occupancy, interval log, poll
//! responses, rollups) runs while holding the lock for its `room_id`.
//! Different rooms never contend. A room's entry lives only while someone
//! holds or waits for it, so finished sessions leave nothing behind.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

type RoomMap = DashMap<String, Arc<Mutex<()>>>;

/// Registry of per-room async locks.
#[derive(Clone, Default)]
pub struct RoomLocks {
    rooms: Arc<RoomMap>,
}

/// Exclusive access to one room. Releasing it drops the room's entry when
/// nobody else is queued.
pub struct RoomGuard {
    guard: Option<OwnedMutexGuard<()>>,
    rooms: Arc<RoomMap>,
    room_id: String,
}

impl Drop for RoomGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        evict_idle(&self.rooms, &self.room_id);
    }
}

// The map holds one handle; any extra one belongs to a holder or a waiter.
fn evict_idle(rooms: &RoomMap, room_id: &str) {
    rooms.remove_if(room_id, |_, lock| Arc::strong_count(lock) == 1);
}

impl RoomLocks {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `room_id`.
    pub async fn acquire(&self, room_id: &str) -> RoomGuard {
        // Clone the handle out so the map shard is not held across the await.
        let lock = Arc::clone(
            self.rooms
                .entry(room_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .value(),
        );
        let guard = lock.lock_owned().await;
        RoomGuard {
            guard: Some(guard),
            rooms: Arc::clone(&self.rooms),
            room_id: room_id.to_string(),
        }
    }

    /// Number of rooms with a lock allocated.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    /// Whether no room has a lock allocated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_room_is_serialized() {
        let locks = RoomLocks::new();
        let inside = Arc::new(AtomicUsize::new(0));
        let max_inside = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let locks = locks.clone();
            let inside = Arc::clone(&inside);
            let max_inside = Arc::clone(&max_inside);
            handles.push(tokio::spawn(async move {
                let _guard = locks.acquire("room_a").await;
                let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                max_inside.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(2)).await;
                inside.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.ok();
        }

        assert_eq!(max_inside.load(Ordering::SeqCst), 1);
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_different_rooms_do_not_contend() {
        let locks = RoomLocks::new();
        let _a = locks.acquire("room_a").await;
        let b = tokio::time::timeout(Duration::from_millis(100), locks.acquire("room_b")).await;
        assert!(b.is_ok());
        assert_eq!(locks.len(), 2);
    }

    #[tokio::test]
    async fn test_release_drops_idle_room() {
        let locks = RoomLocks::new();
        let guard = locks.acquire("room_a").await;
        assert_eq!(locks.len(), 1);

        drop(guard);
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_release_keeps_room_with_waiter() {
        let locks = RoomLocks::new();
        let first = locks.acquire("room_a").await;

        let waiter = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.acquire("room_a").await;
            })
        };
        // Let the waiter queue on the existing mutex.
        tokio::time::sleep(Duration::from_millis(20)).await;

        drop(first);
        assert_eq!(locks.len(), 1);

        waiter.await.ok();
        assert!(locks.is_empty());
    }
}
