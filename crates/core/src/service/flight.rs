//! Per-key single-flight coalescing.
//!
//! The first caller for a key spawns the work onto the runtime and installs a
//! shared handle to it; later callers clone the handle and await the same
//! output. The work runs to completion even if every waiter is dropped, and it
//! removes its own slot when it finishes (or panics), so a finished flight is
//! never joined.

use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Shared handle to a spawned flight. `None` if the task panicked or was aborted.
pub(crate) type Flight<T> = Shared<BoxFuture<'static, Option<T>>>;

type Slots<T> = Arc<Mutex<HashMap<String, Slot<T>>>>;

struct Slot<T: Clone> {
    id: u64,
    flight: Flight<T>,
}

/// Removes the slot it was created for, unless a newer flight replaced it.
struct SlotGuard<T: Clone> {
    slots: Slots<T>,
    key: String,
    id: u64,
}

impl<T: Clone> Drop for SlotGuard<T> {
    fn drop(&mut self) {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        if slots.get(&self.key).is_some_and(|slot| slot.id == self.id) {
            slots.remove(&self.key);
        }
    }
}

/// Map of in-flight computations keyed by string.
pub(crate) struct FlightMap<T: Clone> {
    slots: Slots<T>,
    next_id: AtomicU64,
}

impl<T: Clone> std::fmt::Debug for FlightMap<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlightMap").field("in_flight", &self.in_flight()).finish()
    }
}

impl<T> FlightMap<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub(crate) fn new() -> Self {
        Self { slots: Arc::new(Mutex::new(HashMap::new())), next_id: AtomicU64::new(0) }
    }

    /// The running flight for `key`, if any.
    pub(crate) fn join(&self, key: &str) -> Option<Flight<T>> {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.get(key).map(|slot| slot.flight.clone())
    }

    /// Join the flight for `key`, spawning `start()` if none is running.
    ///
    /// Returns the shared handle and whether this call started it. Must be
    /// called from within a tokio runtime.
    pub(crate) fn join_or_start<F, Fut>(&self, key: &str, start: F) -> (Flight<T>, bool)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(slot) = slots.get(key) {
            return (slot.flight.clone(), false);
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let guard = SlotGuard { slots: Arc::clone(&self.slots), key: key.to_string(), id };
        let work = start();
        let handle = tokio::spawn(async move {
            let _guard = guard;
            work.await
        });
        let flight = handle.map(Result::ok).boxed().shared();

        // The spawned task cannot remove the slot before this insert: it needs
        // the lock held here.
        slots.insert(key.to_string(), Slot { id, flight: flight.clone() });
        (flight, true)
    }
}

impl<T: Clone> FlightMap<T> {
    pub(crate) fn in_flight(&self) -> usize {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    #[tokio::test]
    async fn test_concurrent_joins_share_one_run() {
        let map: FlightMap<u32> = FlightMap::new();
        let runs = Arc::new(AtomicUsize::new(0));

        let start = |runs: Arc<AtomicUsize>| {
            move || async move {
                runs.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                7
            }
        };

        let (a, started_a) = map.join_or_start("k", start(runs.clone()));
        let (b, started_b) = map.join_or_start("k", start(runs.clone()));
        assert!(started_a);
        assert!(!started_b);
        assert_eq!(map.in_flight(), 1);
        assert!(map.join("k").is_some());

        let (ra, rb) = tokio::join!(a, b);
        assert_eq!((ra, rb), (Some(7), Some(7)));
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(map.in_flight(), 0);
        assert!(map.join("k").is_none());
    }

    #[tokio::test]
    async fn test_completed_flight_is_not_rejoined() {
        let map: FlightMap<u32> = FlightMap::new();

        let (first, _) = map.join_or_start("k", || async { 1 });
        assert_eq!(first.await, Some(1));

        let (second, started) = map.join_or_start("k", || async { 2 });
        assert!(started);
        assert_eq!(second.await, Some(2));
    }

    #[tokio::test]
    async fn test_distinct_keys_are_independent() {
        let map: FlightMap<&'static str> = FlightMap::new();
        let (a, started_a) = map.join_or_start("a", || async { "a" });
        let (b, started_b) = map.join_or_start("b", || async { "b" });
        assert!(started_a && started_b);
        assert_eq!(tokio::join!(a, b), (Some("a"), Some("b")));
    }

    #[tokio::test]
    async fn test_flight_finishes_without_waiters() {
        let map: FlightMap<u32> = FlightMap::new();
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = runs.clone();

        let (flight, _) = map.join_or_start("k", move || async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            counter.fetch_add(1, Ordering::SeqCst);
            3
        });
        drop(flight);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(map.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_panicked_flight_yields_none_and_frees_slot() {
        let map: FlightMap<u32> = FlightMap::new();
        let (flight, _) = map.join_or_start("k", || async { Option::<u32>::None.expect("boom") });

        assert_eq!(flight.await, None);
        assert_eq!(map.in_flight(), 0);
    }
}
