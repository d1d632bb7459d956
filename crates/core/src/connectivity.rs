//! Connectivity oracle and transition events.
//!
//! The engine never monitors the network itself. A host wires its platform
//! callbacks into an implementation of these traits; [`ManualConnectivity`] is
//! the in-process one used by the CLI and by tests.

use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::mpsc;

/// Edge-triggered connectivity transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectivityEvent {
    Available,
    Lost,
}

/// Synchronous "is an internet-capable network active" query.
pub trait ConnectivityOracle: Send + Sync {
    fn is_available(&self) -> bool;
}

/// Handle returned by [`ConnectivityEventSource::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// An active subscription: its id and the stream of events.
///
/// The stream ends once the subscription is removed with
/// [`ConnectivityEventSource::unsubscribe`].
#[derive(Debug)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub events: mpsc::UnboundedReceiver<ConnectivityEvent>,
}

/// Source of connectivity transition events.
pub trait ConnectivityEventSource: Send + Sync {
    fn subscribe(&self) -> Subscription;

    fn unsubscribe(&self, id: SubscriptionId);
}

/// Connectivity state driven explicitly by the host.
///
/// Emits an event to every subscriber only when the state actually changes.
#[derive(Debug)]
pub struct ManualConnectivity {
    available: AtomicBool,
    next_id: AtomicU64,
    subscribers: Mutex<HashMap<SubscriptionId, mpsc::UnboundedSender<ConnectivityEvent>>>,
}

impl ManualConnectivity {
    pub fn new(available: bool) -> Self {
        Self { available: AtomicBool::new(available), next_id: AtomicU64::new(0), subscribers: Mutex::new(HashMap::new()) }
    }

    /// Record the current state, notifying subscribers on an edge.
    ///
    /// Returns the emitted event, or `None` when the state did not change.
    ///
    /// The subscriber lock is held across the state change and the sends, so
    /// concurrent callers deliver events in the same order as their changes.
    pub fn set_available(&self, available: bool) -> Option<ConnectivityEvent> {
        let mut subscribers = self.subscribers.lock();

        let previous = self.available.swap(available, Ordering::SeqCst);
        if previous == available {
            return None;
        }

        let event = if available { ConnectivityEvent::Available } else { ConnectivityEvent::Lost };
        tracing::info!(?event, "connectivity changed");

        subscribers.retain(|_, tx| tx.send(event).is_ok());

        Some(event)
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}

impl Default for ManualConnectivity {
    fn default() -> Self {
        Self::new(true)
    }
}

impl ConnectivityOracle for ManualConnectivity {
    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }
}

impl ConnectivityEventSource for ManualConnectivity {
    fn subscribe(&self) -> Subscription {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().insert(id, tx);
        Subscription { id, events: rx }
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.subscribers.lock().remove(&id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oracle_reflects_state() {
        let connectivity = ManualConnectivity::new(false);
        assert!(!connectivity.is_available());
        connectivity.set_available(true);
        assert!(connectivity.is_available());
    }

    #[test]
    fn test_events_only_on_edges() {
        let connectivity = ManualConnectivity::new(true);
        let mut sub = connectivity.subscribe();

        assert_eq!(connectivity.set_available(true), None);
        assert_eq!(connectivity.set_available(false), Some(ConnectivityEvent::Lost));
        assert_eq!(connectivity.set_available(false), None);
        assert_eq!(connectivity.set_available(true), Some(ConnectivityEvent::Available));

        assert_eq!(sub.events.try_recv().unwrap(), ConnectivityEvent::Lost);
        assert_eq!(sub.events.try_recv().unwrap(), ConnectivityEvent::Available);
        assert!(sub.events.try_recv().is_err());
    }

    #[test]
    fn test_unsubscribe_closes_stream() {
        let connectivity = ManualConnectivity::new(true);
        let mut sub = connectivity.subscribe();
        assert_eq!(connectivity.subscriber_count(), 1);

        connectivity.unsubscribe(sub.id);
        assert_eq!(connectivity.subscriber_count(), 0);

        connectivity.set_available(false);
        assert!(matches!(sub.events.try_recv(), Err(mpsc::error::TryRecvError::Disconnected)));
    }

    #[test]
    fn test_dropped_receivers_are_pruned() {
        let connectivity = ManualConnectivity::new(true);
        let sub = connectivity.subscribe();
        drop(sub);

        connectivity.set_available(false);
        assert_eq!(connectivity.subscriber_count(), 0);
    }

    #[test]
    fn test_concurrent_toggles_keep_events_ordered() {
        let connectivity = ManualConnectivity::new(true);
        let mut sub = connectivity.subscribe();

        std::thread::scope(|scope| {
            for t in 0..4 {
                let connectivity = &connectivity;
                scope.spawn(move || {
                    for i in 0..200 {
                        connectivity.set_available((i + t) % 2 == 0);
                    }
                });
            }
        });

        let mut expected = ConnectivityEvent::Lost;
        let mut last = None;
        while let Ok(event) = sub.events.try_recv() {
            assert_eq!(event, expected, "events must alternate");
            expected = match event {
                ConnectivityEvent::Lost => ConnectivityEvent::Available,
                ConnectivityEvent::Available => ConnectivityEvent::Lost,
            };
            last = Some(event);
        }

        let final_event = if connectivity.is_available() { ConnectivityEvent::Available } else { ConnectivityEvent::Lost };
        match last {
            Some(event) => assert_eq!(event, final_event),
            None => assert!(connectivity.is_available()),
        }
    }

    #[test]
    fn test_subscription_ids_are_distinct() {
        let connectivity = ManualConnectivity::default();
        let a = connectivity.subscribe();
        let b = connectivity.subscribe();
        assert_ne!(a.id, b.id);
    }
}
