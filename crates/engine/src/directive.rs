//! Advisory directives for the host's transport-level cache.
//!
//! These never touch the content store. They tell the hosting client how to
//! configure its own HTTP cache as connectivity comes and goes.

use offcache_core::{ConnectivityEvent, ConnectivityEventSource, Subscription, SubscriptionId};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Host transport cache mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportCacheMode {
    /// Always load from the network.
    NoCache,
    /// Prefer the host cache, go to the network on a miss.
    CacheElseNetwork,
}

impl TransportCacheMode {
    pub fn for_connectivity(available: bool) -> Self {
        if available { TransportCacheMode::NoCache } else { TransportCacheMode::CacheElseNetwork }
    }
}

/// Action the host should take on its side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "action", content = "mode", rename_all = "snake_case")]
pub enum HostDirective {
    ClearTransportCache,
    SetTransportCacheMode(TransportCacheMode),
    Reload,
}

/// Directives produced for one connectivity transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Advisory {
    pub event: ConnectivityEvent,
    pub directives: Vec<HostDirective>,
}

impl Advisory {
    pub fn for_event(event: ConnectivityEvent) -> Self {
        let directives = match event {
            ConnectivityEvent::Available => vec![
                HostDirective::ClearTransportCache,
                HostDirective::SetTransportCacheMode(TransportCacheMode::NoCache),
                HostDirective::Reload,
            ],
            ConnectivityEvent::Lost => {
                vec![HostDirective::SetTransportCacheMode(TransportCacheMode::CacheElseNetwork)]
            }
        };
        Self { event, directives }
    }
}

/// Live subscription translating connectivity events into advisories.
///
/// Dropping the watch unsubscribes from the source, which ends the
/// translating task.
pub struct ConnectivityWatch {
    source: Arc<dyn ConnectivityEventSource>,
    id: SubscriptionId,
    advisories: mpsc::UnboundedReceiver<Advisory>,
}

impl ConnectivityWatch {
    /// Subscribe to `source`. Must be called within a tokio runtime.
    pub fn start(source: Arc<dyn ConnectivityEventSource>) -> Self {
        let Subscription { id, mut events } = source.subscribe();
        let (tx, advisories) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                let advisory = Advisory::for_event(event);
                tracing::info!(?event, directives = ?advisory.directives, "connectivity advisory");
                if tx.send(advisory).is_err() {
                    break;
                }
            }
            tracing::debug!("connectivity watch ended");
        });

        Self { source, id, advisories }
    }

    /// Next advisory, or `None` once the subscription has ended.
    pub async fn recv(&mut self) -> Option<Advisory> {
        self.advisories.recv().await
    }

    pub fn stop(self) {
        drop(self);
    }
}

impl Drop for ConnectivityWatch {
    fn drop(&mut self) {
        self.source.unsubscribe(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use offcache_core::ManualConnectivity;
    use std::time::Duration;

    #[test]
    fn test_available_clears_and_reloads() {
        let advisory = Advisory::for_event(ConnectivityEvent::Available);
        assert_eq!(
            advisory.directives,
            vec![
                HostDirective::ClearTransportCache,
                HostDirective::SetTransportCacheMode(TransportCacheMode::NoCache),
                HostDirective::Reload,
            ]
        );
    }

    #[test]
    fn test_lost_prefers_cache() {
        let advisory = Advisory::for_event(ConnectivityEvent::Lost);
        assert_eq!(
            advisory.directives,
            vec![HostDirective::SetTransportCacheMode(TransportCacheMode::CacheElseNetwork)]
        );
    }

    #[test]
    fn test_mode_for_connectivity() {
        assert_eq!(TransportCacheMode::for_connectivity(true), TransportCacheMode::NoCache);
        assert_eq!(TransportCacheMode::for_connectivity(false), TransportCacheMode::CacheElseNetwork);
    }

    #[tokio::test]
    async fn test_watch_translates_edges() {
        let connectivity = Arc::new(ManualConnectivity::new(true));
        let mut watch = ConnectivityWatch::start(connectivity.clone());

        connectivity.set_available(false);
        connectivity.set_available(true);

        let lost = tokio::time::timeout(Duration::from_secs(1), watch.recv()).await.unwrap().unwrap();
        assert_eq!(lost.event, ConnectivityEvent::Lost);

        let available = tokio::time::timeout(Duration::from_secs(1), watch.recv()).await.unwrap().unwrap();
        assert_eq!(available.event, ConnectivityEvent::Available);
        assert!(available.directives.contains(&HostDirective::Reload));
    }

    #[tokio::test]
    async fn test_stop_unsubscribes() {
        let connectivity = Arc::new(ManualConnectivity::new(true));
        let watch = ConnectivityWatch::start(connectivity.clone());
        assert_eq!(connectivity.subscriber_count(), 1);

        watch.stop();
        assert_eq!(connectivity.subscriber_count(), 0);
    }
}
