//! Network-versus-cache decisions for intercepted requests.
//!
//! ### Online-first policy
//! - Online: fetch; a 200 is stored and returned. Anything else falls back to
//!   the store, and a non-200 is returned as-is when the store has nothing.
//! - Offline: serve from the store or return `None`.
//!
//! ### Cache-first policy
//! - Force reload while online: behave like online-first.
//! - Store hit: return it immediately. When online and not force-reloading,
//!   refresh the entry on a background task whose failures are only logged.
//! - Store miss: online-first fetch when online, `None` when offline.
//!
//! Only status 200 is ever written to the store.

use crate::directive::{ConnectivityWatch, HostDirective, TransportCacheMode};
use crate::state::{EngineState, OperatingMode};
use offcache_client::{FetchConfig, FetchResult, Fetcher, HttpFetcher, TransportError};
use offcache_core::{
    AppConfig, CacheKey, CachePolicy, CachedResponse, ConnectivityEventSource, ConnectivityOracle, ContentStore,
    RequestDescriptor,
};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

/// Errors raised while assembling an engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Store(#[from] offcache_core::Error),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// The interception engine shared by every request-handling task.
pub struct InterceptionEngine {
    store: Arc<ContentStore>,
    fetcher: Arc<dyn Fetcher>,
    connectivity: Arc<dyn ConnectivityOracle>,
    policy: CachePolicy,
    state: Mutex<EngineState>,
}

impl InterceptionEngine {
    pub fn new(
        store: Arc<ContentStore>, fetcher: Arc<dyn Fetcher>, connectivity: Arc<dyn ConnectivityOracle>,
        policy: CachePolicy, force_reload_window: Duration,
    ) -> Self {
        Self { store, fetcher, connectivity, policy, state: Mutex::new(EngineState::new(force_reload_window)) }
    }

    /// Build an engine with an on-disk store and an HTTP fetcher from `config`.
    pub async fn from_config(config: &AppConfig, connectivity: Arc<dyn ConnectivityOracle>) -> Result<Self, EngineError> {
        let store = ContentStore::open(&config.cache_dir).await?;
        let fetcher = HttpFetcher::new(FetchConfig::from(config))?;

        tracing::info!(
            cache_dir = %config.cache_dir.display(),
            policy = ?config.policy,
            "interception engine ready"
        );

        Ok(Self::new(Arc::new(store), Arc::new(fetcher), connectivity, config.policy, config.force_reload_window()))
    }

    pub fn policy(&self) -> CachePolicy {
        self.policy
    }

    pub fn store(&self) -> &ContentStore {
        &self.store
    }

    pub fn is_network_available(&self) -> bool {
        self.connectivity.is_available()
    }

    /// Arm or clear a force reload.
    pub fn notify_force_reload(&self, force: bool) {
        tracing::debug!(force, "force reload toggled");
        self.state.lock().set_force_reload(force);
    }

    pub fn operating_mode(&self) -> OperatingMode {
        self.state.lock().operating_mode()
    }

    /// Transport cache mode the host should start with.
    pub fn initial_cache_mode(&self) -> TransportCacheMode {
        TransportCacheMode::for_connectivity(self.is_network_available())
    }

    /// Handle a user-initiated refresh.
    ///
    /// When online, arms a force reload and asks the host to drop its own
    /// cache and reload. Offline refreshes are ignored.
    pub fn request_refresh(&self) -> Vec<HostDirective> {
        if !self.is_network_available() {
            tracing::debug!("refresh ignored while offline");
            return Vec::new();
        }
        self.notify_force_reload(true);
        vec![HostDirective::ClearTransportCache, HostDirective::Reload]
    }

    /// Subscribe to connectivity transitions and receive host advisories.
    pub fn watch_connectivity(&self, source: Arc<dyn ConnectivityEventSource>) -> ConnectivityWatch {
        ConnectivityWatch::start(source)
    }

    /// Resolve an intercepted request.
    ///
    /// `None` means nothing is available and the host should render its own
    /// failure page.
    pub async fn intercept_request(&self, descriptor: &RequestDescriptor) -> Option<CachedResponse> {
        let key = CacheKey::for_url(descriptor.url());
        let online = self.is_network_available();

        let response = match self.policy {
            CachePolicy::OnlineFirst => self.online_first(descriptor, &key, online).await,
            CachePolicy::CacheFirst => self.cache_first(descriptor, &key, online).await,
        };

        if response.is_none() {
            tracing::debug!(url = descriptor.url(), online, "no content available");
        }
        response
    }

    async fn online_first(&self, descriptor: &RequestDescriptor, key: &CacheKey, online: bool) -> Option<CachedResponse> {
        if online { self.network_or_cache(descriptor, key).await } else { self.load_from_cache(key).await }
    }

    async fn cache_first(&self, descriptor: &RequestDescriptor, key: &CacheKey, online: bool) -> Option<CachedResponse> {
        let mode = self.operating_mode();

        if online && mode == OperatingMode::ForceReload {
            tracing::debug!(url = descriptor.url(), "force reload bypasses cache");
            return self.network_or_cache(descriptor, key).await;
        }

        if let Some(cached) = self.load_from_cache(key).await {
            if online && mode == OperatingMode::Normal {
                self.spawn_revalidation(descriptor.clone(), key.clone());
            }
            return Some(cached);
        }

        if online { self.network_or_cache(descriptor, key).await } else { None }
    }

    /// Fetch, falling back to the store on anything but a 200.
    async fn network_or_cache(&self, descriptor: &RequestDescriptor, key: &CacheKey) -> Option<CachedResponse> {
        match fetch_and_store(self.fetcher.as_ref(), &self.store, descriptor, key).await {
            Ok(result) if result.is_cacheable() => Some(result.into_response()),
            Ok(result) => {
                tracing::debug!(url = descriptor.url(), status = result.status, "uncacheable status, trying cache");
                Some(self.load_from_cache(key).await.unwrap_or_else(|| result.into_response()))
            }
            Err(e) => {
                tracing::warn!(url = descriptor.url(), error = %e, "fetch failed, falling back to cache");
                self.load_from_cache(key).await
            }
        }
    }

    async fn load_from_cache(&self, key: &CacheKey) -> Option<CachedResponse> {
        let entry = self.store.get(key).await;
        tracing::debug!(key = %key, hit = entry.is_some(), "cache lookup");
        entry.map(|e| CachedResponse::from_cache(e.body, e.media_type))
    }

    /// Refresh `key` without blocking the caller. Failures are logged only.
    fn spawn_revalidation(&self, descriptor: RequestDescriptor, key: CacheKey) {
        let fetcher = Arc::clone(&self.fetcher);
        let store = Arc::clone(&self.store);

        tokio::spawn(async move {
            match fetch_and_store(fetcher.as_ref(), &store, &descriptor, &key).await {
                Ok(result) => {
                    tracing::debug!(url = descriptor.url(), status = result.status, "background revalidation done")
                }
                Err(e) => tracing::warn!(url = descriptor.url(), error = %e, "background revalidation failed"),
            }
        });
    }
}

/// Fetch `descriptor` and persist the body when the status is 200.
///
/// Store write failures are logged; the fetch result is returned regardless.
async fn fetch_and_store(
    fetcher: &dyn Fetcher, store: &ContentStore, descriptor: &RequestDescriptor, key: &CacheKey,
) -> Result<FetchResult, TransportError> {
    let result = fetcher.fetch(descriptor).await?;

    if result.is_cacheable()
        && let Err(e) = store.put(key, &result.body, &result.media_type).await
    {
        tracing::warn!(url = descriptor.url(), error = %e, "failed to store response");
    }

    Ok(result)
}
