//! Shared application state for Axum routers.

use std::sync::Arc;
use std::time::Instant;

use chirp_storage::{CacheBackend, CacheObserver, CacheOutcome, CoherentCache, GraphStore};

use crate::auth::AuthConfig;
use crate::config::ApiConfig;
use crate::hub::{DeliveryHub, PresenceRegistry};
use crate::services::{
    FeedService, MessageService, NotificationDispatcher, NotificationSink, ProfileService,
    ToggleEngine,
};
use crate::telemetry::metrics::with_metrics;
use crate::ws::WsState;

/// Application-wide state shared across all routes.
///
/// Every service holds the same store, cache and registry handles, so
/// cloning the state is cheap and all clones observe the same data.
#[derive(Clone)]
pub struct AppState {
    /// Authoritative graph store.
    pub store: Arc<dyn GraphStore>,
    /// Read-through cache in front of feed and profile reads.
    pub cache: CoherentCache,
    pub notifications: NotificationDispatcher,
    pub toggles: ToggleEngine,
    pub feed: FeedService,
    pub profiles: ProfileService,
    pub messages: MessageService,
    /// Live connections of this process.
    pub registry: PresenceRegistry,
    pub ws: Arc<WsState>,
    pub auth_config: Arc<AuthConfig>,
    pub api_config: Arc<ApiConfig>,
    pub start_time: Instant,
}

impl AppState {
    /// Wire every service around one store and one cache backend.
    ///
    /// Cache outcomes feed the Prometheus counters, and persisted
    /// notifications are pushed live through the presence registry.
    pub fn new(
        store: Arc<dyn GraphStore>,
        cache_backend: Arc<dyn CacheBackend>,
        api_config: ApiConfig,
        auth_config: AuthConfig,
    ) -> Self {
        let observer: CacheObserver = Arc::new(|operation: &'static str, outcome: CacheOutcome| {
            with_metrics(|m| m.record_cache(operation, outcome))
        });
        let cache =
            CoherentCache::new(cache_backend, api_config.cache_config()).with_observer(observer);

        let registry = PresenceRegistry::new(api_config.ws_presence_capacity);
        let sink: Arc<dyn NotificationSink> = Arc::new(registry.clone());
        let notifications = NotificationDispatcher::new(store.clone()).with_sink(sink);

        let toggles = ToggleEngine::new(store.clone(), cache.clone(), notifications.clone());
        let feed = FeedService::new(store.clone(), cache.clone(), notifications.clone())
            .with_pair_locks(toggles.pair_locks());
        let profiles = ProfileService::new(store.clone(), cache.clone());
        let messages = MessageService::new(store.clone(), registry.clone());

        let auth_config = Arc::new(auth_config);
        let hub = DeliveryHub::new(registry.clone(), messages.clone());
        let ws = Arc::new(WsState::new(hub, auth_config.clone()));

        Self {
            store,
            cache,
            notifications,
            toggles,
            feed,
            profiles,
            messages,
            registry,
            ws,
            auth_config,
            api_config: Arc::new(api_config),
            start_time: Instant::now(),
        }
    }
}

crate::impl_from_ref!(Arc<dyn GraphStore>, store);
crate::impl_from_ref!(CoherentCache, cache);
crate::impl_from_ref!(NotificationDispatcher, notifications);
crate::impl_from_ref!(ToggleEngine, toggles);
crate::impl_from_ref!(FeedService, feed);
crate::impl_from_ref!(ProfileService, profiles);
crate::impl_from_ref!(MessageService, messages);
crate::impl_from_ref!(PresenceRegistry, registry);
crate::impl_from_ref!(Arc<WsState>, ws);
crate::impl_from_ref!(Instant, start_time);
