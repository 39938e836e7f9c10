//! Application context shared by every page.
//!
//! [`AppState`] bundles the handles a page needs. Each handle is a cheap
//! clone over shared state, so the host builds one `AppState` per session
//! and hands clones to pages.

use std::sync::Arc;

use tracing::info;

use crate::backend::Backend;
use crate::cache::QueryCache;
use crate::config::ClientConfig;
use crate::connection::ActorConnection;
use crate::device::{BrowserType, DeviceType, InAppBrowser};
use crate::gateway::GatewayTracker;
use crate::notify::Notifier;
use crate::queries::DataClient;
use crate::session::SessionStorage;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ClientConfig>,

    /// Storage that lives as long as the session (the advisory flag).
    pub session: SessionStorage,

    pub gateway: GatewayTracker,

    pub cache: QueryCache,

    /// The backend actor; absent until identity is known.
    pub connection: ActorConnection,

    pub data: DataClient,

    pub notifier: Notifier,
}

impl AppState {
    pub fn new(config: ClientConfig) -> Self {
        let gateway = GatewayTracker::with_threshold(config.failure_threshold);
        let cache = QueryCache::with_stale_time(config.stale_time);
        let connection = ActorConnection::new();
        let data = DataClient::new(connection.clone(), gateway.clone(), cache.clone());

        Self {
            config: Arc::new(config),
            session: SessionStorage::new(),
            gateway,
            cache,
            connection,
            data,
            notifier: Notifier::new(),
        }
    }

    /// Context with an actor already connected.
    pub fn with_backend(config: ClientConfig, backend: Arc<dyn Backend>) -> Self {
        let state = Self::new(config);
        state.connection.set_actor(backend);
        state
    }

    /// Swap in the actor for a new identity. Cached data belonged to the
    /// previous identity and is dropped.
    pub fn reconnect(&self, backend: Arc<dyn Backend>) {
        self.connection.begin_connect();
        self.cache.clear();
        self.connection.set_actor(backend);
        info!("Reconnected backend for new identity");
    }

    pub fn device(&self) -> DeviceType {
        DeviceType::detect(&self.config.user_agent)
    }

    pub fn browser(&self) -> BrowserType {
        BrowserType::detect(&self.config.user_agent)
    }

    pub fn in_app_browser(&self) -> Option<InAppBrowser> {
        InAppBrowser::detect(&self.config.user_agent)
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(ClientConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::ConnectionState;
    use crate::fake::MemoryBackend;
    use metalhead_shared::Principal;

    #[test]
    fn test_new_state_is_disconnected() {
        let state = AppState::default();
        assert_eq!(state.connection.state(), ConnectionState::Unavailable);
        assert!(!state.data.is_enabled());
        assert_eq!(state.gateway.threshold(), 3);
    }

    #[test]
    fn test_threshold_and_user_agent_from_config() {
        let config = ClientConfig {
            failure_threshold: 5,
            user_agent: "Mozilla/5.0 (iPhone) Instagram 300.0".into(),
            ..ClientConfig::default()
        };
        let state = AppState::new(config);
        assert_eq!(state.gateway.threshold(), 5);
        assert_eq!(state.device(), DeviceType::IosPhone);
        assert_eq!(state.in_app_browser(), Some(InAppBrowser::Instagram));
    }

    #[tokio::test]
    async fn test_reconnect_drops_cache() {
        let alice = Arc::new(MemoryBackend::new(Principal::from_text("alice").unwrap()));
        let state = AppState::with_backend(ClientConfig::default(), alice.clone());
        state.data.feed().await.unwrap();

        let bob = Arc::new(MemoryBackend::new(Principal::from_text("bob").unwrap()));
        state.reconnect(bob.clone());
        state.data.feed().await.unwrap();

        assert_eq!(alice.calls("get_feed"), 1);
        assert_eq!(bob.calls("get_feed"), 1);
    }
}
