//! One-shot "connection issues" advisory.
//!
//! Opens the first time the gateway tracker reports `Failed` with at least
//! `threshold` consecutive failures. A flag in [`SessionStorage`] keeps it
//! from opening again for the rest of the session, no matter how many more
//! failures arrive.
//!
//! [`SessionStorage`]: crate::session::SessionStorage

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::info;
use url::Url;

use crate::device::cache_clearing_instructions;
use crate::gateway::{alternative_gateway_url, GatewayState};
use crate::state::AppState;

pub const TITLE: &str = "Connection Issues Detected";
pub const DESCRIPTION: &str = "We're having trouble connecting to the Internet Computer gateway. This is usually temporary and can often be fixed by clearing your browser cache.";
pub const REASSURANCE: &str =
    "Your app data is safe. This is a temporary connection issue with the gateway servers.";
pub const OTHER_TIPS: [&str; 4] = [
    "Try switching between WiFi and mobile data",
    "Wait a few minutes and try again",
    "Use a different browser",
    "Restart your device",
];
pub const SWITCH_NETWORK_HINT: &str =
    "Try switching between WiFi and mobile data, then reload the page.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdvisoryAction {
    /// Load the app from this URL instead.
    Navigate(Url),
    Closed,
}

#[derive(Clone)]
pub struct CacheAdvisory {
    state: AppState,
    open: Arc<AtomicBool>,
}

impl CacheAdvisory {
    pub fn new(state: AppState) -> Self {
        Self {
            state,
            open: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn shown_this_session(&self) -> bool {
        self.state
            .session
            .contains(&self.state.config.advisory_session_key)
    }

    /// Check the current gateway status and open the advisory if it is due.
    /// Returns `true` only on the call that opened it.
    pub fn observe(&self) -> bool {
        if self.shown_this_session() {
            return false;
        }
        let status = self.state.gateway.status();
        if status.consecutive_failures < self.state.gateway.threshold()
            || status.state != GatewayState::Failed
        {
            return false;
        }

        // Another observer may have claimed the flag since the check above.
        if !self
            .state
            .session
            .set_if_absent(&self.state.config.advisory_session_key, "true")
        {
            return false;
        }
        self.open.store(true, Ordering::SeqCst);
        info!(
            failures = status.consecutive_failures,
            "Opened connection advisory"
        );
        true
    }

    /// Wait for gateway updates until the advisory opens. Returns `false`
    /// straight away if it was already shown this session.
    pub async fn wait_until_open(&self) -> bool {
        let mut updates = self.state.gateway.subscribe();
        loop {
            if self.observe() {
                return true;
            }
            if self.shown_this_session() {
                return false;
            }
            if updates.changed().await.is_err() {
                return false;
            }
        }
    }

    pub fn close(&self) {
        self.open.store(false, Ordering::SeqCst);
    }

    /// Move to the raw gateway. When the current URL has no raw
    /// counterpart the advisory just closes.
    pub fn try_alternative_gateway(&self, current: &Url) -> AdvisoryAction {
        match alternative_gateway_url(current) {
            Some(url) => {
                info!(url = %url, "Switching to alternative gateway");
                AdvisoryAction::Navigate(url)
            }
            None => {
                self.close();
                AdvisoryAction::Closed
            }
        }
    }

    /// [`CacheAdvisory::try_alternative_gateway`] against the configured
    /// app URL.
    pub fn try_configured_gateway(&self) -> AdvisoryAction {
        match self.state.config.gateway_url.clone() {
            Some(url) => self.try_alternative_gateway(&url),
            None => {
                self.close();
                AdvisoryAction::Closed
            }
        }
    }

    /// Close and hand back the hint the host should show.
    pub fn switch_network(&self) -> &'static str {
        self.close();
        SWITCH_NETWORK_HINT
    }

    pub fn instructions(&self) -> &'static [&'static str] {
        cache_clearing_instructions(self.state.device(), self.state.browser())
    }

    pub fn device_name(&self) -> &'static str {
        self.state.device().name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::error::RemoteError;

    fn gateway_failure() -> RemoteError {
        RemoteError::Gateway("Canister ID not resolved".into())
    }

    #[test]
    fn test_opens_at_threshold() {
        let state = AppState::default();
        let advisory = CacheAdvisory::new(state.clone());

        state.gateway.record_failure(&gateway_failure());
        state.gateway.record_failure(&gateway_failure());
        assert!(!advisory.observe());
        assert!(!advisory.is_open());

        state.gateway.record_failure(&gateway_failure());
        assert!(advisory.observe());
        assert!(advisory.is_open());
    }

    #[test]
    fn test_session_flag_suppresses_repeat() {
        let state = AppState::default();
        let advisory = CacheAdvisory::new(state.clone());
        for _ in 0..3 {
            state.gateway.record_failure(&gateway_failure());
        }
        assert!(advisory.observe());
        advisory.close();

        state.gateway.record_failure(&gateway_failure());
        assert!(!advisory.observe());
        assert!(!advisory.is_open());

        // A fresh view in the same session is suppressed too.
        assert!(!CacheAdvisory::new(state).observe());
    }

    #[test]
    fn test_concurrent_observers_open_once() {
        let state = AppState::default();
        for _ in 0..3 {
            state.gateway.record_failure(&gateway_failure());
        }

        let opened: usize = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    let advisory = CacheAdvisory::new(state.clone());
                    scope.spawn(move || advisory.observe())
                })
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap() as usize)
                .sum()
        });
        assert_eq!(opened, 1);
    }

    #[tokio::test]
    async fn test_wait_until_open() {
        let state = AppState::default();
        let advisory = CacheAdvisory::new(state.clone());

        let waiter = {
            let advisory = advisory.clone();
            tokio::spawn(async move { advisory.wait_until_open().await })
        };
        for _ in 0..3 {
            tokio::task::yield_now().await;
            state.gateway.record_failure(&gateway_failure());
        }

        assert!(waiter.await.unwrap());
        assert!(advisory.is_open());
        assert!(!advisory.wait_until_open().await);
    }

    #[test]
    fn test_alternative_gateway() {
        let advisory = CacheAdvisory::new(AppState::default());
        let hosted = Url::parse("https://abc-cai.icp0.io/feed").unwrap();
        assert_eq!(
            advisory.try_alternative_gateway(&hosted),
            AdvisoryAction::Navigate(Url::parse("https://abc-cai.raw.icp0.io/feed").unwrap())
        );

        let local = Url::parse("http://localhost:8080/").unwrap();
        assert_eq!(advisory.try_alternative_gateway(&local), AdvisoryAction::Closed);
        assert_eq!(advisory.switch_network(), SWITCH_NETWORK_HINT);
        assert_eq!(advisory.try_configured_gateway(), AdvisoryAction::Closed);

        let config = ClientConfig {
            gateway_url: Some(hosted),
            ..ClientConfig::default()
        };
        let configured = CacheAdvisory::new(AppState::new(config));
        assert!(matches!(
            configured.try_configured_gateway(),
            AdvisoryAction::Navigate(url) if url.host_str() == Some("abc-cai.raw.icp0.io")
        ));
    }

    #[test]
    fn test_custom_threshold_and_key() {
        let config = ClientConfig {
            failure_threshold: 1,
            advisory_session_key: "advisory".into(),
            ..ClientConfig::default()
        };
        let state = AppState::new(config);
        let advisory = CacheAdvisory::new(state.clone());

        state.gateway.record_failure(&gateway_failure());
        assert!(advisory.observe());
        assert!(state.session.contains("advisory"));
    }

    #[test]
    fn test_instructions_follow_user_agent() {
        let config = ClientConfig {
            user_agent: "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) Version/17.0 Mobile Safari/604.1".into(),
            ..ClientConfig::default()
        };
        let advisory = CacheAdvisory::new(AppState::new(config));
        assert_eq!(advisory.device_name(), "iPhone");
        assert!(!advisory.instructions().is_empty());
    }
}
