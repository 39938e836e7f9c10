//! Gateway health tracking.
//!
//! Counts consecutive failures to reach the backend's network entry point
//! and exposes a coarse connectivity state to the UI. The tracker is an
//! explicit handle: whoever builds the client owns one and passes it on, and
//! observers subscribe to a `watch` channel for changes.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use metalhead_shared::constants::{
    GATEWAY_DOMAIN, GATEWAY_FAILURE_THRESHOLD, RAW_GATEWAY_DOMAIN,
};
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, error, info};
use url::Url;

use crate::error::RemoteError;

/// Substrings that identify a gateway resolution failure in text-only errors.
const GATEWAY_ERROR_PATTERNS: [&str; 10] = [
    "canister id not resolved",
    "canister not found",
    "gateway could not determine",
    "domain not recognized",
    "cannot resolve",
    "replica error",
    "boundary node",
    "http gateway error",
    "failed to fetch",
    "network error",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GatewayState {
    Normal,
    Fallback,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayStatus {
    pub state: GatewayState,
    pub consecutive_failures: u32,
    pub last_error_at: Option<DateTime<Utc>>,
    pub retry_count: u32,
    pub using_fallback: bool,
}

impl Default for GatewayStatus {
    fn default() -> Self {
        Self {
            state: GatewayState::Normal,
            consecutive_failures: 0,
            last_error_at: None,
            retry_count: 0,
            using_fallback: false,
        }
    }
}

/// Host hook for the manual retry path, which reloads the whole app.
pub trait Reload: Send + Sync {
    fn reload(&self);
}

/// Whether a failed call looks like a gateway resolution problem rather
/// than a domain error.
pub fn is_gateway_resolution_error(err: &RemoteError) -> bool {
    match err {
        RemoteError::Gateway(_) => true,
        RemoteError::Rejected { message, .. } => is_gateway_resolution_message(message),
    }
}

pub fn is_gateway_resolution_message(message: &str) -> bool {
    let lower = message.to_lowercase();
    GATEWAY_ERROR_PATTERNS
        .iter()
        .any(|pattern| lower.contains(pattern))
}

pub fn gateway_error_message(err: &RemoteError) -> &'static str {
    if is_gateway_resolution_error(err) {
        "Unable to connect to the Internet Computer gateway. This is usually temporary. Please try again in a few moments."
    } else {
        "An unexpected error occurred"
    }
}

pub fn log_gateway_error(err: &RemoteError, context: &str) {
    error!(
        context,
        error = %err,
        timestamp = %Utc::now().to_rfc3339(),
        "Gateway error"
    );
}

/// Swap the hosted gateway domain for its raw counterpart
/// (`app.icp0.io` -> `app.raw.icp0.io`).
///
/// Returns `None` when the URL is not served from the hosted gateway or is
/// already on the raw one.
pub fn alternative_gateway_url(url: &Url) -> Option<Url> {
    let host = url.host_str()?;
    if host.contains(RAW_GATEWAY_DOMAIN) || !host.contains(GATEWAY_DOMAIN) {
        return None;
    }
    let raw_host = host.replacen(GATEWAY_DOMAIN, RAW_GATEWAY_DOMAIN, 1);
    let mut alternative = url.clone();
    alternative.set_host(Some(&raw_host)).ok()?;
    Some(alternative)
}

/// Cloneable handle over the shared gateway status.
#[derive(Clone)]
pub struct GatewayTracker {
    status: Arc<watch::Sender<GatewayStatus>>,
    threshold: u32,
}

impl GatewayTracker {
    pub fn new() -> Self {
        Self::with_threshold(GATEWAY_FAILURE_THRESHOLD)
    }

    pub fn with_threshold(threshold: u32) -> Self {
        let (tx, _rx) = watch::channel(GatewayStatus::default());
        Self {
            status: Arc::new(tx),
            threshold: threshold.max(1),
        }
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Current status snapshot.
    pub fn status(&self) -> GatewayStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<GatewayStatus> {
        self.status.subscribe()
    }

    pub fn record_success(&self) {
        self.status.send_if_modified(|status| {
            let next = GatewayStatus {
                state: GatewayState::Normal,
                consecutive_failures: 0,
                last_error_at: None,
                retry_count: status.retry_count,
                using_fallback: false,
            };
            if *status == next {
                return false;
            }
            if status.state != GatewayState::Normal {
                info!("Gateway connection restored");
            }
            *status = next;
            true
        });
    }

    /// Count a failure if it is a gateway resolution error; anything else
    /// leaves the status untouched.
    pub fn record_failure(&self, err: &RemoteError) {
        if !is_gateway_resolution_error(err) {
            return;
        }

        let threshold = self.threshold;
        self.status.send_modify(|status| {
            status.consecutive_failures = status.consecutive_failures.saturating_add(1);
            status.last_error_at = Some(Utc::now());
            status.state = if status.consecutive_failures >= threshold {
                GatewayState::Failed
            } else {
                GatewayState::Normal
            };
            debug!(
                failures = status.consecutive_failures,
                state = ?status.state,
                "Recorded gateway failure"
            );
        });
    }

    pub fn record_fallback_usage(&self) {
        self.status.send_modify(|status| {
            status.state = GatewayState::Fallback;
            status.using_fallback = true;
        });
        info!("Switched to fallback gateway");
    }

    pub fn reset_failures(&self) {
        self.status.send_modify(|status| {
            status.consecutive_failures = 0;
            status.last_error_at = None;
        });
    }

    pub fn increment_retry(&self) {
        self.status.send_modify(|status| {
            status.retry_count = status.retry_count.saturating_add(1);
        });
    }

    pub fn reset_retry(&self) {
        self.status.send_modify(|status| status.retry_count = 0);
    }

    /// Reset the counters and reload the app; there is no in-place retry.
    pub fn manual_retry(&self, host: &dyn Reload) {
        self.reset_failures();
        self.reset_retry();
        info!("Manual retry requested, reloading");
        host.reload();
    }
}

impl Default for GatewayTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn gateway_err() -> RemoteError {
        RemoteError::legacy("TypeError: Failed to fetch")
    }

    #[test]
    fn test_classification() {
        assert!(is_gateway_resolution_error(&RemoteError::Gateway("timeout".into())));
        assert!(is_gateway_resolution_error(&RemoteError::legacy(
            "Canister ID not resolved for host"
        )));
        assert!(is_gateway_resolution_error(&gateway_err()));
        assert!(!is_gateway_resolution_error(&RemoteError::legacy(
            "Unauthorized: Only users can post"
        )));
    }

    #[test]
    fn test_three_failures_flip_to_failed() {
        let tracker = GatewayTracker::new();

        tracker.record_failure(&gateway_err());
        tracker.record_failure(&gateway_err());
        let status = tracker.status();
        assert_eq!(status.state, GatewayState::Normal);
        assert_eq!(status.consecutive_failures, 2);
        assert!(status.last_error_at.is_some());

        tracker.record_failure(&gateway_err());
        let status = tracker.status();
        assert_eq!(status.state, GatewayState::Failed);
        assert_eq!(status.consecutive_failures, 3);
    }

    #[test]
    fn test_success_resets_from_any_state() {
        let tracker = GatewayTracker::new();
        for _ in 0..4 {
            tracker.record_failure(&gateway_err());
        }
        tracker.record_fallback_usage();
        tracker.increment_retry();

        tracker.record_success();
        let status = tracker.status();
        assert_eq!(status.state, GatewayState::Normal);
        assert_eq!(status.consecutive_failures, 0);
        assert_eq!(status.last_error_at, None);
        assert!(!status.using_fallback);
        assert_eq!(status.retry_count, 1);
    }

    #[test]
    fn test_unclassified_failure_is_ignored() {
        let tracker = GatewayTracker::new();
        tracker.record_failure(&gateway_err());
        let before = tracker.status();

        tracker.record_failure(&RemoteError::legacy("Post already liked"));
        assert_eq!(tracker.status(), before);
    }

    #[test]
    fn test_fallback_only_by_explicit_signal() {
        let tracker = GatewayTracker::new();
        for _ in 0..10 {
            tracker.record_failure(&gateway_err());
        }
        assert_eq!(tracker.status().state, GatewayState::Failed);

        tracker.record_fallback_usage();
        let status = tracker.status();
        assert_eq!(status.state, GatewayState::Fallback);
        assert!(status.using_fallback);
    }

    #[test]
    fn test_manual_retry_resets_and_reloads() {
        struct CountingReload(AtomicUsize);
        impl Reload for CountingReload {
            fn reload(&self) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        let tracker = GatewayTracker::new();
        for _ in 0..3 {
            tracker.record_failure(&gateway_err());
        }
        tracker.increment_retry();

        let host = CountingReload(AtomicUsize::new(0));
        tracker.manual_retry(&host);

        let status = tracker.status();
        assert_eq!(status.consecutive_failures, 0);
        assert_eq!(status.retry_count, 0);
        assert_eq!(host.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_subscribers_see_changes() {
        let tracker = GatewayTracker::new();
        let mut rx = tracker.subscribe();

        tracker.record_failure(&gateway_err());
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().consecutive_failures, 1);

        // A no-op success from a clean state does not wake observers.
        tracker.record_success();
        assert!(rx.has_changed().unwrap());
        rx.borrow_and_update();
        tracker.record_success();
        assert!(!rx.has_changed().unwrap());
    }

    #[test]
    fn test_alternative_gateway_url() {
        let url = Url::parse("https://metalhead.icp0.io/feed?x=1").unwrap();
        let alt = alternative_gateway_url(&url).unwrap();
        assert_eq!(alt.as_str(), "https://metalhead.raw.icp0.io/feed?x=1");

        assert!(alternative_gateway_url(&alt).is_none());
        let other = Url::parse("https://example.com/").unwrap();
        assert!(alternative_gateway_url(&other).is_none());
    }

    #[test]
    fn test_gateway_error_message() {
        assert!(gateway_error_message(&gateway_err()).starts_with("Unable to connect"));
        assert_eq!(
            gateway_error_message(&RemoteError::legacy("nope")),
            "An unexpected error occurred"
        );
    }
}
