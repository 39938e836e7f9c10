//! Small connectivity badge driven by the gateway tracker.

use crate::gateway::{GatewayState, GatewayStatus, GatewayTracker, Reload};
use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Indicator {
    Hidden,
    ConnectionFailed { attempts: u32 },
    UsingFallback,
    /// Normal state while a fallback gateway is still in use.
    Connected,
}

impl Indicator {
    pub fn from_status(status: &GatewayStatus) -> Self {
        match status.state {
            GatewayState::Normal if !status.using_fallback => Indicator::Hidden,
            GatewayState::Failed => Indicator::ConnectionFailed {
                attempts: status.consecutive_failures,
            },
            GatewayState::Fallback => Indicator::UsingFallback,
            GatewayState::Normal => Indicator::Connected,
        }
    }

    pub fn label(self) -> Option<&'static str> {
        match self {
            Indicator::Hidden => None,
            Indicator::ConnectionFailed { .. } => Some("Connection Failed"),
            Indicator::UsingFallback => Some("Using Fallback"),
            Indicator::Connected => Some("Connected"),
        }
    }

    pub fn description(self) -> Option<String> {
        match self {
            Indicator::Hidden => None,
            Indicator::ConnectionFailed { attempts } => Some(format!(
                "Gateway connection failed ({attempts} attempts). Click to retry."
            )),
            Indicator::UsingFallback => {
                Some("Using alternative gateway due to connection issues.".to_string())
            }
            Indicator::Connected => Some("Gateway connection is normal.".to_string()),
        }
    }

    /// Only a failed connection can be retried from the badge.
    pub fn can_retry(self) -> bool {
        matches!(self, Indicator::ConnectionFailed { .. })
    }
}

#[derive(Clone)]
pub struct NetworkStatusIndicator {
    gateway: GatewayTracker,
}

impl NetworkStatusIndicator {
    pub fn new(state: AppState) -> Self {
        Self {
            gateway: state.gateway,
        }
    }

    pub fn indicator(&self) -> Indicator {
        Indicator::from_status(&self.gateway.status())
    }

    /// Reset the counters and reload. Returns `false` when there is nothing
    /// to retry.
    pub fn retry(&self, host: &dyn Reload) -> bool {
        if !self.indicator().can_retry() {
            return false;
        }
        self.gateway.manual_retry(host);
        true
    }
}
