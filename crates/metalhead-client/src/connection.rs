//! Handle to the backend actor.
//!
//! The actor is created by the host once identity is known, and recreated
//! whenever identity changes. While it is absent or being rebuilt every
//! data-access call is disabled.

use std::sync::{Arc, RwLock};

use serde::Serialize;
use tracing::info;

use crate::backend::Backend;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    /// No actor has been created yet, or it was dropped.
    Unavailable,
    /// An actor is being (re)established.
    Connecting,
    Ready,
}

#[derive(Default)]
struct Slot {
    actor: Option<Arc<dyn Backend>>,
    connecting: bool,
}

#[derive(Clone, Default)]
pub struct ActorConnection {
    slot: Arc<RwLock<Slot>>,
}

impl ActorConnection {
    pub fn new() -> Self {
        Self::default()
    }

    /// A connection that is ready immediately.
    pub fn ready(actor: Arc<dyn Backend>) -> Self {
        let connection = Self::new();
        connection.set_actor(actor);
        connection
    }

    pub fn begin_connect(&self) {
        let mut slot = self.slot.write().unwrap_or_else(|e| e.into_inner());
        slot.connecting = true;
    }

    pub fn set_actor(&self, actor: Arc<dyn Backend>) {
        let mut slot = self.slot.write().unwrap_or_else(|e| e.into_inner());
        slot.actor = Some(actor);
        slot.connecting = false;
        info!("Backend actor ready");
    }

    pub fn disconnect(&self) {
        let mut slot = self.slot.write().unwrap_or_else(|e| e.into_inner());
        slot.actor = None;
        slot.connecting = false;
        info!("Backend actor dropped");
    }

    pub fn state(&self) -> ConnectionState {
        let slot = self.slot.read().unwrap_or_else(|e| e.into_inner());
        match (&slot.actor, slot.connecting) {
            (_, true) => ConnectionState::Connecting,
            (Some(_), false) => ConnectionState::Ready,
            (None, false) => ConnectionState::Unavailable,
        }
    }

    /// The actor, if calls are currently enabled.
    pub fn actor(&self) -> Option<Arc<dyn Backend>> {
        let slot = self.slot.read().unwrap_or_else(|e| e.into_inner());
        if slot.connecting {
            return None;
        }
        slot.actor.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::MemoryBackend;
    use metalhead_shared::Principal;

    #[test]
    fn test_lifecycle() {
        let connection = ActorConnection::new();
        assert_eq!(connection.state(), ConnectionState::Unavailable);
        assert!(connection.actor().is_none());

        let backend = Arc::new(MemoryBackend::new(Principal::from_text("alice").unwrap()));
        connection.set_actor(backend);
        assert_eq!(connection.state(), ConnectionState::Ready);
        assert!(connection.actor().is_some());

        connection.begin_connect();
        assert_eq!(connection.state(), ConnectionState::Connecting);
        assert!(connection.actor().is_none());

        connection.disconnect();
        assert_eq!(connection.state(), ConnectionState::Unavailable);
    }
}
