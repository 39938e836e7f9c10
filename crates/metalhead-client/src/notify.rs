//! Toast notifications raised by pages.
//!
//! Pages push toasts here; the host UI either drains the queue after each
//! action or subscribes for live delivery. Every toast is mirrored to the
//! log.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

const TOAST_CHANNEL_CAPACITY: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastLevel {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Toast {
    pub id: Uuid,
    pub level: ToastLevel,
    pub message: String,
}

#[derive(Clone)]
pub struct Notifier {
    pending: Arc<Mutex<VecDeque<Toast>>>,
    live: broadcast::Sender<Toast>,
}

impl Notifier {
    pub fn new() -> Self {
        let (live, _) = broadcast::channel(TOAST_CHANNEL_CAPACITY);
        Self {
            pending: Arc::new(Mutex::new(VecDeque::new())),
            live,
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Toast>> {
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn success(&self, message: impl Into<String>) {
        self.push(ToastLevel::Success, message.into());
    }

    pub fn error(&self, message: impl Into<String>) {
        self.push(ToastLevel::Error, message.into());
    }

    fn push(&self, level: ToastLevel, message: String) {
        match level {
            ToastLevel::Success => tracing::info!(toast = %message, "Toast"),
            ToastLevel::Error => tracing::warn!(toast = %message, "Toast"),
        }
        let toast = Toast {
            id: Uuid::new_v4(),
            level,
            message,
        };
        self.lock().push_back(toast.clone());
        let _ = self.live.send(toast);
    }

    /// Take every toast raised since the last drain, oldest first.
    pub fn drain(&self) -> Vec<Toast> {
        self.lock().drain(..).collect()
    }

    /// Messages of the pending toasts, without consuming them.
    pub fn messages(&self) -> Vec<String> {
        self.lock().iter().map(|t| t.message.clone()).collect()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Toast> {
        self.live.subscribe()
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}
