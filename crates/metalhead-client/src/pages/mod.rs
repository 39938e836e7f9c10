//! View models for each screen.
//!
//! A page owns its form state behind a shared handle so the host can render
//! from it while an action is in flight. Actions report their outcome both
//! as a `Result` and as a toast on the [`Notifier`](crate::notify::Notifier).

pub mod advisory;
pub mod age_verification;
pub mod app;
pub mod blocked;
pub mod composer;
pub mod delete_account;
pub mod feed;
pub mod friends;
pub mod network_status;
pub mod post_card;
pub mod profile;
pub mod report;
pub mod settings;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::ClientError;
use crate::notify::Notifier;

/// Host hook for yes/no confirmation prompts.
pub trait Confirm: Sync {
    fn confirm(&self, prompt: &str) -> bool;
}

impl<F> Confirm for F
where
    F: Fn(&str) -> bool + Sync,
{
    fn confirm(&self, prompt: &str) -> bool {
        self(prompt)
    }
}

/// Tracks whether an action is running; drives disabled buttons and
/// "Saving..." labels.
#[derive(Clone, Default)]
pub struct Pending(Arc<AtomicUsize>);

impl Pending {
    pub fn is_pending(&self) -> bool {
        self.0.load(Ordering::SeqCst) > 0
    }

    fn start(&self) -> PendingGuard<'_> {
        self.0.fetch_add(1, Ordering::SeqCst);
        PendingGuard(&self.0)
    }
}

struct PendingGuard<'a>(&'a AtomicUsize);

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// Toast a failed action, falling back to `fallback` if the error has no
/// text of its own.
fn toast_failure(notifier: &Notifier, err: &ClientError, fallback: &str) {
    let message = err.to_string();
    if message.trim().is_empty() {
        notifier.error(fallback);
    } else {
        notifier.error(message);
    }
}
