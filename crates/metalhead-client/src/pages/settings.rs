//! Account settings: sign out, share links, build info.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use metalhead_shared::constants::DELETE_ACCOUNT_PATH;
use tracing::{info, warn};
use url::Url;

use super::app::AuthSession;
use super::blocked::BlockedUsersPage;
use crate::state::AppState;

/// Host hook onto the system clipboard.
pub trait Clipboard {
    fn write_text(&self, text: &str) -> std::io::Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildInfo {
    pub version: String,
    pub timestamp: DateTime<Utc>,
}

impl BuildInfo {
    /// Version from the crate, timestamp from `METALHEAD_BUILD_TIMESTAMP`
    /// at compile time when set, otherwise now.
    pub fn current() -> Self {
        let timestamp = option_env!("METALHEAD_BUILD_TIMESTAMP")
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or_else(Utc::now);
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp,
        }
    }

    pub fn label(&self) -> String {
        format!(
            "v{} ({})",
            self.version,
            self.timestamp.format("%b %-d, %Y, %I:%M %p")
        )
    }
}

#[derive(Clone)]
pub struct SettingsPage {
    state: AppState,
    auth: Arc<dyn AuthSession>,
    origin: Url,
    show_manual_copy: Arc<AtomicBool>,
    show_delete_url_copy: Arc<AtomicBool>,
}

impl SettingsPage {
    /// `origin` is the URL the app is served from.
    pub fn new(state: AppState, auth: Arc<dyn AuthSession>, origin: Url) -> Self {
        Self {
            state,
            auth,
            origin,
            show_manual_copy: Arc::new(AtomicBool::new(false)),
            show_delete_url_copy: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn app_link(&self) -> String {
        self.origin.origin().ascii_serialization()
    }

    pub fn delete_account_url(&self) -> String {
        format!("{}{}", self.app_link(), DELETE_ACCOUNT_PATH)
    }

    pub fn build_info(&self) -> BuildInfo {
        BuildInfo::current()
    }

    pub fn blocked_users(&self) -> BlockedUsersPage {
        BlockedUsersPage::new(self.state.clone())
    }

    /// Whether the app link should be shown for manual copying because the
    /// clipboard refused it.
    pub fn show_manual_copy(&self) -> bool {
        self.show_manual_copy.load(Ordering::SeqCst)
    }

    pub fn show_delete_url_copy(&self) -> bool {
        self.show_delete_url_copy.load(Ordering::SeqCst)
    }

    pub async fn sign_out(&self) {
        self.auth.sign_out().await;
        self.state.cache.clear();
        info!("Signed out");
        self.state.notifier.success("Signed out successfully");
    }

    pub fn copy_app_link(&self, clipboard: &dyn Clipboard) -> bool {
        self.copy(
            clipboard,
            &self.app_link(),
            &self.show_manual_copy,
            "App link copied to clipboard",
            "Failed to copy link automatically",
        )
    }

    pub fn copy_delete_account_url(&self, clipboard: &dyn Clipboard) -> bool {
        self.copy(
            clipboard,
            &self.delete_account_url(),
            &self.show_delete_url_copy,
            "Delete account URL copied to clipboard",
            "Failed to copy URL automatically",
        )
    }

    fn copy(
        &self,
        clipboard: &dyn Clipboard,
        text: &str,
        manual: &AtomicBool,
        copied: &str,
        failed: &str,
    ) -> bool {
        match clipboard.write_text(text) {
            Ok(()) => {
                manual.store(false, Ordering::SeqCst);
                self.state.notifier.success(copied);
                true
            }
            Err(err) => {
                warn!(error = %err, "Clipboard write failed");
                manual.store(true, Ordering::SeqCst);
                self.state.notifier.error(failed);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::fake::MemoryBackend;
    use crate::pages::app::AuthError;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use metalhead_shared::Principal;
    use std::io;
    use std::sync::Mutex;

    struct NoAuth;

    #[async_trait]
    impl AuthSession for NoAuth {
        fn principal(&self) -> Option<Principal> {
            None
        }

        async fn sign_in(&self) -> Result<(), AuthError> {
            Ok(())
        }

        async fn sign_out(&self) {}
    }

    #[derive(Default)]
    struct MemoryClipboard(Mutex<Option<String>>);

    impl Clipboard for MemoryClipboard {
        fn write_text(&self, text: &str) -> io::Result<()> {
            *self.0.lock().unwrap() = Some(text.to_string());
            Ok(())
        }
    }

    struct BrokenClipboard;

    impl Clipboard for BrokenClipboard {
        fn write_text(&self, _text: &str) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::Unsupported, "no clipboard"))
        }
    }

    fn page() -> SettingsPage {
        let origin = Url::parse("https://metalhead.icp0.io/settings?tab=1").unwrap();
        SettingsPage::new(AppState::default(), Arc::new(NoAuth), origin)
    }

    #[test]
    fn test_links() {
        let page = page();
        assert_eq!(page.app_link(), "https://metalhead.icp0.io");
        assert_eq!(
            page.delete_account_url(),
            "https://metalhead.icp0.io/delete-account"
        );
    }

    #[test]
    fn test_copy_link() {
        let page = page();
        let clipboard = MemoryClipboard::default();
        assert!(page.copy_app_link(&clipboard));
        assert_eq!(
            clipboard.0.lock().unwrap().as_deref(),
            Some("https://metalhead.icp0.io")
        );
        assert_eq!(
            page.state.notifier.messages(),
            vec!["App link copied to clipboard"]
        );
    }

    #[test]
    fn test_copy_failure_shows_manual_copy() {
        let page = page();
        assert!(!page.copy_delete_account_url(&BrokenClipboard));
        assert!(page.show_delete_url_copy());
        assert!(!page.show_manual_copy());
        assert_eq!(
            page.state.notifier.messages(),
            vec!["Failed to copy URL automatically"]
        );
    }

    #[tokio::test]
    async fn test_sign_out_clears_cache() {
        let alice = Principal::from_text("alice").unwrap();
        let backend = Arc::new(MemoryBackend::new(alice));
        let state = AppState::with_backend(ClientConfig::default(), backend.clone());
        state.data.feed().await.unwrap();

        let page = SettingsPage::new(
            state.clone(),
            Arc::new(NoAuth),
            Url::parse("https://metalhead.icp0.io/").unwrap(),
        );
        page.sign_out().await;
        assert_eq!(state.notifier.messages(), vec!["Signed out successfully"]);

        state.data.feed().await.unwrap();
        assert_eq!(backend.calls("get_feed"), 2);
    }

    #[test]
    fn test_build_label() {
        let info = BuildInfo {
            version: "0.1.0".into(),
            timestamp: Utc.with_ymd_and_hms(2026, 3, 9, 14, 5, 0).unwrap(),
        };
        assert_eq!(info.label(), "v0.1.0 (Mar 9, 2026, 02:05 PM)");
    }
}
