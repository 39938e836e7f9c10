//! Stand-alone account deletion page, reachable without going through the
//! app shell.

use std::sync::{Arc, Mutex};

use metalhead_shared::constants::SUPPORT_EMAIL;
use tracing::info;

use super::app::{sign_in, AuthSession, HOME_PATH};
use super::{lock, toast_failure, Pending};
use crate::error::Result;
use crate::state::AppState;

/// What the deletion removes, as listed on the page.
pub const DELETED_DATA: [&str; 5] = [
    "Your profile information (display name, bio, avatar)",
    "All posts you've created",
    "Your friend connections and friend requests",
    "Your block list",
    "All reports you've submitted",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteStage {
    /// No identity; the page only offers sign-in.
    SignInRequired,
    Ready,
    /// The user pressed delete and must confirm.
    Confirming,
}

#[derive(Clone)]
pub struct DeleteAccountPage {
    state: AppState,
    auth: Arc<dyn AuthSession>,
    confirming: Arc<Mutex<bool>>,
    deleting: Pending,
}

impl DeleteAccountPage {
    pub fn new(state: AppState, auth: Arc<dyn AuthSession>) -> Self {
        Self {
            state,
            auth,
            confirming: Arc::new(Mutex::new(false)),
            deleting: Pending::default(),
        }
    }

    pub fn stage(&self) -> DeleteStage {
        if self.auth.principal().is_none() {
            DeleteStage::SignInRequired
        } else if *lock(&self.confirming) {
            DeleteStage::Confirming
        } else {
            DeleteStage::Ready
        }
    }

    pub fn support_email(&self) -> &'static str {
        SUPPORT_EMAIL
    }

    pub fn is_deleting(&self) -> bool {
        self.deleting.is_pending()
    }

    pub async fn sign_in(&self) -> bool {
        sign_in(self.auth.as_ref(), &self.state.notifier).await
    }

    pub fn request_delete(&self) {
        if self.auth.principal().is_some() {
            *lock(&self.confirming) = true;
        }
    }

    pub fn cancel(&self) {
        *lock(&self.confirming) = false;
    }

    /// Delete the account, sign out and return the path to navigate to.
    pub async fn confirm_delete(&self) -> Result<&'static str> {
        let result = {
            let _pending = self.deleting.start();
            self.state.data.delete_own_account().await
        };
        *lock(&self.confirming) = false;

        match result {
            Ok(()) => {
                self.state.notifier.success("Your account has been deleted");
                self.auth.sign_out().await;
                self.state.cache.clear();
                info!("Signed out after account deletion");
                Ok(HOME_PATH)
            }
            Err(err) => {
                toast_failure(
                    &self.state.notifier,
                    &err,
                    "Failed to delete account. Please try again.",
                );
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Backend;
    use crate::pages::app::AuthError;
    use crate::config::ClientConfig;
    use crate::error::RemoteError;
    use crate::fake::MemoryBackend;
    use async_trait::async_trait;
    use metalhead_shared::{Principal, UserProfile};
    use std::sync::atomic::{AtomicBool, Ordering};

    struct FakeAuth {
        principal: Mutex<Option<Principal>>,
        signed_out: AtomicBool,
    }

    impl FakeAuth {
        fn signed_in(text: &str) -> Arc<Self> {
            Arc::new(Self {
                principal: Mutex::new(Some(Principal::from_text(text).unwrap())),
                signed_out: AtomicBool::new(false),
            })
        }
    }

    #[async_trait]
    impl AuthSession for FakeAuth {
        fn principal(&self) -> Option<Principal> {
            self.principal.lock().unwrap().clone()
        }

        async fn sign_in(&self) -> std::result::Result<(), AuthError> {
            Ok(())
        }

        async fn sign_out(&self) {
            *self.principal.lock().unwrap() = None;
            self.signed_out.store(true, Ordering::SeqCst);
        }
    }

    fn setup() -> (Arc<MemoryBackend>, Arc<FakeAuth>, DeleteAccountPage) {
        let alice = Principal::from_text("alice").unwrap();
        let backend = Arc::new(MemoryBackend::new(alice.clone()));
        backend.insert_profile(
            alice,
            UserProfile {
                display_name: "alice-01".into(),
                bio: String::new(),
                favorite_genres: Vec::new(),
                favorite_bands: Vec::new(),
                is_age_verified: true,
                avatar_url: None,
                location: None,
            },
        );
        let auth = FakeAuth::signed_in("alice");
        let state = AppState::with_backend(ClientConfig::default(), backend.clone());
        let page = DeleteAccountPage::new(state, auth.clone());
        (backend, auth, page)
    }

    #[tokio::test]
    async fn test_stages() {
        let (_backend, auth, page) = setup();
        assert_eq!(page.stage(), DeleteStage::Ready);
        page.request_delete();
        assert_eq!(page.stage(), DeleteStage::Confirming);
        page.cancel();
        assert_eq!(page.stage(), DeleteStage::Ready);

        auth.sign_out().await;
        assert_eq!(page.stage(), DeleteStage::SignInRequired);
        page.request_delete();
        assert_eq!(page.stage(), DeleteStage::SignInRequired);
        assert!(page.sign_in().await);
    }

    #[tokio::test]
    async fn test_confirm_deletes_and_signs_out() {
        let (backend, auth, page) = setup();
        page.request_delete();

        assert_eq!(page.confirm_delete().await.unwrap(), "/");
        assert!(auth.signed_out.load(Ordering::SeqCst));
        assert_eq!(
            page.state.notifier.messages(),
            vec!["Your account has been deleted"]
        );
        assert!(backend.get_caller_user_profile().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_failure_resets_confirmation() {
        let (backend, auth, page) = setup();
        backend.fail_next(RemoteError::legacy("   "));
        page.request_delete();

        page.confirm_delete().await.unwrap_err();
        assert_eq!(page.stage(), DeleteStage::Ready);
        assert!(!auth.signed_out.load(Ordering::SeqCst));
        assert_eq!(page.state.notifier.messages().len(), 1);
    }
}
