//! Application gate: decides which top-level view to show.
//!
//! The decision itself is [`resolve_view`], a pure function of a [`Gate`]
//! snapshot. [`Gate::observe`] builds that snapshot from the live session.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use metalhead_shared::constants::DELETE_ACCOUNT_PATH;
use metalhead_shared::Principal;
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use super::advisory::CacheAdvisory;
use super::lock;
use super::network_status::NetworkStatusIndicator;
use crate::device::{is_identity_return_url, InAppBrowser};
use crate::error::ClientError;
use crate::notify::Notifier;
use crate::state::AppState;

pub const HOME_PATH: &str = "/";

const SIGN_IN_RETRY_DELAY: Duration = Duration::from_millis(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Public account deletion page, shown regardless of sign-in state.
    DeleteAccount,
    App,
}

impl Route {
    /// Exact match only; `/delete-account/extra` is not the deletion page.
    pub fn from_path(path: &str) -> Self {
        let trailing = format!("{DELETE_ACCOUNT_PATH}/");
        if path == DELETE_ACCOUNT_PATH || path == trailing {
            Route::DeleteAccount
        } else {
            Route::App
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("User is already authenticated")]
    AlreadyAuthenticated,

    #[error("{0}")]
    Failed(String),
}

/// Host hook onto the identity provider.
#[async_trait]
pub trait AuthSession: Send + Sync {
    /// The signed-in principal, if any.
    fn principal(&self) -> Option<Principal>;

    /// True while a stored identity is still being restored.
    fn is_initializing(&self) -> bool {
        false
    }

    async fn sign_in(&self) -> Result<(), AuthError>;

    async fn sign_out(&self);
}

/// Start sign-in. A stale identity left over from an earlier session is
/// cleared and sign-in is tried once more after a short pause.
pub async fn sign_in(auth: &dyn AuthSession, notifier: &Notifier) -> bool {
    match auth.sign_in().await {
        Ok(()) => true,
        Err(AuthError::AlreadyAuthenticated) => {
            debug!("Stale identity, clearing before retrying sign-in");
            auth.sign_out().await;
            tokio::time::sleep(SIGN_IN_RETRY_DELAY).await;
            match auth.sign_in().await {
                Ok(()) => true,
                Err(err) => {
                    warn!(error = %err, "Sign-in retry failed");
                    false
                }
            }
        }
        Err(err) => {
            warn!(error = %err, "Sign-in failed");
            notifier.error("Failed to sign in. Please try again.");
            false
        }
    }
}

/// Where the caller's profile fetch stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileStatus {
    Loading,
    Present,
    Missing,
    /// The fetch failed; the shell is shown anyway.
    Failed,
}

/// Everything the gate looks at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gate {
    pub route: Route,
    pub in_app_browser: Option<InAppBrowser>,
    pub identity_return: bool,
    pub initializing: bool,
    pub signed_in: bool,
    pub profile: ProfileStatus,
}

impl Gate {
    /// Snapshot the session for the page at `url`. The caller's profile is
    /// only fetched when it can matter.
    pub async fn observe(state: &AppState, auth: &dyn AuthSession, url: &Url) -> Self {
        let route = Route::from_path(url.path());
        let initializing = auth.is_initializing();
        let signed_in = auth.principal().is_some();

        let profile = if route == Route::App && !initializing && signed_in {
            match state.data.caller_profile().await {
                Ok(Some(_)) => ProfileStatus::Present,
                Ok(None) => ProfileStatus::Missing,
                Err(ClientError::ActorUnavailable | ClientError::Superseded) => {
                    ProfileStatus::Loading
                }
                Err(err) => {
                    warn!(error = %err, "Caller profile failed to load");
                    ProfileStatus::Failed
                }
            }
        } else {
            ProfileStatus::Loading
        };

        Self {
            route,
            in_app_browser: state.in_app_browser(),
            identity_return: is_identity_return_url(url.as_str()),
            initializing,
            signed_in,
            profile,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    InAppBrowserNotice(InAppBrowser),
    DeleteAccount,
    Initializing,
    Landing,
    LoadingProfile,
    AgeVerification,
    Shell,
}

pub fn resolve_view(gate: &Gate) -> View {
    if gate.route == Route::DeleteAccount {
        return View::DeleteAccount;
    }
    if let Some(browser) = gate.in_app_browser {
        if !gate.identity_return {
            return View::InAppBrowserNotice(browser);
        }
    }
    if gate.initializing {
        return View::Initializing;
    }
    if !gate.signed_in {
        return View::Landing;
    }
    match gate.profile {
        ProfileStatus::Loading => View::LoadingProfile,
        ProfileStatus::Missing => View::AgeVerification,
        ProfileStatus::Present | ProfileStatus::Failed => View::Shell,
    }
}

impl View {
    /// Text for the two spinner views.
    pub fn loading_text(self) -> Option<&'static str> {
        match self {
            View::Initializing => Some("Loading..."),
            View::LoadingProfile => Some("Loading your profile..."),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShellPage {
    #[default]
    Feed,
    Friends,
    Profile,
    Settings,
}

impl ShellPage {
    pub const ALL: [ShellPage; 4] = [
        ShellPage::Feed,
        ShellPage::Friends,
        ShellPage::Profile,
        ShellPage::Settings,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ShellPage::Feed => "Feed",
            ShellPage::Friends => "Friends",
            ShellPage::Profile => "Profile",
            ShellPage::Settings => "Settings",
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Nav {
    current: ShellPage,
    menu_open: bool,
}

/// Signed-in layout: page navigation plus the connection advisory.
#[derive(Clone)]
pub struct AppShell {
    nav: Arc<Mutex<Nav>>,
    advisory: CacheAdvisory,
    network: NetworkStatusIndicator,
}

impl AppShell {
    pub fn new(state: AppState) -> Self {
        Self {
            nav: Arc::new(Mutex::new(Nav::default())),
            advisory: CacheAdvisory::new(state.clone()),
            network: NetworkStatusIndicator::new(state),
        }
    }

    pub fn current(&self) -> ShellPage {
        lock(&self.nav).current
    }

    pub fn is_menu_open(&self) -> bool {
        lock(&self.nav).menu_open
    }

    pub fn toggle_menu(&self) {
        let mut nav = lock(&self.nav);
        nav.menu_open = !nav.menu_open;
    }

    /// Switch page; the mobile menu closes behind it.
    pub fn navigate(&self, page: ShellPage) {
        let mut nav = lock(&self.nav);
        nav.current = page;
        nav.menu_open = false;
        info!(page = page.label(), "Navigated");
    }

    pub fn advisory(&self) -> &CacheAdvisory {
        &self.advisory
    }

    pub fn network_status(&self) -> &NetworkStatusIndicator {
        &self.network
    }
}
