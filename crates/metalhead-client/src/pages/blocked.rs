//! Settings section listing blocked users.

use std::sync::{Arc, Mutex};

use futures::future::join_all;
use metalhead_shared::Principal;

use super::{lock, toast_failure, Pending};
use crate::error::Result;
use crate::state::AppState;

pub const EMPTY_BLOCKED: &str = "You haven't blocked anyone yet.";

const UNKNOWN_USER: &str = "Unknown User";
const PRINCIPAL_PREFIX_LEN: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockedRow {
    pub principal: Principal,
    pub display_name: String,
    pub short_principal: String,
}

#[derive(Clone)]
pub struct BlockedUsersPage {
    state: AppState,
    rows: Arc<Mutex<Vec<BlockedRow>>>,
    unblocking: Pending,
}

impl BlockedUsersPage {
    pub fn new(state: AppState) -> Self {
        Self {
            state,
            rows: Arc::new(Mutex::new(Vec::new())),
            unblocking: Pending::default(),
        }
    }

    pub fn rows(&self) -> Vec<BlockedRow> {
        lock(&self.rows).clone()
    }

    pub fn empty_text(&self) -> Option<&'static str> {
        lock(&self.rows).is_empty().then_some(EMPTY_BLOCKED)
    }

    pub fn is_unblocking(&self) -> bool {
        self.unblocking.is_pending()
    }

    pub async fn load(&self) -> Result<Vec<BlockedRow>> {
        let data = &self.state.data;
        let blocked = data.blocked_users().await?;
        let profiles = join_all(blocked.iter().map(|p| data.user_profile(p))).await;

        let rows: Vec<BlockedRow> = blocked
            .into_iter()
            .zip(profiles)
            .map(|(principal, profile)| BlockedRow {
                display_name: profile
                    .ok()
                    .flatten()
                    .map(|p| p.display_name)
                    .unwrap_or_else(|| UNKNOWN_USER.to_string()),
                short_principal: format!("{}...", principal.short(PRINCIPAL_PREFIX_LEN)),
                principal,
            })
            .collect();

        *lock(&self.rows) = rows.clone();
        Ok(rows)
    }

    pub async fn unblock(&self, user: Principal) -> Result<()> {
        let result = {
            let _pending = self.unblocking.start();
            self.state.data.unblock_user(user.clone()).await
        };
        match result {
            Ok(()) => {
                lock(&self.rows).retain(|row| row.principal != user);
                self.state.notifier.success("User unblocked");
                Ok(())
            }
            Err(err) => {
                toast_failure(&self.state.notifier, &err, "Failed to unblock user");
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Backend;
    use crate::config::ClientConfig;
    use crate::fake::MemoryBackend;

    fn principal(text: &str) -> Principal {
        Principal::from_text(text).unwrap()
    }

    #[tokio::test]
    async fn test_blocked_profiles_show_as_unknown() {
        let backend = Arc::new(MemoryBackend::new(principal("alice")));
        backend.block_user(principal("spammer-account-0001")).await.unwrap();
        let state = AppState::with_backend(ClientConfig::default(), backend);
        let page = BlockedUsersPage::new(state);

        let rows = page.load().await.unwrap();
        assert_eq!(rows.len(), 1);
        // The block itself hides the profile.
        assert_eq!(rows[0].display_name, "Unknown User");
        assert_eq!(rows[0].short_principal, "spammer-account-...");
        assert_eq!(page.empty_text(), None);
    }

    #[tokio::test]
    async fn test_unblock_removes_row() {
        let backend = Arc::new(MemoryBackend::new(principal("alice")));
        backend.block_user(principal("bob")).await.unwrap();
        let state = AppState::with_backend(ClientConfig::default(), backend);
        let page = BlockedUsersPage::new(state.clone());
        page.load().await.unwrap();

        page.unblock(principal("bob")).await.unwrap();
        assert!(page.rows().is_empty());
        assert_eq!(page.empty_text(), Some(EMPTY_BLOCKED));
        assert_eq!(state.notifier.messages(), vec!["User unblocked"]);
        assert!(state.data.blocked_users().await.unwrap().is_empty());
    }
}
