//! Friends list and incoming friend requests.

use std::sync::{Arc, Mutex};

use futures::future::{join_all, try_join};
use metalhead_shared::{FriendRequest, Principal, Time, UserProfile};
use tracing::debug;

use super::{lock, toast_failure, Pending};
use crate::error::Result;
use crate::state::AppState;

pub const EMPTY_FRIENDS: &str = "No friends yet. Start connecting with the community!";

const MAX_CARD_GENRES: usize = 3;
const REQUEST_PREFIX_LEN: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FriendCard {
    pub principal: Principal,
    pub display_name: String,
    pub bio: String,
    /// At most three genre labels.
    pub genres: Vec<String>,
}

impl FriendCard {
    fn from_profile(principal: Principal, profile: UserProfile) -> Self {
        Self {
            principal,
            display_name: profile.display_name,
            bio: profile.bio,
            genres: profile
                .favorite_genres
                .iter()
                .take(MAX_CARD_GENRES)
                .map(|g| g.label().to_string())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestCard {
    pub from: Principal,
    /// Sender's display name, or a shortened principal when they have no
    /// visible profile.
    pub display_name: String,
    pub timestamp: Time,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FriendsView {
    pub friends: Vec<FriendCard>,
    pub requests: Vec<RequestCard>,
}

impl FriendsView {
    pub fn friend_count(&self) -> usize {
        self.friends.len()
    }

    pub fn request_count(&self) -> usize {
        self.requests.len()
    }

    pub fn empty_text(&self) -> Option<&'static str> {
        self.friends.is_empty().then_some(EMPTY_FRIENDS)
    }
}

#[derive(Clone)]
pub struct FriendsPage {
    state: AppState,
    viewer: Principal,
    view: Arc<Mutex<FriendsView>>,
    responding: Pending,
}

impl FriendsPage {
    pub fn new(state: AppState, viewer: Principal) -> Self {
        Self {
            state,
            viewer,
            view: Arc::new(Mutex::new(FriendsView::default())),
            responding: Pending::default(),
        }
    }

    pub fn view(&self) -> FriendsView {
        lock(&self.view).clone()
    }

    pub fn is_responding(&self) -> bool {
        self.responding.is_pending()
    }

    /// Fetch friends and pending requests, then resolve every profile.
    /// Friends whose profile is missing or hidden are left out.
    pub async fn load(&self) -> Result<FriendsView> {
        let data = &self.state.data;
        let (friends, requests) =
            try_join(data.friends(&self.viewer), data.pending_requests()).await?;

        let friend_profiles = join_all(friends.iter().map(|p| data.user_profile(p))).await;
        let friend_cards = friends
            .into_iter()
            .zip(friend_profiles)
            .filter_map(|(principal, profile)| match profile {
                Ok(Some(profile)) => Some(FriendCard::from_profile(principal, profile)),
                Ok(None) => None,
                Err(err) => {
                    debug!(friend = %principal, error = %err, "Skipping friend without profile");
                    None
                }
            })
            .collect();

        let sender_profiles =
            join_all(requests.iter().map(|r| data.user_profile(&r.from))).await;
        let request_cards = requests
            .into_iter()
            .zip(sender_profiles)
            .map(|(request, profile)| request_card(request, profile.ok().flatten()))
            .collect();

        let view = FriendsView {
            friends: friend_cards,
            requests: request_cards,
        };
        *lock(&self.view) = view.clone();
        Ok(view)
    }

    pub async fn respond(&self, from: Principal, accept: bool) -> Result<()> {
        let result = {
            let _pending = self.responding.start();
            self.state
                .data
                .respond_to_friend_request(from.clone(), accept)
                .await
        };
        match result {
            Ok(()) => {
                lock(&self.view).requests.retain(|r| r.from != from);
                self.state.notifier.success(if accept {
                    "Friend request accepted!"
                } else {
                    "Friend request declined"
                });
                Ok(())
            }
            Err(err) => {
                toast_failure(&self.state.notifier, &err, "Failed to respond to request");
                Err(err)
            }
        }
    }
}

fn request_card(request: FriendRequest, profile: Option<UserProfile>) -> RequestCard {
    let display_name = match profile {
        Some(profile) => profile.display_name,
        None => format!("{}...", request.from.short(REQUEST_PREFIX_LEN)),
    };
    RequestCard {
        from: request.from,
        display_name,
        timestamp: request.timestamp,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Backend;
    use crate::config::ClientConfig;
    use crate::fake::MemoryBackend;
    use metalhead_shared::Genre;
    use std::time::Duration;

    fn principal(text: &str) -> Principal {
        Principal::from_text(text).unwrap()
    }

    fn profile(name: &str, genres: Vec<Genre>) -> UserProfile {
        UserProfile {
            display_name: name.into(),
            bio: String::new(),
            favorite_genres: genres,
            favorite_bands: Vec::new(),
            is_age_verified: true,
            avatar_url: None,
            location: None,
        }
    }

    #[tokio::test]
    async fn test_load_builds_cards() {
        let backend = Arc::new(MemoryBackend::new(principal("bob")));
        backend.insert_profile(principal("alice"), profile("alice-01", vec![]));
        backend.insert_profile(
            principal("bob"),
            profile(
                "bob-the-drummer",
                vec![Genre::Metal, Genre::Punk, Genre::Hardcore, Genre::Grunge],
            ),
        );

        backend.insert_profile(principal("carol"), profile("carol-sings", vec![]));

        // Alice befriends Bob, then Carol asks Alice too.
        backend.set_caller(principal("bob"));
        backend.send_friend_request(principal("alice")).await.unwrap();
        backend.set_caller(principal("alice"));
        backend.respond_to_friend_request(principal("bob"), true).await.unwrap();
        backend.set_caller(principal("carol"));
        backend.send_friend_request(principal("alice")).await.unwrap();
        backend.set_caller(principal("alice"));

        let state = AppState::with_backend(ClientConfig::default(), backend.clone());
        let page = FriendsPage::new(state, principal("alice"));
        let view = page.load().await.unwrap();

        assert_eq!(view.friend_count(), 1);
        assert_eq!(view.friends[0].display_name, "bob-the-drummer");
        assert_eq!(view.friends[0].genres, vec!["Metal", "Punk", "Hardcore"]);
        assert_eq!(view.request_count(), 1);
        assert_eq!(view.requests[0].display_name, "carol-sings");
        assert_eq!(view.empty_text(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_profile_read_keeps_friend_card() {
        let backend = Arc::new(MemoryBackend::new(principal("bob")));
        backend.insert_profile(principal("alice"), profile("alice-01", vec![]));
        backend.insert_profile(principal("bob"), profile("bob-the-drummer", vec![]));
        backend.send_friend_request(principal("alice")).await.unwrap();
        backend.set_caller(principal("alice"));
        backend.respond_to_friend_request(principal("bob"), true).await.unwrap();

        // Friends and requests answer at once, Bob's profile takes a while.
        backend.delay_next(Duration::ZERO);
        backend.delay_next(Duration::ZERO);
        backend.delay_next(Duration::from_secs(2));

        let state = AppState::with_backend(ClientConfig::default(), backend.clone());
        let page = FriendsPage::new(state.clone(), principal("alice"));
        let loading = {
            let page = page.clone();
            tokio::spawn(async move { page.load().await })
        };
        tokio::time::sleep(Duration::from_millis(100)).await;

        let other_view = state.data.user_profile(&principal("bob")).await.unwrap();
        assert_eq!(
            other_view.map(|p| p.display_name).as_deref(),
            Some("bob-the-drummer")
        );

        let view = loading.await.unwrap().unwrap();
        assert_eq!(view.friend_count(), 1);
        assert_eq!(view.friends[0].display_name, "bob-the-drummer");
        assert_eq!(backend.calls("get_user_profile"), 1);
    }

    #[test]
    fn test_request_card_without_profile() {
        let request = FriendRequest {
            from: principal("strangerwithaverylongname"),
            to: principal("alice"),
            status: metalhead_shared::FriendRequestStatus::Pending,
            timestamp: Time(0),
        };
        let card = request_card(request, None);
        assert_eq!(card.display_name, "strangerwithaver...");
    }

    #[tokio::test]
    async fn test_respond_toasts_and_drops_request() {
        let backend = Arc::new(MemoryBackend::new(principal("carol")));
        backend.insert_profile(principal("carol"), profile("carol-sings", vec![]));
        backend.send_friend_request(principal("alice")).await.unwrap();
        backend.set_caller(principal("alice"));

        let state = AppState::with_backend(ClientConfig::default(), backend.clone());
        let page = FriendsPage::new(state.clone(), principal("alice"));
        page.load().await.unwrap();

        page.respond(principal("carol"), false).await.unwrap();
        assert_eq!(page.view().request_count(), 0);
        assert_eq!(state.notifier.messages(), vec!["Friend request declined"]);
        assert_eq!(page.view().empty_text(), Some(EMPTY_FRIENDS));
    }

    #[tokio::test]
    async fn test_respond_failure_is_toasted() {
        let backend = Arc::new(MemoryBackend::new(principal("alice")));
        let state = AppState::with_backend(ClientConfig::default(), backend);
        let page = FriendsPage::new(state.clone(), principal("alice"));

        page.respond(principal("nobody"), true).await.unwrap_err();
        assert_eq!(state.notifier.messages().len(), 1);
        assert!(!page.is_responding());
    }
}
