//! Home feed: the composer followed by every visible post.

use std::sync::{Arc, Mutex};

use futures::future::join;
use metalhead_shared::Principal;
use tracing::warn;

use super::composer::PostComposer;
use super::lock;
use super::post_card::PostCard;
use crate::error::Result;
use crate::state::AppState;

pub const EMPTY_FEED: &str = "No posts yet. Be the first to share something!";

#[derive(Clone)]
pub struct FeedPage {
    state: AppState,
    viewer: Option<Principal>,
    composer: PostComposer,
    cards: Arc<Mutex<Vec<PostCard>>>,
}

impl FeedPage {
    pub fn new(state: AppState, viewer: Option<Principal>) -> Self {
        Self {
            composer: PostComposer::new(state.clone()),
            state,
            viewer,
            cards: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn composer(&self) -> &PostComposer {
        &self.composer
    }

    pub fn cards(&self) -> Vec<PostCard> {
        lock(&self.cards).clone()
    }

    pub fn empty_text(&self) -> Option<&'static str> {
        lock(&self.cards).is_empty().then_some(EMPTY_FEED)
    }

    /// Fetch the feed and the viewer's block list together. The block list
    /// only decides which cards offer "unblock", so losing it is not fatal.
    pub async fn load(&self) -> Result<Vec<PostCard>> {
        let data = &self.state.data;
        let (posts, blocked) = join(data.feed(), data.blocked_users()).await;
        let posts = posts?;
        let blocked = blocked.unwrap_or_else(|err| {
            warn!(error = %err, "Block list unavailable for feed");
            Vec::new()
        });

        let cards: Vec<PostCard> = posts
            .into_iter()
            .map(|post| PostCard::new(self.state.clone(), post, self.viewer.clone(), &blocked))
            .collect();
        *lock(&self.cards) = cards.clone();
        Ok(cards)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::QueryFamily;
    use crate::config::ClientConfig;
    use crate::error::RemoteError;
    use crate::fake::MemoryBackend;
    use metalhead_shared::UserProfile;
    use std::time::Duration;

    fn principal(text: &str) -> Principal {
        Principal::from_text(text).unwrap()
    }

    fn profile(name: &str) -> UserProfile {
        UserProfile {
            display_name: name.into(),
            bio: String::new(),
            favorite_genres: Vec::new(),
            favorite_bands: Vec::new(),
            is_age_verified: true,
            avatar_url: None,
            location: None,
        }
    }

    #[tokio::test]
    async fn test_empty_feed() {
        let backend = Arc::new(MemoryBackend::new(principal("alice")));
        let state = AppState::with_backend(ClientConfig::default(), backend);
        let page = FeedPage::new(state, Some(principal("alice")));

        assert!(page.load().await.unwrap().is_empty());
        assert_eq!(page.empty_text(), Some(EMPTY_FEED));
    }

    #[tokio::test]
    async fn test_composer_post_shows_up() {
        let backend = Arc::new(MemoryBackend::new(principal("alice")));
        backend.insert_profile(principal("alice"), profile("alice-01"));
        let state = AppState::with_backend(ClientConfig::default(), backend);
        let page = FeedPage::new(state, Some(principal("alice")));
        page.load().await.unwrap();

        page.composer().set_content("  First riff  ");
        page.composer().submit().await.unwrap();

        let cards = page.load().await.unwrap();
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].post().content, "First riff");
        assert!(cards[0].is_own_post());
        assert_eq!(page.empty_text(), None);
    }

    #[tokio::test]
    async fn test_block_list_failure_is_tolerated() {
        let backend = Arc::new(MemoryBackend::new(principal("alice")));
        backend.insert_profile(principal("alice"), profile("alice-01"));
        let config = ClientConfig {
            stale_time: Duration::from_secs(60),
            ..ClientConfig::default()
        };
        let state = AppState::with_backend(config, backend.clone());
        state.data.create_post("hello".into()).await.unwrap();
        let page = FeedPage::new(state.clone(), Some(principal("alice")));
        page.load().await.unwrap();

        // The feed is still fresh, so only the block list is refetched, and
        // it fails.
        state.cache.invalidate(QueryFamily::BlockedUsers);
        backend.fail_next(RemoteError::legacy("boom"));
        let cards = page.load().await.unwrap();
        assert_eq!(cards.len(), 1);
        assert!(!cards[0].is_author_blocked());
        assert_eq!(backend.calls("get_blocked_users"), 2);
    }

    #[tokio::test]
    async fn test_feed_failure_is_returned() {
        let backend = Arc::new(MemoryBackend::new(principal("alice")));
        let state = AppState::with_backend(ClientConfig::default(), backend.clone());
        backend.fail_next(RemoteError::legacy("boom"));
        backend.fail_next(RemoteError::legacy("boom"));

        let page = FeedPage::new(state, Some(principal("alice")));
        assert!(page.load().await.is_err());
    }
}
