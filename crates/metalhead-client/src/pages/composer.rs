use std::sync::{Arc, Mutex};

use metalhead_shared::constants::MAX_POST_LENGTH;
use metalhead_shared::validation::validate_post_content;
use metalhead_shared::PostId;

use super::{lock, toast_failure, Pending};
use crate::error::Result;
use crate::state::AppState;

pub const PLACEHOLDER: &str = "What's on your mind? Speak your truth...";

#[derive(Clone)]
pub struct PostComposer {
    state: AppState,
    content: Arc<Mutex<String>>,
    pending: Pending,
}

impl PostComposer {
    pub fn new(state: AppState) -> Self {
        Self {
            state,
            content: Arc::new(Mutex::new(String::new())),
            pending: Pending::default(),
        }
    }

    pub fn set_content(&self, text: impl Into<String>) {
        *lock(&self.content) = text.into();
    }

    pub fn content(&self) -> String {
        lock(&self.content).clone()
    }

    /// `"n / 500"`.
    pub fn counter(&self) -> String {
        format!("{} / {}", lock(&self.content).chars().count(), MAX_POST_LENGTH)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_pending()
    }

    pub fn can_submit(&self) -> bool {
        !self.is_pending() && !lock(&self.content).trim().is_empty()
    }

    /// Validate and publish the post. Invalid content never reaches the
    /// backend.
    pub async fn submit(&self) -> Result<PostId> {
        let content = self.content();
        let text = match validate_post_content(&content) {
            Ok(text) => text.to_string(),
            Err(e) => {
                self.state.notifier.error(e.to_string());
                return Err(e.into());
            }
        };

        let _pending = self.pending.start();
        match self.state.data.create_post(text).await {
            Ok(id) => {
                lock(&self.content).clear();
                self.state.notifier.success("Post created!");
                Ok(id)
            }
            Err(err) => {
                toast_failure(&self.state.notifier, &err, "Failed to create post");
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::error::ClientError;
    use crate::fake::MemoryBackend;
    use metalhead_shared::{Principal, UserProfile, ValidationError};

    fn setup() -> (Arc<MemoryBackend>, PostComposer) {
        let backend = Arc::new(MemoryBackend::new(Principal::from_text("alice").unwrap()));
        backend.insert_profile(
            Principal::from_text("alice").unwrap(),
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
        let state = AppState::with_backend(ClientConfig::default(), backend.clone());
        (backend, PostComposer::new(state))
    }

    #[tokio::test]
    async fn test_empty_post_rejected_locally() {
        let (backend, composer) = setup();
        composer.set_content("   \n ");

        assert!(!composer.can_submit());
        let err = composer.submit().await.unwrap_err();
        assert_eq!(err, ClientError::Validation(ValidationError::PostEmpty));
        assert_eq!(backend.total_calls(), 0);
        assert_eq!(composer.state.notifier.messages(), vec!["Post cannot be empty"]);
    }

    #[tokio::test]
    async fn test_submit_trims_and_clears() {
        let (backend, composer) = setup();
        composer.set_content("  Doom riffs only  ");
        assert_eq!(composer.counter(), "19 / 500");

        composer.submit().await.unwrap();

        assert_eq!(composer.content(), "");
        assert_eq!(composer.state.notifier.messages(), vec!["Post created!"]);
        let feed = composer.state.data.feed().await.unwrap();
        assert_eq!(feed[0].content, "Doom riffs only");
        assert_eq!(backend.calls("create_post"), 1);
    }

    #[tokio::test]
    async fn test_backend_rejection_is_toasted() {
        let (backend, composer) = setup();
        backend.fail_next(crate::error::RemoteError::legacy("Rate limit exceeded"));
        composer.set_content("hello");

        assert!(composer.submit().await.is_err());
        assert_eq!(composer.content(), "hello");
        assert_eq!(
            composer.state.notifier.messages(),
            vec!["Too many requests. Please wait a moment and try again."]
        );
    }
}
