//! First-run form: pick a display name and confirm age.

use std::sync::{Arc, Mutex};

use metalhead_shared::constants::MAX_DISPLAY_NAME_LENGTH;
use metalhead_shared::validation::{display_name_rules, validate_display_name};
use metalhead_shared::{UserProfile, ValidationError};

use super::{lock, toast_failure, Pending};
use crate::error::{ClientError, Result};
use crate::state::AppState;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgeVerificationFields {
    pub display_name: String,
    pub age_confirmed: bool,
    pub display_name_error: Option<String>,
}

#[derive(Clone)]
pub struct AgeVerificationForm {
    state: AppState,
    fields: Arc<Mutex<AgeVerificationFields>>,
    pending: Pending,
}

impl AgeVerificationForm {
    pub fn new(state: AppState) -> Self {
        Self {
            state,
            fields: Arc::new(Mutex::new(AgeVerificationFields::default())),
            pending: Pending::default(),
        }
    }

    pub fn fields(&self) -> AgeVerificationFields {
        lock(&self.fields).clone()
    }

    /// Typing clears a previous error; the name is only validated on submit.
    pub fn set_display_name(&self, value: impl Into<String>) {
        let mut fields = lock(&self.fields);
        fields.display_name = value.into();
        if !fields.display_name.is_empty() {
            fields.display_name_error = None;
        }
    }

    pub fn set_age_confirmed(&self, confirmed: bool) {
        lock(&self.fields).age_confirmed = confirmed;
    }

    pub fn rules(&self) -> String {
        display_name_rules()
    }

    pub fn counter(&self) -> String {
        format!(
            "{} / {}",
            lock(&self.fields).display_name.chars().count(),
            MAX_DISPLAY_NAME_LENGTH
        )
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_pending()
    }

    pub fn can_submit(&self) -> bool {
        let fields = lock(&self.fields);
        let name = fields.display_name.trim();
        !self.pending.is_pending()
            && !name.is_empty()
            && validate_display_name(name).is_ok()
            && fields.age_confirmed
    }

    fn reject(&self, err: ValidationError, mark_field: bool) -> ClientError {
        if mark_field {
            lock(&self.fields).display_name_error = Some(err.to_string());
        }
        self.state.notifier.error(err.to_string());
        err.into()
    }

    pub async fn submit(&self) -> Result<()> {
        let (name, age_confirmed) = {
            let fields = lock(&self.fields);
            (fields.display_name.trim().to_string(), fields.age_confirmed)
        };

        if name.is_empty() {
            return Err(self.reject(ValidationError::DisplayNameMissing, true));
        }
        if let Err(e) = validate_display_name(&name) {
            return Err(self.reject(e, true));
        }
        if !age_confirmed {
            return Err(self.reject(ValidationError::AgeNotConfirmed, false));
        }

        let profile = UserProfile {
            display_name: name,
            bio: String::new(),
            favorite_genres: Vec::new(),
            favorite_bands: Vec::new(),
            is_age_verified: true,
            avatar_url: None,
            location: None,
        };

        let _pending = self.pending.start();
        match self.state.data.verify_age_and_create_profile(profile).await {
            Ok(()) => {
                self.state.notifier.success("Welcome to MetalHead!");
                Ok(())
            }
            Err(err) => {
                toast_failure(&self.state.notifier, &err, "Failed to create profile");
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::fake::MemoryBackend;
    use metalhead_shared::Principal;

    fn setup() -> (Arc<MemoryBackend>, AgeVerificationForm) {
        let backend = Arc::new(MemoryBackend::new(Principal::from_text("newbie").unwrap()));
        let state = AppState::with_backend(ClientConfig::default(), backend.clone());
        (backend, AgeVerificationForm::new(state))
    }

    #[tokio::test]
    async fn test_missing_name() {
        let (backend, form) = setup();
        form.set_age_confirmed(true);

        let err = form.submit().await.unwrap_err();
        assert_eq!(err, ClientError::Validation(ValidationError::DisplayNameMissing));
        assert_eq!(
            form.fields().display_name_error.as_deref(),
            Some("Please enter a display name")
        );
        assert_eq!(backend.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_age_must_be_confirmed() {
        let (backend, form) = setup();
        form.set_display_name("Riff-Lord");
        assert!(!form.can_submit());

        form.submit().await.unwrap_err();
        assert_eq!(
            form.state.notifier.messages(),
            vec!["You must confirm you are 21 or older"]
        );
        assert_eq!(backend.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_creates_profile() {
        let (_backend, form) = setup();
        form.set_display_name("  Riff-Lord ");
        form.set_age_confirmed(true);
        assert!(form.can_submit());

        form.submit().await.unwrap();

        let profile = form.state.data.caller_profile().await.unwrap().unwrap();
        assert_eq!(profile.display_name, "Riff-Lord");
        assert!(profile.is_age_verified);
        assert!(profile.favorite_bands.is_empty());
        assert_eq!(form.state.notifier.messages(), vec!["Welcome to MetalHead!"]);
    }

    #[tokio::test]
    async fn test_typing_clears_error() {
        let (_backend, form) = setup();
        form.set_display_name("x!");
        form.submit().await.unwrap_err();
        assert!(form.fields().display_name_error.is_some());

        form.set_display_name("x!y");
        assert!(form.fields().display_name_error.is_none());
    }
}
