//! Profile editor for the signed-in user.

use std::sync::{Arc, Mutex};

use metalhead_shared::validation::{parse_favorite_bands, validate_display_name};
use metalhead_shared::{Genre, UserProfile};

use super::{lock, toast_failure, Pending};
use crate::error::Result;
use crate::state::AppState;

/// What happened when the user pressed save.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved,
    /// The band list would go from non-empty to empty; call
    /// [`ProfileEditor::confirm_clear_bands`] to proceed.
    ConfirmClearBands { band_count: usize },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileForm {
    pub display_name: String,
    pub display_name_error: Option<String>,
    pub bio: String,
    pub location: String,
    /// Genre keys, in the order they were toggled on.
    pub selected_genres: Vec<String>,
    pub favorite_bands: String,
    initial_favorite_bands: String,
    avatar_url: Option<String>,
}

#[derive(Clone)]
pub struct ProfileEditor {
    state: AppState,
    form: Arc<Mutex<ProfileForm>>,
    pending: Pending,
}

impl ProfileEditor {
    pub fn new(state: AppState) -> Self {
        Self {
            state,
            form: Arc::new(Mutex::new(ProfileForm::default())),
            pending: Pending::default(),
        }
    }

    /// Fetch the caller's profile and fill the form from it.
    pub async fn load(&self) -> Result<()> {
        if let Some(profile) = self.state.data.caller_profile().await? {
            self.fill(&profile);
        }
        Ok(())
    }

    pub fn fill(&self, profile: &UserProfile) {
        let bands = profile.favorite_bands.join(", ");
        *lock(&self.form) = ProfileForm {
            display_name: profile.display_name.clone(),
            display_name_error: None,
            bio: profile.bio.clone(),
            location: profile.location.clone().unwrap_or_default(),
            selected_genres: profile
                .favorite_genres
                .iter()
                .map(|g| g.key().to_string())
                .collect(),
            favorite_bands: bands.clone(),
            initial_favorite_bands: bands,
            avatar_url: profile.avatar_url.clone(),
        };
    }

    pub fn form(&self) -> ProfileForm {
        lock(&self.form).clone()
    }

    /// Update the display name and re-validate it as the user types.
    pub fn set_display_name(&self, value: impl Into<String>) {
        let mut form = lock(&self.form);
        form.display_name = value.into();
        form.display_name_error = validate_display_name(&form.display_name)
            .err()
            .map(|e| e.to_string());
    }

    pub fn set_bio(&self, value: impl Into<String>) {
        lock(&self.form).bio = value.into();
    }

    pub fn set_location(&self, value: impl Into<String>) {
        lock(&self.form).location = value.into();
    }

    pub fn set_favorite_bands(&self, value: impl Into<String>) {
        lock(&self.form).favorite_bands = value.into();
    }

    pub fn toggle_genre(&self, key: &str) {
        let mut form = lock(&self.form);
        if let Some(pos) = form.selected_genres.iter().position(|g| g == key) {
            form.selected_genres.remove(pos);
        } else {
            form.selected_genres.push(key.to_string());
        }
    }

    pub fn is_genre_selected(&self, key: &str) -> bool {
        lock(&self.form).selected_genres.iter().any(|g| g == key)
    }

    /// Bands currently saved, as shown in the clear-bands confirmation.
    pub fn saved_band_count(&self) -> usize {
        parse_favorite_bands(&lock(&self.form).initial_favorite_bands).len()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_pending()
    }

    pub fn can_save(&self) -> bool {
        !self.is_pending() && lock(&self.form).display_name_error.is_none()
    }

    pub async fn save(&self) -> Result<SaveOutcome> {
        let (bands, had_bands) = {
            let mut form = lock(&self.form);
            if let Err(e) = validate_display_name(&form.display_name) {
                form.display_name_error = Some(e.to_string());
                return Err(e.into());
            }
            (
                parse_favorite_bands(&form.favorite_bands),
                !form.initial_favorite_bands.trim().is_empty(),
            )
        };

        if had_bands && bands.is_empty() {
            return Ok(SaveOutcome::ConfirmClearBands {
                band_count: self.saved_band_count(),
            });
        }

        self.perform_save(bands).await?;
        Ok(SaveOutcome::Saved)
    }

    /// Save after the user agreed to remove every favorite band.
    pub async fn confirm_clear_bands(&self) -> Result<()> {
        self.perform_save(Vec::new()).await
    }

    async fn perform_save(&self, bands: Vec<String>) -> Result<()> {
        let (profile, submitted_bands) = {
            let form = lock(&self.form);
            let profile = UserProfile {
                display_name: form.display_name.clone(),
                bio: form.bio.clone(),
                location: (!form.location.is_empty()).then(|| form.location.clone()),
                favorite_genres: form
                    .selected_genres
                    .iter()
                    .filter_map(|key| Genre::from_key(key))
                    .collect(),
                favorite_bands: bands,
                avatar_url: form.avatar_url.clone(),
                is_age_verified: true,
            };
            (profile, form.favorite_bands.clone())
        };

        let _pending = self.pending.start();
        match self.state.data.update_profile(profile).await {
            Ok(()) => {
                lock(&self.form).initial_favorite_bands = submitted_bands;
                self.state.notifier.success("Profile updated successfully");
                Ok(())
            }
            Err(err) => {
                toast_failure(&self.state.notifier, &err, "Failed to update profile");
                Err(err)
            }
        }
    }
}

/// Text of the clear-bands confirmation dialog.
pub fn clear_bands_warning(band_count: usize) -> String {
    let plural = if band_count == 1 { "" } else { "s" };
    format!(
        "You currently have {band_count} band{plural} saved. If you continue, all of your favorite bands will be removed from your profile. This action cannot be undone."
    )
}
