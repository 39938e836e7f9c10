use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{
    MAX_DISPLAY_NAME_LENGTH, MAX_POST_LENGTH, MAX_REPORT_DETAILS_LENGTH, MINIMUM_AGE,
    MIN_DISPLAY_NAME_LENGTH,
};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PrincipalError {
    #[error("Principal text is empty")]
    Empty,

    #[error("Principal contains invalid character: '{0}'")]
    InvalidCharacter(char),
}

/// Client-side form validation failures. `Display` is the user-facing text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please enter a display name")]
    DisplayNameMissing,

    #[error("Display name must be at least {} characters", MIN_DISPLAY_NAME_LENGTH)]
    DisplayNameTooShort,

    #[error("Display name must be no more than {} characters", MAX_DISPLAY_NAME_LENGTH)]
    DisplayNameTooLong,

    #[error(
        "Display name contains invalid character: '{0}'. Only letters, numbers, and hyphens are allowed"
    )]
    DisplayNameInvalidCharacter(char),

    #[error("You must confirm you are {} or older", MINIMUM_AGE)]
    AgeNotConfirmed,

    #[error("Post cannot be empty")]
    PostEmpty,

    #[error("Post is too long (max {} characters)", MAX_POST_LENGTH)]
    PostTooLong,

    #[error("Please select a reason")]
    ReportReasonMissing,

    #[error("Unknown report reason: {0}")]
    ReportReasonUnknown(String),

    #[error("Details are too long (max {} characters)", MAX_REPORT_DETAILS_LENGTH)]
    ReportDetailsTooLong,
}

/// Structured error kind carried by the backend contract.
///
/// Backends that predate this enum only send text; the client then falls
/// back to matching the message (see `metalhead_client::normalize`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "camelCase")]
pub enum ErrorKind {
    RateLimited,
    Blocked(BlockedScope),
    Validation(ValidationIssue),
    Unauthorized,
    AgeVerificationRequired,
    ProfileAlreadyExists,
    PostAlreadyLiked,
    NotFound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BlockedScope {
    Interaction,
    ViewProfile,
    ViewPosts,
    ViewFriends,
    LikePost,
    SendFriendRequest,
    RespondToFriendRequest,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ValidationIssue {
    DisplayNameLength,
    DisplayNameInvalidCharacter(Option<char>),
    DisplayNameTooLong,
    DisplayNameEmpty,
    BioTooLong,
    ContentTooLong,
    ContentEmpty,
    TooManyGenres,
    TooManyBands,
    GenreTextTooLong,
    BandNameTooLong,
    LocationTooLong,
    AvatarUrlTooLong,
    ReasonTooLong,
    ReasonEmpty,
}

impl ErrorKind {
    /// Message shown to the user for this kind of failure.
    pub fn user_message(&self) -> String {
        match self {
            ErrorKind::RateLimited => "Too many requests. Please wait a moment and try again.".into(),
            ErrorKind::Blocked(scope) => scope.user_message().into(),
            ErrorKind::Validation(issue) => issue.user_message(),
            ErrorKind::Unauthorized | ErrorKind::AgeVerificationRequired => {
                "You do not have permission to perform this action.".into()
            }
            ErrorKind::ProfileAlreadyExists => "Profile already exists.".into(),
            ErrorKind::PostAlreadyLiked => "You already liked this post.".into(),
            ErrorKind::NotFound => "The requested item was not found.".into(),
        }
    }

    /// Blocking and authorization failures hide content rather than fail
    /// the view that asked for it.
    pub fn hides_content(&self) -> bool {
        matches!(
            self,
            ErrorKind::Blocked(_) | ErrorKind::Unauthorized | ErrorKind::AgeVerificationRequired
        )
    }
}

impl BlockedScope {
    pub fn user_message(self) -> &'static str {
        match self {
            BlockedScope::Interaction => {
                "This action is not available because one of you has blocked the other."
            }
            BlockedScope::ViewProfile => "You cannot view this profile.",
            BlockedScope::ViewPosts => "You cannot view posts from this user.",
            BlockedScope::ViewFriends => "You cannot view this user's friends.",
            BlockedScope::LikePost => "You cannot like this post.",
            BlockedScope::SendFriendRequest => "You cannot send a friend request to this user.",
            BlockedScope::RespondToFriendRequest => "You cannot respond to this friend request.",
        }
    }
}

impl ValidationIssue {
    pub fn user_message(&self) -> String {
        match self {
            ValidationIssue::DisplayNameLength => format!(
                "Display name must be between {MIN_DISPLAY_NAME_LENGTH} and {MAX_DISPLAY_NAME_LENGTH} characters."
            ),
            ValidationIssue::DisplayNameInvalidCharacter(Some(c)) => format!(
                "Display name contains invalid character: '{c}'. Only letters, numbers, and hyphens are allowed."
            ),
            ValidationIssue::DisplayNameInvalidCharacter(None) => {
                "Display name contains invalid characters. Only letters, numbers, and hyphens are allowed.".into()
            }
            ValidationIssue::DisplayNameTooLong => format!(
                "Display name is too long. Please use a shorter name (max {MAX_DISPLAY_NAME_LENGTH} characters)."
            ),
            ValidationIssue::DisplayNameEmpty => "Display name is required.".into(),
            ValidationIssue::BioTooLong => "Bio is too long. Please shorten your bio.".into(),
            ValidationIssue::ContentTooLong => {
                "Post content is too long. Please shorten your message.".into()
            }
            ValidationIssue::ContentEmpty => "Post content cannot be empty.".into(),
            ValidationIssue::TooManyGenres => {
                "Too many favorite genres selected. Please select fewer genres.".into()
            }
            ValidationIssue::TooManyBands => {
                "Too many favorite bands listed. Please reduce the number.".into()
            }
            ValidationIssue::GenreTextTooLong => "Custom genre name is too long.".into(),
            ValidationIssue::BandNameTooLong => {
                "One or more band names are too long. Please shorten them.".into()
            }
            ValidationIssue::LocationTooLong => {
                "Location is too long. Please use a shorter location.".into()
            }
            ValidationIssue::AvatarUrlTooLong => "Avatar URL is too long.".into(),
            ValidationIssue::ReasonTooLong => {
                "Report reason is too long. Please be more concise.".into()
            }
            ValidationIssue::ReasonEmpty => "Report reason is required.".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_messages() {
        assert_eq!(
            ValidationError::DisplayNameTooShort.to_string(),
            "Display name must be at least 5 characters"
        );
        assert_eq!(
            ValidationError::PostTooLong.to_string(),
            "Post is too long (max 500 characters)"
        );
        assert_eq!(
            ValidationError::AgeNotConfirmed.to_string(),
            "You must confirm you are 21 or older"
        );
    }

    #[test]
    fn test_kind_messages() {
        assert_eq!(
            ErrorKind::Validation(ValidationIssue::DisplayNameInvalidCharacter(Some('!')))
                .user_message(),
            "Display name contains invalid character: '!'. Only letters, numbers, and hyphens are allowed."
        );
        assert!(ErrorKind::Blocked(BlockedScope::ViewProfile).hides_content());
        assert!(!ErrorKind::NotFound.hides_content());
    }

    #[test]
    fn test_kind_serde_shape() {
        let json = serde_json::to_string(&ErrorKind::Blocked(BlockedScope::LikePost)).unwrap();
        assert_eq!(json, r#"{"kind":"blocked","detail":"likePost"}"#);
        let back: ErrorKind = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ErrorKind::Blocked(BlockedScope::LikePost));
    }
}
