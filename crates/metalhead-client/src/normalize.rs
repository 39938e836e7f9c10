//! Turns whatever a failed call produced into a message fit for a toast.
//!
//! A structured [`ErrorKind`] from the backend always wins. Text-only
//! failures go through the ordered substring rules below; anything still
//! unrecognized is reduced to a single sanitized line.

use metalhead_shared::constants::{GENERIC_ERROR_MESSAGE, MAX_ERROR_MESSAGE_LENGTH};
use metalhead_shared::{BlockedScope, ErrorKind, ValidationIssue};
use serde_json::Value;

use crate::error::{NormalizedError, RemoteError};

/// The shapes a failure can arrive in.
#[derive(Debug, Clone, Copy)]
pub enum RawError<'a> {
    Error(&'a (dyn std::error::Error + 'a)),
    Text(&'a str),
    /// An error payload decoded from the wire, e.g. `{"message": "..."}`.
    Json(&'a Value),
    None,
}

impl<'a> From<&'a str> for RawError<'a> {
    fn from(text: &'a str) -> Self {
        RawError::Text(text)
    }
}

impl<'a> From<&'a Value> for RawError<'a> {
    fn from(value: &'a Value) -> Self {
        RawError::Json(value)
    }
}

fn extract_message(raw: RawError<'_>) -> String {
    match raw {
        RawError::Error(err) => err.to_string(),
        RawError::Text(text) => text.to_string(),
        RawError::Json(Value::Null) => String::new(),
        RawError::Json(Value::String(text)) => text.clone(),
        RawError::Json(value) => {
            for field in ["message", "error"] {
                if let Some(Value::String(text)) = value.get(field) {
                    return text.clone();
                }
            }
            value.to_string()
        }
        RawError::None => String::new(),
    }
}

const INVALID_CHAR_MARKER: &str = "Display name contains invalid character";

/// Substring rules, checked in order. More specific blocking messages come
/// before the generic ones so their scope is kept.
const RULES: &[(&str, ErrorKind)] = &[
    ("Rate limit exceeded", ErrorKind::RateLimited),
    ("too many requests", ErrorKind::RateLimited),
    ("Cannot view profile: user is blocked", ErrorKind::Blocked(BlockedScope::ViewProfile)),
    ("Cannot view posts: user is blocked", ErrorKind::Blocked(BlockedScope::ViewPosts)),
    ("Cannot view friends: user is blocked", ErrorKind::Blocked(BlockedScope::ViewFriends)),
    ("Cannot like post: user is blocked", ErrorKind::Blocked(BlockedScope::LikePost)),
    (
        "Cannot send friend request: user is blocked",
        ErrorKind::Blocked(BlockedScope::SendFriendRequest),
    ),
    (
        "Cannot respond to friend request: user is blocked",
        ErrorKind::Blocked(BlockedScope::RespondToFriendRequest),
    ),
    ("user is blocked", ErrorKind::Blocked(BlockedScope::Interaction)),
    ("Cannot interact", ErrorKind::Blocked(BlockedScope::Interaction)),
    (
        "Display name must be between",
        ErrorKind::Validation(ValidationIssue::DisplayNameLength),
    ),
    (
        INVALID_CHAR_MARKER,
        ErrorKind::Validation(ValidationIssue::DisplayNameInvalidCharacter(None)),
    ),
    (
        "Display name is too long",
        ErrorKind::Validation(ValidationIssue::DisplayNameTooLong),
    ),
    (
        "Display name cannot be empty",
        ErrorKind::Validation(ValidationIssue::DisplayNameEmpty),
    ),
    ("Bio is too long", ErrorKind::Validation(ValidationIssue::BioTooLong)),
    ("Content is too long", ErrorKind::Validation(ValidationIssue::ContentTooLong)),
    ("Content cannot be empty", ErrorKind::Validation(ValidationIssue::ContentEmpty)),
    ("Too many favorite genres", ErrorKind::Validation(ValidationIssue::TooManyGenres)),
    ("Too many favorite bands", ErrorKind::Validation(ValidationIssue::TooManyBands)),
    ("Genre text is too long", ErrorKind::Validation(ValidationIssue::GenreTextTooLong)),
    ("Band name is too long", ErrorKind::Validation(ValidationIssue::BandNameTooLong)),
    ("Location is too long", ErrorKind::Validation(ValidationIssue::LocationTooLong)),
    ("Avatar URL is too long", ErrorKind::Validation(ValidationIssue::AvatarUrlTooLong)),
    ("Reason is too long", ErrorKind::Validation(ValidationIssue::ReasonTooLong)),
    ("Reason cannot be empty", ErrorKind::Validation(ValidationIssue::ReasonEmpty)),
    ("Unauthorized", ErrorKind::Unauthorized),
    ("Age verification required", ErrorKind::AgeVerificationRequired),
    ("Profile already exists", ErrorKind::ProfileAlreadyExists),
    ("Post already liked", ErrorKind::PostAlreadyLiked),
    ("does not exist", ErrorKind::NotFound),
];

/// Classify a text-only failure.
pub fn classify_message(message: &str) -> Option<ErrorKind> {
    let (pattern, kind) = RULES.iter().find(|(pattern, _)| message.contains(pattern))?;
    if *pattern == INVALID_CHAR_MARKER {
        let pos = message.find(INVALID_CHAR_MARKER)?;
        let c = invalid_character(&message[pos..]);
        return Some(ErrorKind::Validation(
            ValidationIssue::DisplayNameInvalidCharacter(c),
        ));
    }
    Some(kind.clone())
}

/// Pull the character out of
/// `Display name contains invalid character: 'X'. Allowed characters: ...`.
fn invalid_character(message: &str) -> Option<char> {
    let rest = message.strip_prefix(INVALID_CHAR_MARKER)?.strip_prefix(": '")?;
    let end = rest.find("'. Allowed characters: ")?;
    let mut chars = rest[..end].chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c),
        _ => None,
    }
}

/// Strip a trailing ` at <location>` stack fragment.
fn strip_stack_fragment(line: &str) -> &str {
    // ASCII lowercasing keeps byte offsets intact.
    let lower = line.to_ascii_lowercase();
    let bytes = lower.as_bytes();
    let mut from = 0;
    while let Some(pos) = lower[from..].find("at") {
        let start = from + pos;
        let end = start + 2;
        let space_before = start > 0 && bytes[start - 1].is_ascii_whitespace();
        let space_after = end < bytes.len() && bytes[end].is_ascii_whitespace();
        if space_before && space_after {
            return &line[..start];
        }
        from = end;
    }
    line
}

/// First line only, no `Error:` prefix, no stack fragment.
pub fn sanitize_message(message: &str) -> String {
    let first_line = message.lines().next().unwrap_or_default();
    let without_prefix = match first_line.get(..6) {
        Some(prefix) if prefix.eq_ignore_ascii_case("error:") => &first_line[6..],
        _ => first_line,
    };
    strip_stack_fragment(without_prefix.trim_start()).trim().to_string()
}

/// Normalize an arbitrary failure.
pub fn normalize(raw: RawError<'_>) -> NormalizedError {
    normalize_message(&extract_message(raw))
}

fn normalize_message(message: &str) -> NormalizedError {
    if let Some(kind) = classify_message(message) {
        return NormalizedError {
            message: kind.user_message(),
            kind: Some(kind),
        };
    }

    let clean = sanitize_message(message);
    let len = clean.chars().count();
    let message = if len > 0 && len < MAX_ERROR_MESSAGE_LENGTH {
        clean
    } else {
        GENERIC_ERROR_MESSAGE.to_string()
    };

    NormalizedError {
        kind: None,
        message,
    }
}

/// Normalize the failure of a remote call, preferring the structured kind.
pub fn normalize_remote(err: &RemoteError) -> NormalizedError {
    match err.kind() {
        Some(kind) => NormalizedError {
            kind: Some(kind.clone()),
            message: kind.user_message(),
        },
        None => normalize_message(err.message()),
    }
}
