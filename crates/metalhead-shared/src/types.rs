use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::PrincipalError;

// Opaque user identity issued by the identity provider
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct Principal(String);

impl Principal {
    /// Parse the textual form of a principal.
    ///
    /// Only the outer shape is checked (non-empty, ASCII alphanumerics and
    /// dashes); the checksum belongs to the identity provider.
    pub fn from_text(text: &str) -> Result<Self, PrincipalError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(PrincipalError::Empty);
        }
        if let Some(c) = text.chars().find(|c| !c.is_ascii_alphanumeric() && *c != '-') {
            return Err(PrincipalError::InvalidCharacter(c));
        }
        Ok(Self(text.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First `len` characters, for compact display.
    pub fn short(&self, len: usize) -> &str {
        match self.0.char_indices().nth(len) {
            Some((idx, _)) => &self.0[..idx],
            None => &self.0,
        }
    }
}

impl std::fmt::Display for Principal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Principal {
    type Err = PrincipalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_text(s)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct PostId(pub u64);

impl std::fmt::Display for PostId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Backend timestamp: nanoseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct Time(pub i64);

impl Time {
    pub fn now() -> Self {
        Self(Utc::now().timestamp_nanos_opt().unwrap_or_default())
    }

    pub fn to_datetime(self) -> DateTime<Utc> {
        Utc.timestamp_nanos(self.0)
    }

    /// Human-friendly age of the timestamp relative to `now`.
    pub fn relative_to(self, now: DateTime<Utc>) -> String {
        let then = self.to_datetime();
        let elapsed = now.signed_duration_since(then);

        if elapsed.num_seconds() < 60 {
            "just now".to_string()
        } else if elapsed.num_minutes() < 60 {
            format!("{}m ago", elapsed.num_minutes())
        } else if elapsed.num_hours() < 24 {
            format!("{}h ago", elapsed.num_hours())
        } else if elapsed.num_days() < 7 {
            format!("{}d ago", elapsed.num_days())
        } else {
            then.format("%b %-d, %Y").to_string()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Genre {
    Rock,
    Punk,
    Metal,
    Hardcore,
    Alternative,
    Grunge,
    Indie,
    Other(String),
}

impl Genre {
    /// Genres offered as toggles in the profile editor, in display order.
    pub const OPTIONS: [Genre; 7] = [
        Genre::Rock,
        Genre::Punk,
        Genre::Metal,
        Genre::Hardcore,
        Genre::Alternative,
        Genre::Grunge,
        Genre::Indie,
    ];

    pub fn label(&self) -> &str {
        match self {
            Genre::Rock => "Rock",
            Genre::Punk => "Punk",
            Genre::Metal => "Metal",
            Genre::Hardcore => "Hardcore",
            Genre::Alternative => "Alternative",
            Genre::Grunge => "Grunge",
            Genre::Indie => "Indie",
            Genre::Other(text) => text,
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            Genre::Rock => "rock",
            Genre::Punk => "punk",
            Genre::Metal => "metal",
            Genre::Hardcore => "hardcore",
            Genre::Alternative => "alternative",
            Genre::Grunge => "grunge",
            Genre::Indie => "indie",
            Genre::Other(_) => "other",
        }
    }

    /// Inverse of [`Genre::key`]. The `other` toggle carries no text of its
    /// own, so it maps to `Other("Other")`.
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "rock" => Some(Genre::Rock),
            "punk" => Some(Genre::Punk),
            "metal" => Some(Genre::Metal),
            "hardcore" => Some(Genre::Hardcore),
            "alternative" => Some(Genre::Alternative),
            "grunge" => Some(Genre::Grunge),
            "indie" => Some(Genre::Indie),
            "other" => Some(Genre::Other("Other".to_string())),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub display_name: String,
    pub bio: String,
    pub favorite_genres: Vec<Genre>,
    pub favorite_bands: Vec<String>,
    pub is_age_verified: bool,
    pub avatar_url: Option<String>,
    pub location: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeedPost {
    pub id: PostId,
    pub author: Principal,
    pub content: String,
    pub likes: Vec<Principal>,
    pub timestamp: Time,
}

impl FeedPost {
    pub fn has_liked(&self, principal: &Principal) -> bool {
        self.likes.iter().any(|p| p == principal)
    }

    pub fn like_count(&self) -> usize {
        self.likes.len()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FriendRequestStatus {
    Pending,
    Accepted,
    Rejected,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FriendRequest {
    pub from: Principal,
    pub to: Principal,
    pub status: FriendRequestStatus,
    pub timestamp: Time,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub reported_post: Option<PostId>,
    pub reported_user: Option<Principal>,
    pub reason: String,
    pub reporter: Principal,
    pub timestamp: Time,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    User,
    Guest,
}
