/// Application name
pub const APP_NAME: &str = "MetalHead Underground";

/// Display name length bounds (inclusive, in characters)
pub const MIN_DISPLAY_NAME_LENGTH: usize = 5;
pub const MAX_DISPLAY_NAME_LENGTH: usize = 50;

/// Maximum post length in characters
pub const MAX_POST_LENGTH: usize = 500;

/// Maximum length of the free-text details attached to a report
pub const MAX_REPORT_DETAILS_LENGTH: usize = 150;

/// Reasons offered by the report dialog, in display order
pub const REPORT_REASONS: [&str; 6] = [
    "Spam",
    "Harassment",
    "Hate Speech",
    "Violence",
    "Illegal Content",
    "Other",
];

/// Minimum age users must confirm before creating a profile
pub const MINIMUM_AGE: u32 = 21;

/// Consecutive gateway failures before the connection is reported as failed
pub const GATEWAY_FAILURE_THRESHOLD: u32 = 3;

/// Session storage key remembering that the cache advisory was shown
pub const ADVISORY_SESSION_KEY: &str = "metalhead-cache-modal-shown";

/// Public path of the account deletion page
pub const DELETE_ACCOUNT_PATH: &str = "/delete-account";

/// Normalized messages must be strictly shorter than this
pub const MAX_ERROR_MESSAGE_LENGTH: usize = 200;

/// Catch-all message when nothing better can be extracted
pub const GENERIC_ERROR_MESSAGE: &str = "An error occurred. Please try again.";

/// Hosted gateway domain and its raw (uncertified) counterpart
pub const GATEWAY_DOMAIN: &str = ".icp0.io";
pub const RAW_GATEWAY_DOMAIN: &str = ".raw.icp0.io";

/// Support contact shown on the account deletion page
pub const SUPPORT_EMAIL: &str = "darkstagecontactofficial@gmail.com";
