//! Application defaults.
//!
//! Everything the flows treat as a constant lives here so the harness (and
//! tests) can vary it. Missing fields in a JSON document fall back to the
//! defaults below.
//!
//! ```
//! use shieldmate_logic::config::{validate_config, AppConfig};
//!
//! let config = AppConfig::from_json_str(r#"{ "platform": "ios" }"#).unwrap();
//! assert_eq!(config.max_contacts, 5);
//! assert!(validate_config(&config).is_empty());
//! ```

use crate::compose::Platform;
use serde::{Deserialize, Serialize};

/// Default SOS text shown in the editor until the user changes it.
pub const DEFAULT_EMERGENCY_MESSAGE: &str = "I'm in an emergency situation and need immediate help. This is an automated SOS message with my current location.";

/// Prefix of every map link; coordinates are appended as `lat,lon`.
pub const DEFAULT_MAP_LINK_BASE: &str = "https://www.google.com/maps?q=";

/// Longest simulated bot typing pause a configuration may ask for.
pub const MAX_BOT_REPLY_DELAY_MS: u64 = 60_000;

/// Tunable application settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Hard upper bound on stored contacts.
    pub max_contacts: usize,
    /// Count the contacts screen recommends. Not enforced.
    pub recommended_min_contacts: usize,
    /// Emergency message the store starts with.
    pub default_emergency_message: String,
    /// Prefix for map links.
    pub map_link_base: String,
    /// Which compose grammar to emit.
    pub platform: Platform,
    /// A cached fix older than this is not reused.
    pub location_max_age_secs: u64,
    /// Separator between recipient numbers in a compose URL.
    pub recipient_delimiter: String,
    /// MIME type passed to the share sheet for recordings.
    pub recording_mime_type: String,
    /// Uniform type identifier passed to the iOS share sheet.
    pub recording_uti: String,
    /// Delay before the bot reply is shown.
    pub bot_reply_delay_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            max_contacts: 5,
            recommended_min_contacts: 3,
            default_emergency_message: DEFAULT_EMERGENCY_MESSAGE.to_string(),
            map_link_base: DEFAULT_MAP_LINK_BASE.to_string(),
            platform: Platform::Android,
            location_max_age_secs: 120,
            recipient_delimiter: ";".to_string(),
            recording_mime_type: "audio/m4a".to_string(),
            recording_uti: "public.audio".to_string(),
            bot_reply_delay_ms: 500,
        }
    }
}

impl AppConfig {
    /// Parse a JSON document; absent fields keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Same settings with a different compose grammar.
    pub fn for_platform(platform: Platform) -> Self {
        Self {
            platform,
            ..Self::default()
        }
    }
}

/// Configuration validation error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Store could never hold a contact.
    ZeroCapacity,
    /// Recommended minimum exceeds the hard maximum.
    RecommendationAboveCapacity { recommended: usize, max: usize },
    /// Map link prefix is not an http(s) URL.
    InvalidMapLinkBase(String),
    /// Delimiter is empty or contains a digit, which would corrupt numbers.
    InvalidRecipientDelimiter(String),
    /// MIME type missing its `type/subtype` shape.
    InvalidMimeType(String),
    /// Bot reply delay above [`MAX_BOT_REPLY_DELAY_MS`].
    ReplyDelayTooLong(u64),
}

/// Validate a configuration, returning all errors found.
pub fn validate_config(config: &AppConfig) -> Vec<ConfigError> {
    let mut errors = Vec::new();

    if config.max_contacts == 0 {
        errors.push(ConfigError::ZeroCapacity);
    }
    if config.recommended_min_contacts > config.max_contacts {
        errors.push(ConfigError::RecommendationAboveCapacity {
            recommended: config.recommended_min_contacts,
            max: config.max_contacts,
        });
    }
    if !(config.map_link_base.starts_with("https://")
        || config.map_link_base.starts_with("http://"))
    {
        errors.push(ConfigError::InvalidMapLinkBase(
            config.map_link_base.clone(),
        ));
    }
    let delimiter = &config.recipient_delimiter;
    if delimiter.is_empty() || delimiter.chars().any(|c| c.is_ascii_digit()) {
        errors.push(ConfigError::InvalidRecipientDelimiter(delimiter.clone()));
    }
    let mime = &config.recording_mime_type;
    match mime.split_once('/') {
        Some((kind, sub)) if !kind.is_empty() && !sub.is_empty() => {}
        _ => errors.push(ConfigError::InvalidMimeType(mime.clone())),
    }
    if config.bot_reply_delay_ms > MAX_BOT_REPLY_DELAY_MS {
        errors.push(ConfigError::ReplyDelayTooLong(config.bot_reply_delay_ms));
    }

    errors
}
