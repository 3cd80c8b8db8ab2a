//! Message bodies and compose-intent grammar.
//!
//! The OS only prefills the SMS composer when the URL matches its grammar
//! exactly, so these builders are byte-for-byte:
//!
//! | Flow | Android | iOS |
//! |------|---------|-----|
//! | SOS text | `smsto:<to>?body=<b>` | `sms:<to>&body=<b>` |
//! | Location share | `sms:<to>?body=<b>` | `sms:<to>?body=<b>` |
//! | Recording share | WhatsApp `intent://` deep link | share sheet |
//!
//! Recipients are joined with the configured delimiter (`;`) and bodies are
//! percent-encoded with the same unreserved set as `encodeURIComponent`.
//!
//! ```
//! use shieldmate_logic::compose::{encode_uri_component, sos_sms_url, Platform};
//!
//! assert_eq!(encode_uri_component("a b&c"), "a%20b%26c");
//! let url = sos_sms_url(Platform::Ios, "111;222", "help");
//! assert_eq!(url, "sms:111;222&body=help");
//! ```

use crate::location::Coordinate;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};

/// Characters left untouched by `encodeURIComponent`.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Text sent alongside a shared recording.
pub const RECORDING_SHARE_TEXT: &str =
    "I am sharing an emergency audio recording with you. Please listen to it.";

/// Title of the share sheet used for recordings.
pub const RECORDING_DIALOG_TITLE: &str = "Share Emergency Recording";

/// Target platform, selecting which compose grammar is emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Android,
    Ios,
}

/// Percent-encode a URL component.
pub fn encode_uri_component(text: &str) -> String {
    utf8_percent_encode(text, URI_COMPONENT).to_string()
}

/// Join phone numbers into one recipient list.
pub fn join_recipients(phones: &[&str], delimiter: &str) -> String {
    phones.join(delimiter)
}

/// Map link for a coordinate: `base` followed by `lat,lon`.
pub fn map_link(base: &str, coordinate: &Coordinate) -> String {
    format!("{}{},{}", base, coordinate.latitude, coordinate.longitude)
}

/// SOS body: the emergency message, plus the location line when a
/// coordinate is known. Nothing is appended without one.
pub fn sos_body(message: &str, location_link: Option<&str>) -> String {
    match location_link {
        Some(link) => format!("{message}\n\nMy current location: {link}"),
        None => message.to_string(),
    }
}

/// Body of the location-share message.
pub fn location_share_body(location_link: &str) -> String {
    format!("I am sharing my current location with you: {location_link}")
}

/// SMS compose URL used by the SOS flow.
pub fn sos_sms_url(platform: Platform, recipients: &str, body: &str) -> String {
    let body = encode_uri_component(body);
    match platform {
        Platform::Android => format!("smsto:{recipients}?body={body}"),
        Platform::Ios => format!("sms:{recipients}&body={body}"),
    }
}

/// SMS compose URL used by the location-share flow (same on both platforms).
pub fn location_sms_url(recipients: &str, body: &str) -> String {
    format!("sms:{}?body={}", recipients, encode_uri_component(body))
}

/// Android intent URL handing text plus a file to WhatsApp.
pub fn whatsapp_intent_url(text: &str, file_uri: &str) -> String {
    format!(
        "intent://send?text={}&file={}#Intent;scheme=whatsapp;package=com.whatsapp;end",
        encode_uri_component(text),
        encode_uri_component(file_uri)
    )
}
