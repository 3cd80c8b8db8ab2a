//! Emergency dispatch flows.
//!
//! Each flow reads the contact store, composes a payload from stored data
//! plus captured data (a coordinate, a recording) and hands it to the OS
//! through a [`Messenger`]. Once the OS accepts the request the app's
//! responsibility ends: there is no retry, queueing, or cancellation, and a
//! failed attempt leaves every piece of state as it was.
//!
//! Success is reported through [`Delivery`] rather than inferred from the
//! app coming back to the foreground. A platform that can confirm the send
//! returns `Confirmed`; otherwise the flow only claims `HandedOff`.
//!
//! ```
//! use shieldmate_logic::compose::Platform;
//! use shieldmate_logic::contacts::{ContactDraft, ContactStore};
//! use shieldmate_logic::dispatch::compose_sos;
//! use shieldmate_logic::location::Coordinate;
//! use shieldmate_logic::AppConfig;
//!
//! let config = AppConfig::for_platform(Platform::Android);
//! let mut store = ContactStore::new(&config);
//! store.add_contact(ContactDraft::new("Mom", "9876543210", "Mother")).unwrap();
//! store.update_emergency_message("help");
//!
//! let sos = compose_sos(&store, Some(&Coordinate::new(12.34, 56.78)), &config).unwrap();
//! assert!(sos.body.ends_with("https://www.google.com/maps?q=12.34,56.78"));
//! assert!(sos.url.starts_with("smsto:9876543210?body=help"));
//! ```

use crate::compose::{
    join_recipients, location_share_body, location_sms_url, map_link, sos_body, sos_sms_url,
    whatsapp_intent_url, Platform, RECORDING_DIALOG_TITLE, RECORDING_SHARE_TEXT,
};
use crate::config::AppConfig;
use crate::contacts::ContactStore;
use crate::error::{SafetyError, SafetyResult};
use crate::location::Coordinate;
use crate::recording::Recording;
use serde::{Deserialize, Serialize};
use std::cell::Cell;

/// What the platform could say about an accepted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Delivery {
    /// The platform reported the message or file as sent.
    Confirmed,
    /// A compose surface or share sheet opened; whether the user sent
    /// anything is unknown.
    HandedOff,
}

/// File attachment handed to the native share sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareRequest {
    pub file_uri: String,
    pub mime_type: String,
    pub dialog_title: String,
    pub uti: String,
}

/// OS-level messaging and sharing surface.
pub trait Messenger {
    /// Whether some installed app handles `url`.
    fn can_open_url(&mut self, url: &str) -> bool;
    fn open_url(&mut self, url: &str) -> SafetyResult<Delivery>;
    fn share_file(&mut self, request: &ShareRequest) -> SafetyResult<Delivery>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DispatchKind {
    Sos,
    LocationShare,
    RecordingShare,
}

/// The OS surface a payload went through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Channel {
    SmsCompose,
    /// Best-effort deep link into a third-party messenger.
    DeepLink,
    /// User-mediated native share sheet.
    ShareSheet,
}

/// Record of one accepted dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchReceipt {
    pub kind: DispatchKind,
    pub channel: Channel,
    /// URL opened, or file shared.
    pub target: String,
    /// Numbers addressed by the payload. Empty when the user picks the
    /// recipient inside the other app.
    pub recipients: Vec<String>,
    pub delivery: Delivery,
}

/// A composed SMS ready to hand to the OS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedSms {
    pub recipients: Vec<String>,
    pub body: String,
    pub url: String,
}

/// The per-screen "sending" flag. While a guard is alive the trigger is
/// disabled; dropping the guard (success or failure) re-enables it.
#[derive(Debug, Default)]
pub struct SendGate {
    sending: Cell<bool>,
}

impl SendGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_sending(&self) -> bool {
        self.sending.get()
    }

    pub fn begin(&self) -> SafetyResult<SendGuard<'_>> {
        if self.sending.replace(true) {
            return Err(SafetyError::AlreadySending);
        }
        Ok(SendGuard { gate: self })
    }
}

/// Holds the gate closed until dropped.
#[derive(Debug)]
pub struct SendGuard<'a> {
    gate: &'a SendGate,
}

impl Drop for SendGuard<'_> {
    fn drop(&mut self) {
        self.gate.sending.set(false);
    }
}

fn recipients_of(store: &ContactStore) -> SafetyResult<Vec<String>> {
    if store.is_empty() {
        return Err(SafetyError::NoContacts);
    }
    Ok(store.phone_numbers().into_iter().map(String::from).collect())
}

fn joined(recipients: &[String], config: &AppConfig) -> String {
    let phones: Vec<&str> = recipients.iter().map(String::as_str).collect();
    join_recipients(&phones, &config.recipient_delimiter)
}

/// Compose the SOS text. Needs at least one contact; the location line is
/// appended only when a coordinate is known.
pub fn compose_sos(
    store: &ContactStore,
    location: Option<&Coordinate>,
    config: &AppConfig,
) -> SafetyResult<ComposedSms> {
    let recipients = recipients_of(store)?;
    let link = location.map(|c| map_link(&config.map_link_base, c));
    let body = sos_body(store.emergency_message(), link.as_deref());
    let url = sos_sms_url(config.platform, &joined(&recipients, config), &body);
    Ok(ComposedSms {
        recipients,
        body,
        url,
    })
}

/// Compose the location-share text. Needs a coordinate and a contact.
pub fn compose_location_share(
    store: &ContactStore,
    location: Option<&Coordinate>,
    config: &AppConfig,
) -> SafetyResult<ComposedSms> {
    let coordinate = location.ok_or(SafetyError::LocationUnavailable)?;
    let recipients = recipients_of(store)?;
    let body = location_share_body(&map_link(&config.map_link_base, coordinate));
    let url = location_sms_url(&joined(&recipients, config), &body);
    Ok(ComposedSms {
        recipients,
        body,
        url,
    })
}

/// Send the emergency message to every contact in one compose request.
pub fn send_sos<M: Messenger>(
    store: &ContactStore,
    location: Option<&Coordinate>,
    config: &AppConfig,
    messenger: &mut M,
    gate: &SendGate,
) -> SafetyResult<DispatchReceipt> {
    let _guard = gate.begin()?;
    let sms = compose_sos(store, location, config)?;
    log::info!(
        "SOS to {} contacts (location attached: {})",
        sms.recipients.len(),
        location.is_some()
    );
    log::debug!("SOS url: {}", sms.url);

    if !messenger.can_open_url(&sms.url) {
        log::warn!("No SMS handler registered");
        return Err(SafetyError::PlatformUnavailable { url: sms.url });
    }
    let delivery = messenger
        .open_url(&sms.url)
        .map_err(|e| platform_failure(e, "failed to send emergency message"))?;

    Ok(DispatchReceipt {
        kind: DispatchKind::Sos,
        channel: Channel::SmsCompose,
        target: sms.url,
        recipients: sms.recipients,
        delivery,
    })
}

/// Share a map link to the current position with every contact at once.
pub fn share_location<M: Messenger>(
    store: &ContactStore,
    location: Option<&Coordinate>,
    config: &AppConfig,
    messenger: &mut M,
    gate: &SendGate,
) -> SafetyResult<DispatchReceipt> {
    let _guard = gate.begin()?;
    let sms = compose_location_share(store, location, config)?;
    log::info!("Location share to {} contacts", sms.recipients.len());
    log::debug!("Location url: {}", sms.url);

    let delivery = messenger
        .open_url(&sms.url)
        .map_err(|e| platform_failure(e, "failed to share location"))?;

    Ok(DispatchReceipt {
        kind: DispatchKind::LocationShare,
        channel: Channel::SmsCompose,
        target: sms.url,
        recipients: sms.recipients,
        delivery,
    })
}

/// Share the selected recording: share sheet on iOS, WhatsApp deep link on
/// Android. The two channels are reported as-is, not normalized.
pub fn share_recording<M: Messenger>(
    store: &ContactStore,
    selected: Option<&Recording>,
    config: &AppConfig,
    messenger: &mut M,
    gate: &SendGate,
) -> SafetyResult<DispatchReceipt> {
    let _guard = gate.begin()?;
    let recording = selected.ok_or(SafetyError::NoRecordingSelected)?;
    recipients_of(store)?;
    log::info!("Sharing recording {} via {:?}", recording.id, config.platform);

    let (channel, target, delivery) = match config.platform {
        Platform::Ios => {
            let request = ShareRequest {
                file_uri: recording.uri.clone(),
                mime_type: config.recording_mime_type.clone(),
                dialog_title: RECORDING_DIALOG_TITLE.to_string(),
                uti: config.recording_uti.clone(),
            };
            let delivery = messenger.share_file(&request).map_err(share_failure)?;
            (Channel::ShareSheet, request.file_uri, delivery)
        }
        Platform::Android => {
            let url = whatsapp_intent_url(RECORDING_SHARE_TEXT, &recording.uri);
            let delivery = messenger.open_url(&url).map_err(share_failure)?;
            (Channel::DeepLink, url, delivery)
        }
    };

    Ok(DispatchReceipt {
        kind: DispatchKind::RecordingShare,
        channel,
        target,
        recipients: Vec::new(),
        delivery,
    })
}

/// The recording path never touches the SMS app; any messenger error is a
/// failed share.
fn share_failure(err: SafetyError) -> SafetyError {
    log::warn!("failed to share recording: {}", err);
    SafetyError::OperationFailed("failed to share recording".to_string())
}

fn platform_failure(err: SafetyError, context: &str) -> SafetyError {
    log::warn!("{}: {}", context, err);
    match err {
        SafetyError::PlatformUnavailable { .. } => err,
        _ => SafetyError::OperationFailed(context.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contacts::ContactDraft;

    #[derive(Default)]
    struct RecordingMessenger {
        unsupported: bool,
        no_whatsapp: bool,
        fail: bool,
        opened: Vec<String>,
        shared: Vec<ShareRequest>,
        probes: usize,
    }

    impl Messenger for RecordingMessenger {
        fn can_open_url(&mut self, _url: &str) -> bool {
            self.probes += 1;
            !self.unsupported
        }

        fn open_url(&mut self, url: &str) -> SafetyResult<Delivery> {
            if self.no_whatsapp && url.starts_with("intent://") {
                return Err(SafetyError::PlatformUnavailable {
                    url: url.to_string(),
                });
            }
            if self.fail {
                return Err(SafetyError::OperationFailed("boom".into()));
            }
            self.opened.push(url.to_string());
            Ok(Delivery::HandedOff)
        }

        fn share_file(&mut self, request: &ShareRequest) -> SafetyResult<Delivery> {
            self.shared.push(request.clone());
            Ok(Delivery::Confirmed)
        }
    }

    fn store_with(phones: &[&str]) -> ContactStore {
        let mut store = ContactStore::default();
        for (i, phone) in phones.iter().enumerate() {
            store
                .add_contact(ContactDraft::new(format!("C{i}"), *phone, "Friend"))
                .unwrap();
        }
        store.update_emergency_message("help");
        store
    }

    #[test]
    fn sos_body_contains_coordinate_in_order() {
        let store = store_with(&["1111111111"]);
        let config = AppConfig::default();
        let sms = compose_sos(&store, Some(&Coordinate::new(12.34, 56.78)), &config).unwrap();
        assert_eq!(
            sms.body,
            "help\n\nMy current location: https://www.google.com/maps?q=12.34,56.78"
        );
    }

    #[test]
    fn sos_without_location_has_no_fragment() {
        let store = store_with(&["1111111111"]);
        let sms = compose_sos(&store, None, &AppConfig::default()).unwrap();
        assert_eq!(sms.body, "help");
        assert_eq!(sms.url, "smsto:1111111111?body=help");
    }

    #[test]
    fn zero_contacts_fail_without_external_call() {
        let store = ContactStore::default();
        let config = AppConfig::default();
        let gate = SendGate::new();
        let mut messenger = RecordingMessenger::default();
        let coord = Coordinate::new(1.0, 2.0);
        let recording = Recording {
            id: serde_json::from_str("\"67e55044-10b1-426f-9247-bb680e5fe0c8\"").unwrap(),
            uri: "file:///r.m4a".into(),
            duration_ms: 0,
            recorded_at: chrono::Utc::now(),
        };

        assert_eq!(
            send_sos(&store, Some(&coord), &config, &mut messenger, &gate),
            Err(SafetyError::NoContacts)
        );
        assert_eq!(
            share_location(&store, Some(&coord), &config, &mut messenger, &gate),
            Err(SafetyError::NoContacts)
        );
        assert_eq!(
            share_recording(&store, Some(&recording), &config, &mut messenger, &gate),
            Err(SafetyError::NoContacts)
        );
        assert_eq!(messenger.probes, 0);
        assert!(messenger.opened.is_empty());
        assert!(messenger.shared.is_empty());
        assert!(!gate.is_sending());
    }

    #[test]
    fn sos_one_request_for_all_recipients() {
        let store = store_with(&["1111111111", "2222222222", "3333333333"]);
        let gate = SendGate::new();
        let mut messenger = RecordingMessenger::default();
        let receipt = send_sos(&store, None, &AppConfig::default(), &mut messenger, &gate).unwrap();
        assert_eq!(messenger.opened.len(), 1);
        assert!(messenger.opened[0].starts_with("smsto:1111111111;2222222222;3333333333?body="));
        assert_eq!(receipt.recipients.len(), 3);
        assert_eq!(receipt.delivery, Delivery::HandedOff);
        assert!(!gate.is_sending());
    }

    #[test]
    fn sos_unsupported_handler_reports_platform_unavailable() {
        let store = store_with(&["1111111111"]);
        let gate = SendGate::new();
        let mut messenger = RecordingMessenger {
            unsupported: true,
            ..Default::default()
        };
        let err = send_sos(&store, None, &AppConfig::default(), &mut messenger, &gate).unwrap_err();
        assert!(matches!(err, SafetyError::PlatformUnavailable { .. }));
        assert!(messenger.opened.is_empty());
        assert!(!gate.is_sending());
    }

    #[test]
    fn location_share_requires_coordinate_first() {
        let store = ContactStore::default();
        let gate = SendGate::new();
        let mut messenger = RecordingMessenger::default();
        assert_eq!(
            share_location(&store, None, &AppConfig::default(), &mut messenger, &gate),
            Err(SafetyError::LocationUnavailable)
        );
    }

    #[test]
    fn location_share_uses_sms_query_grammar_on_ios() {
        let store = store_with(&["1111111111", "2222222222"]);
        let gate = SendGate::new();
        let mut messenger = RecordingMessenger::default();
        let config = AppConfig::for_platform(Platform::Ios);
        share_location(
            &store,
            Some(&Coordinate::new(1.5, -2.5)),
            &config,
            &mut messenger,
            &gate,
        )
        .unwrap();
        assert!(messenger.opened[0].starts_with("sms:1111111111;2222222222?body=I%20am%20sharing"));
        assert!(messenger.opened[0].ends_with("q%3D1.5%2C-2.5"));
    }

    #[test]
    fn open_failure_maps_to_operation_failed() {
        let store = store_with(&["1111111111"]);
        let gate = SendGate::new();
        let mut messenger = RecordingMessenger {
            fail: true,
            ..Default::default()
        };
        let err = share_location(
            &store,
            Some(&Coordinate::new(0.0, 0.0)),
            &AppConfig::default(),
            &mut messenger,
            &gate,
        )
        .unwrap_err();
        assert_eq!(
            err,
            SafetyError::OperationFailed("failed to share location".into())
        );
        assert!(!gate.is_sending());
    }

    #[test]
    fn gate_blocks_repeat_taps() {
        let store = store_with(&["1111111111"]);
        let gate = SendGate::new();
        let held = gate.begin().unwrap();
        let mut messenger = RecordingMessenger::default();
        assert_eq!(
            send_sos(&store, None, &AppConfig::default(), &mut messenger, &gate),
            Err(SafetyError::AlreadySending)
        );
        drop(held);
        assert!(send_sos(&store, None, &AppConfig::default(), &mut messenger, &gate).is_ok());
    }

    #[test]
    fn missing_whatsapp_reported_as_failed_share() {
        let store = store_with(&["1111111111"]);
        let gate = SendGate::new();
        let mut messenger = RecordingMessenger {
            no_whatsapp: true,
            ..Default::default()
        };
        let recording = Recording {
            id: serde_json::from_str("\"67e55044-10b1-426f-9247-bb680e5fe0c8\"").unwrap(),
            uri: "file:///r.m4a".into(),
            duration_ms: 0,
            recorded_at: chrono::Utc::now(),
        };
        let config = AppConfig::for_platform(Platform::Android);
        let err = share_recording(&store, Some(&recording), &config, &mut messenger, &gate)
            .unwrap_err();
        assert_eq!(
            err,
            SafetyError::OperationFailed("failed to share recording".into())
        );
        let notice = crate::notice::Notice::from(&err);
        assert_eq!(notice.message, "Failed to share recording");
        assert!(messenger.opened.is_empty());
        assert!(!gate.is_sending());
    }
}
