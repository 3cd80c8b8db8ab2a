//! User-visible notices.
//!
//! Every outcome of a store mutation or dispatch ends as one blocking,
//! dismissible notice on the screen that triggered it.

use crate::dispatch::{Delivery, DispatchKind, DispatchReceipt};
use crate::error::SafetyError;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub title: String,
    pub message: String,
}

impl Notice {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
        }
    }

    /// Notice for an accepted dispatch. Only a `Confirmed` delivery is
    /// announced as sent.
    pub fn for_receipt(receipt: &DispatchReceipt) -> Self {
        match (receipt.kind, receipt.delivery) {
            (DispatchKind::Sos, Delivery::Confirmed) => {
                Notice::new("Success", "Emergency message has been sent successfully")
            }
            (DispatchKind::Sos, Delivery::HandedOff) => Notice::new(
                "SOS Ready",
                "Your emergency message is open in your messaging app. Press send to deliver it.",
            ),
            (DispatchKind::LocationShare, Delivery::Confirmed) => {
                Notice::new("Success", "Location shared with all emergency contacts.")
            }
            (DispatchKind::LocationShare, Delivery::HandedOff) => Notice::new(
                "Location Ready",
                "Your location message is open in your messaging app. Press send to share it.",
            ),
            (DispatchKind::RecordingShare, Delivery::Confirmed) => {
                Notice::new("Success", "Recording shared with all emergency contacts")
            }
            (DispatchKind::RecordingShare, Delivery::HandedOff) => Notice::new(
                "Recording Ready",
                "Choose your emergency contacts in the app that opened to send the recording.",
            ),
        }
    }
}

impl From<&SafetyError> for Notice {
    fn from(err: &SafetyError) -> Self {
        match err {
            SafetyError::Validation(issues) => match issues.first() {
                Some(first) => Notice::new("Invalid Contact", capitalize(&first.to_string())),
                None => Notice::new("Invalid Contact", "Please check the contact details"),
            },
            SafetyError::CapacityExceeded { max } => {
                Notice::new("Contact Limit", format!("Maximum {max} contacts allowed"))
            }
            SafetyError::UnknownContact(_) => Notice::new(
                "Error",
                "This contact no longer exists. Please refresh and try again.",
            ),
            SafetyError::PermissionDenied => Notice::new(
                "Permission Denied",
                "Location permission is required to track your location.",
            ),
            SafetyError::LocationUnavailable => Notice::new(
                "Error",
                "Unable to get your current location. Please try again.",
            ),
            SafetyError::NoContacts => {
                Notice::new("No Contacts", "Please add emergency contacts first")
            }
            SafetyError::NoRecordingSelected => {
                Notice::new("Error", "Please select a recording to send")
            }
            SafetyError::AlreadySending => {
                Notice::new("Please Wait", "A message is already being sent")
            }
            SafetyError::PlatformUnavailable { .. } => {
                Notice::new("Error", "Unable to open SMS app")
            }
            SafetyError::OperationFailed(what) => Notice::new("Error", capitalize(what)),
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.title, self.message)
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::Channel;
    use crate::validation::ValidationError;

    fn receipt(kind: DispatchKind, delivery: Delivery) -> DispatchReceipt {
        DispatchReceipt {
            kind,
            channel: Channel::SmsCompose,
            target: "sms:1".into(),
            recipients: vec!["1".into()],
            delivery,
        }
    }

    #[test]
    fn handed_off_sos_does_not_claim_success() {
        let notice = Notice::for_receipt(&receipt(DispatchKind::Sos, Delivery::HandedOff));
        assert_ne!(notice.title, "Success");
        let confirmed = Notice::for_receipt(&receipt(DispatchKind::Sos, Delivery::Confirmed));
        assert_eq!(confirmed.title, "Success");
    }

    #[test]
    fn no_contacts_wording() {
        let notice = Notice::from(&SafetyError::NoContacts);
        assert_eq!(notice.title, "No Contacts");
        assert_eq!(notice.message, "Please add emergency contacts first");
    }

    #[test]
    fn validation_shows_first_issue() {
        let err = SafetyError::Validation(vec![
            ValidationError::InvalidPhone("1".into()),
            ValidationError::BlankName,
        ]);
        let notice = Notice::from(&err);
        assert_eq!(notice.message, "Please enter a valid 10-digit phone number");
    }

    #[test]
    fn operation_failed_capitalized() {
        let err = SafetyError::OperationFailed("failed to share recording".into());
        assert_eq!(
            Notice::from(&err).to_string(),
            "Error: Failed to share recording"
        );
    }
}
