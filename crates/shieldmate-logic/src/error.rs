//! Error taxonomy shared by the store and every dispatch flow.
//!
//! All errors are handled by the screen that triggered the action and shown
//! as a [`Notice`](crate::notice::Notice). None of them is fatal.

use crate::contacts::ContactId;
use crate::validation::ValidationError;
use thiserror::Error;

/// Everything that can go wrong in a store mutation or dispatch attempt.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SafetyError {
    /// Bad form input. Carries every issue found, in display order.
    #[error("invalid contact details: {}", join_issues(.0))]
    Validation(Vec<ValidationError>),
    /// A contact was added while the store was already full.
    #[error("maximum {max} contacts allowed")]
    CapacityExceeded { max: usize },
    /// An update referenced an id the store does not hold.
    #[error("no contact with id {0}")]
    UnknownContact(ContactId),
    /// Location permission was refused.
    #[error("location permission denied")]
    PermissionDenied,
    /// No coordinate could be obtained.
    #[error("current location unavailable")]
    LocationUnavailable,
    /// A dispatch flow was triggered with an empty contact list.
    #[error("no emergency contacts configured")]
    NoContacts,
    /// Recording share was triggered without a selected recording.
    #[error("no recording selected")]
    NoRecordingSelected,
    /// The trigger was pressed again while a dispatch was still in flight.
    #[error("a dispatch is already in progress")]
    AlreadySending,
    /// No installed handler accepts the outgoing intent.
    #[error("no handler for {url}")]
    PlatformUnavailable { url: String },
    /// Generic capture/playback/share failure reported by the platform.
    #[error("operation failed: {0}")]
    OperationFailed(String),
}

pub type SafetyResult<T> = Result<T, SafetyError>;

fn join_issues(issues: &[ValidationError]) -> String {
    issues
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl From<Vec<ValidationError>> for SafetyError {
    fn from(issues: Vec<ValidationError>) -> Self {
        SafetyError::Validation(issues)
    }
}
