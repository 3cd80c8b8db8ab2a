//! Contact form validation.
//!
//! Two rule sets exist because the add and edit forms historically enforced
//! different things: adding only requires every field to be filled in, while
//! editing additionally requires a 10-digit phone number and non-blank
//! name/relation. Both are exposed here so every form applies the same rules.
//!
//! ```
//! use shieldmate_logic::validation::{is_valid_phone, validate_contact_fields};
//!
//! assert!(is_valid_phone("1234567890"));
//! assert!(!is_valid_phone("12345"));
//! assert!(validate_contact_fields("Asha", "9876543210", "Sister").is_empty());
//! ```

use crate::contacts::{Contact, ContactDraft};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Digits required in a phone number on edit.
pub const PHONE_DIGITS: usize = 10;

/// A single problem with contact form input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationError {
    /// Name left empty on the add form.
    MissingName,
    /// Phone left empty on the add form.
    MissingPhone,
    /// Relation left empty on the add form.
    MissingRelation,
    /// Phone is not exactly ten ASCII digits.
    InvalidPhone(String),
    /// Name is empty after trimming.
    BlankName,
    /// Relation is empty after trimming.
    BlankRelation,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::MissingName
            | ValidationError::MissingPhone
            | ValidationError::MissingRelation => write!(f, "please fill in all fields"),
            ValidationError::InvalidPhone(_) => {
                write!(f, "please enter a valid {PHONE_DIGITS}-digit phone number")
            }
            ValidationError::BlankName => write!(f, "please enter a valid name"),
            ValidationError::BlankRelation => write!(f, "please enter a valid relation"),
        }
    }
}

/// Whether `phone` is exactly ten ASCII digits.
pub fn is_valid_phone(phone: &str) -> bool {
    phone.len() == PHONE_DIGITS && phone.bytes().all(|b| b.is_ascii_digit())
}

/// Add-form rule: every field must be non-empty. Phone format is not checked.
pub fn validate_new_contact(draft: &ContactDraft) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    if draft.name.is_empty() {
        errors.push(ValidationError::MissingName);
    }
    if draft.phone.is_empty() {
        errors.push(ValidationError::MissingPhone);
    }
    if draft.relation.is_empty() {
        errors.push(ValidationError::MissingRelation);
    }
    errors
}

/// Edit-form rule applied to an existing record.
pub fn validate_contact_edit(contact: &Contact) -> Vec<ValidationError> {
    validate_contact_fields(&contact.name, &contact.phone, &contact.relation)
}

/// Edit-form rule on raw fields. Issues come back in the order
/// phone, name, relation; callers show the first.
pub fn validate_contact_fields(name: &str, phone: &str, relation: &str) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    if !is_valid_phone(phone) {
        errors.push(ValidationError::InvalidPhone(phone.to_string()));
    }
    if name.trim().is_empty() {
        errors.push(ValidationError::BlankName);
    }
    if relation.trim().is_empty() {
        errors.push(ValidationError::BlankRelation);
    }
    errors
}
