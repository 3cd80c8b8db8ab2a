//! Emergency contact store.
//!
//! A single owned container holding up to `max_contacts` emergency
//! contacts (insertion order is display order) and the free-text emergency
//! message. There is no ambient/global instance: the app root owns one
//! `ContactStore` and lends it to whatever needs it.
//!
//! All mutation goes through [`StoreCommand`] via [`ContactStore::apply`],
//! so update order is explicit and every change can be logged or replayed.
//!
//! ```
//! use shieldmate_logic::contacts::{ContactDraft, ContactStore};
//!
//! let mut store = ContactStore::default();
//! let mom = store
//!     .add_contact(ContactDraft::new("Mom", "9876543210", "Mother"))
//!     .unwrap();
//! assert_eq!(store.len(), 1);
//! assert_eq!(store.get(&mom.id).unwrap().name, "Mom");
//! ```

use crate::config::AppConfig;
use crate::error::{SafetyError, SafetyResult};
use crate::validation::{validate_contact_edit, validate_new_contact};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque contact identifier, assigned at creation and never changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContactId(Uuid);

impl ContactId {
    fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ContactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// A stored emergency-reachable person.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub id: ContactId,
    pub name: String,
    pub phone: String,
    pub relation: String,
}

/// Contact fields before an id has been assigned.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactDraft {
    pub name: String,
    pub phone: String,
    pub relation: String,
}

impl ContactDraft {
    pub fn new(name: impl Into<String>, phone: impl Into<String>, relation: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            phone: phone.into(),
            relation: relation.into(),
        }
    }
}

/// The complete set of store mutations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StoreCommand {
    Add(ContactDraft),
    Update(Contact),
    Remove(ContactId),
    SetMessage(String),
}

/// What a successfully applied command changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StoreEvent {
    Added(Contact),
    Updated(ContactId),
    /// `existed` is false when the id was already absent.
    Removed { id: ContactId, existed: bool },
    MessageChanged,
}

/// Owned registry of emergency contacts plus the emergency message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactStore {
    contacts: Vec<Contact>,
    emergency_message: String,
    max_contacts: usize,
    recommended_min: usize,
}

impl Default for ContactStore {
    fn default() -> Self {
        Self::new(&AppConfig::default())
    }
}

impl ContactStore {
    /// Empty store using the capacity and default message from `config`.
    pub fn new(config: &AppConfig) -> Self {
        Self {
            contacts: Vec::new(),
            emergency_message: config.default_emergency_message.clone(),
            max_contacts: config.max_contacts,
            recommended_min: config.recommended_min_contacts,
        }
    }

    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    pub fn emergency_message(&self) -> &str {
        &self.emergency_message
    }

    pub fn len(&self) -> usize {
        self.contacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.max_contacts
    }

    pub fn is_full(&self) -> bool {
        self.contacts.len() >= self.max_contacts
    }

    /// Whether the contacts screen's recommended minimum is met.
    pub fn meets_recommended_minimum(&self) -> bool {
        self.contacts.len() >= self.recommended_min
    }

    pub fn get(&self, id: &ContactId) -> Option<&Contact> {
        self.contacts.iter().find(|c| c.id == *id)
    }

    /// Phone numbers in display order.
    pub fn phone_numbers(&self) -> Vec<&str> {
        self.contacts.iter().map(|c| c.phone.as_str()).collect()
    }

    /// Apply one mutation. On error the store is unchanged.
    pub fn apply(&mut self, command: StoreCommand) -> SafetyResult<StoreEvent> {
        match command {
            StoreCommand::Add(draft) => self.insert(draft).map(StoreEvent::Added),
            StoreCommand::Update(contact) => self.replace(contact).map(StoreEvent::Updated),
            StoreCommand::Remove(id) => {
                let existed = self.remove(id);
                Ok(StoreEvent::Removed { id, existed })
            }
            StoreCommand::SetMessage(text) => {
                self.set_message(text);
                Ok(StoreEvent::MessageChanged)
            }
        }
    }

    /// Append a contact. Fails with `CapacityExceeded` once the store is full.
    pub fn add_contact(&mut self, draft: ContactDraft) -> SafetyResult<Contact> {
        self.insert(draft)
    }

    /// Replace the record whose id matches. Fails with `UnknownContact`
    /// when there is no such record, leaving the list untouched.
    pub fn update_contact(&mut self, contact: Contact) -> SafetyResult<()> {
        self.replace(contact).map(|_| ())
    }

    /// Remove by id. Idempotent; returns whether anything was removed.
    pub fn remove_contact(&mut self, id: ContactId) -> bool {
        self.remove(id)
    }

    /// Replace the emergency message verbatim.
    pub fn update_emergency_message(&mut self, text: impl Into<String>) {
        self.set_message(text.into());
    }

    /// Add after running the add-form rules.
    pub fn add_validated(&mut self, draft: ContactDraft) -> SafetyResult<Contact> {
        let issues = validate_new_contact(&draft);
        if !issues.is_empty() {
            return Err(issues.into());
        }
        self.add_contact(draft)
    }

    /// Update after running the edit-form rules.
    pub fn update_validated(&mut self, contact: Contact) -> SafetyResult<()> {
        let issues = validate_contact_edit(&contact);
        if !issues.is_empty() {
            return Err(issues.into());
        }
        self.update_contact(contact)
    }

    fn insert(&mut self, draft: ContactDraft) -> SafetyResult<Contact> {
        if self.is_full() {
            log::warn!(
                "Rejected contact add: store full ({}/{})",
                self.contacts.len(),
                self.max_contacts
            );
            return Err(SafetyError::CapacityExceeded {
                max: self.max_contacts,
            });
        }
        let contact = Contact {
            id: self.fresh_id(),
            name: draft.name,
            phone: draft.phone,
            relation: draft.relation,
        };
        self.contacts.push(contact.clone());
        log::info!(
            "Contact {} added ({}/{})",
            contact.id,
            self.contacts.len(),
            self.max_contacts
        );
        Ok(contact)
    }

    fn replace(&mut self, updated: Contact) -> SafetyResult<ContactId> {
        let Some(slot) = self.contacts.iter_mut().find(|c| c.id == updated.id) else {
            log::warn!("Update for unknown contact {}", updated.id);
            return Err(SafetyError::UnknownContact(updated.id));
        };
        let id = updated.id;
        *slot = updated;
        log::info!("Contact {} updated", id);
        Ok(id)
    }

    fn remove(&mut self, id: ContactId) -> bool {
        let before = self.contacts.len();
        self.contacts.retain(|c| c.id != id);
        let existed = self.contacts.len() != before;
        log::info!("Contact {} removed (existed: {})", id, existed);
        existed
    }

    fn set_message(&mut self, text: String) {
        log::info!("Emergency message replaced ({} chars)", text.chars().count());
        self.emergency_message = text;
    }

    fn fresh_id(&self) -> ContactId {
        loop {
            let id = ContactId::generate();
            if self.get(&id).is_none() {
                return id;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::ValidationError;
    use std::collections::HashSet;

    fn filled_store(n: usize) -> ContactStore {
        let mut store = ContactStore::default();
        for i in 0..n {
            store
                .add_contact(ContactDraft::new(
                    format!("Contact {i}"),
                    format!("98765432{i:02}"),
                    "Friend",
                ))
                .unwrap();
        }
        store
    }

    #[test]
    fn sixth_contact_rejected_and_count_stays_five() {
        let mut store = filled_store(5);
        let snapshot = store.contacts().to_vec();
        let err = store
            .add_contact(ContactDraft::new("Extra", "1111111111", "Cousin"))
            .unwrap_err();
        assert_eq!(err, SafetyError::CapacityExceeded { max: 5 });
        assert_eq!(store.len(), 5);
        assert_eq!(store.contacts(), snapshot.as_slice());
    }

    #[test]
    fn ids_unique_across_store() {
        let store = filled_store(5);
        let ids: HashSet<_> = store.contacts().iter().map(|c| c.id).collect();
        assert_eq!(ids.len(), 5);
    }

    #[test]
    fn insertion_order_preserved() {
        let store = filled_store(3);
        let names: Vec<_> = store.contacts().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["Contact 0", "Contact 1", "Contact 2"]);
        assert_eq!(
            store.phone_numbers(),
            ["9876543200", "9876543201", "9876543202"]
        );
    }

    #[test]
    fn update_changes_only_matching_record() {
        let mut store = filled_store(3);
        let before = store.contacts().to_vec();
        let mut edited = before[1].clone();
        edited.name = "Renamed".into();
        edited.phone = "5555555555".into();
        store.update_contact(edited.clone()).unwrap();

        assert_eq!(store.contacts()[0], before[0]);
        assert_eq!(store.contacts()[1], edited);
        assert_eq!(store.contacts()[2], before[2]);
    }

    #[test]
    fn update_miss_reports_error_and_leaves_list() {
        let mut store = filled_store(2);
        let before = store.contacts().to_vec();
        let stranger = Contact {
            id: ContactId::generate(),
            name: "Ghost".into(),
            phone: "0000000000".into(),
            relation: "None".into(),
        };
        let err = store.update_contact(stranger.clone()).unwrap_err();
        assert_eq!(err, SafetyError::UnknownContact(stranger.id));
        assert_eq!(store.contacts(), before.as_slice());
    }

    #[test]
    fn remove_is_idempotent() {
        let mut once = filled_store(3);
        let target = once.contacts()[1].id;
        let mut twice = once.clone();

        assert!(once.remove_contact(target));
        assert!(twice.remove_contact(target));
        assert!(!twice.remove_contact(target));
        assert_eq!(once.contacts(), twice.contacts());
        assert_eq!(once.len(), 2);
    }

    #[test]
    fn removal_frees_capacity() {
        let mut store = filled_store(5);
        let first = store.contacts()[0].id;
        store.remove_contact(first);
        assert!(store
            .add_contact(ContactDraft::new("New", "1231231234", "Aunt"))
            .is_ok());
        assert_eq!(store.len(), 5);
    }

    #[test]
    fn emergency_message_starts_default_and_is_verbatim() {
        let mut store = ContactStore::default();
        assert!(store.emergency_message().starts_with("I'm in an emergency"));
        store.update_emergency_message("  help!\n");
        assert_eq!(store.emergency_message(), "  help!\n");
        store.update_emergency_message("");
        assert_eq!(store.emergency_message(), "");
    }

    #[test]
    fn validated_update_rejects_short_phone() {
        let mut store = filled_store(1);
        let mut edited = store.contacts()[0].clone();
        let original = edited.clone();
        edited.phone = "12345".into();
        let err = store.update_validated(edited).unwrap_err();
        assert_eq!(
            err,
            SafetyError::Validation(vec![ValidationError::InvalidPhone("12345".into())])
        );
        assert_eq!(store.contacts()[0], original);
    }

    #[test]
    fn validated_add_rejects_missing_fields() {
        let mut store = ContactStore::default();
        let err = store
            .add_validated(ContactDraft::new("", "1234567890", ""))
            .unwrap_err();
        assert!(matches!(err, SafetyError::Validation(ref v) if v.len() == 2));
        assert!(store.is_empty());
    }

    #[test]
    fn recommended_minimum_tracks_count() {
        let mut store = filled_store(2);
        assert!(!store.meets_recommended_minimum());
        store
            .add_contact(ContactDraft::new("Third", "1231231234", "Friend"))
            .unwrap();
        assert!(store.meets_recommended_minimum());
    }

    #[test]
    fn commands_replay_to_same_state() {
        let commands = vec![
            StoreCommand::Add(ContactDraft::new("A", "1111111111", "x")),
            StoreCommand::Add(ContactDraft::new("B", "2222222222", "y")),
            StoreCommand::SetMessage("help".into()),
        ];
        let mut store = ContactStore::default();
        for cmd in commands {
            store.apply(cmd).unwrap();
        }
        assert_eq!(store.len(), 2);
        assert_eq!(store.emergency_message(), "help");
    }

    #[test]
    fn custom_capacity_from_config() {
        let config = AppConfig {
            max_contacts: 2,
            ..AppConfig::default()
        };
        let mut store = ContactStore::new(&config);
        store.add_contact(ContactDraft::new("A", "1", "x")).unwrap();
        store.add_contact(ContactDraft::new("B", "2", "y")).unwrap();
        assert!(store.is_full());
        assert_eq!(
            store.add_contact(ContactDraft::new("C", "3", "z")),
            Err(SafetyError::CapacityExceeded { max: 2 })
        );
    }
}
