//! Pure personal-safety logic for ShieldMate.
//!
//! This crate contains everything the app does that is independent of any
//! UI runtime or operating system: the emergency contact store, form
//! validation, the message/intent grammar handed to the OS, the dispatch
//! flows themselves, the recording library and the rule-based safety bot.
//! Platform collaborators (location, audio, messaging) are traits so every
//! flow is unit-testable with fakes.
//!
//! # Module Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`bot`] | Keyword-matching ShieldMate safety bot and chat transcript |
//! | [`compose`] | SMS / deep-link URL grammar and message bodies |
//! | [`config`] | Application defaults and their validation |
//! | [`contacts`] | Owned contact store with a typed command set |
//! | [`dispatch`] | SOS, location-share and recording-share flows |
//! | [`error`] | Error taxonomy shared by every flow |
//! | [`location`] | Consolidated location capability with max-age cache |
//! | [`notice`] | User-visible notices for outcomes and failures |
//! | [`recording`] | Audio capture library and playback state |
//! | [`validation`] | Contact form validation rules |

pub mod bot;
pub mod compose;
pub mod config;
pub mod contacts;
pub mod dispatch;
pub mod error;
pub mod location;
pub mod notice;
pub mod recording;
pub mod validation;

pub use config::AppConfig;
pub use contacts::{Contact, ContactDraft, ContactId, ContactStore, StoreCommand};
pub use error::{SafetyError, SafetyResult};
