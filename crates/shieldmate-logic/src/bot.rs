//! ShieldMate, the rule-based safety bot.
//!
//! Replies come from static tables matched by keyword. Matching is on the
//! lower-cased input with this precedence:
//!
//! 1. `tip` / `advice` → a random entry of [`SAFETY_TIPS`]
//! 2. an [`EMERGENCY_GUIDANCE`] keyword → its guidance
//! 3. a [`LOCATION_INFO`] keyword → its text, or a permission hint when no
//!    location is available
//! 4. `hello` / `hi` → greeting
//! 5. `help` → capability list
//! 6. anything else → fallback
//!
//! Multi-word keywords match with either underscores or spaces, so
//! "road accident" and "road_accident" select the same entry.
//!
//! ```
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//! use shieldmate_logic::bot::respond;
//!
//! let mut rng = StdRng::seed_from_u64(7);
//! let reply = respond("There is a FIRE next door", false, &mut rng);
//! assert!(reply.contains("dial 101"));
//! ```

use crate::config::MAX_BOT_REPLY_DELAY_MS;
use chrono::{DateTime, Duration, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

pub const SAFETY_TIPS: [&str; 10] = [
    "Always share your live location with trusted contacts when going out",
    "Keep emergency contacts updated in your phone",
    "Be aware of your surroundings at all times",
    "Trust your instincts - if something feels wrong, it probably is",
    "Keep your phone charged and carry a power bank",
    "Learn basic self-defense techniques",
    "Have a safety plan for different scenarios",
    "Keep emergency numbers saved in your phone",
    "Share your travel plans with someone you trust",
    "Avoid walking alone in isolated areas at night",
];

/// Keyword → guidance, checked in order.
pub const EMERGENCY_GUIDANCE: [(&str, &str); 7] = [
    ("medical", "Call emergency services immediately. If you're in India, dial 102 for ambulance. Stay calm and provide your location clearly."),
    ("fire", "Call fire department immediately. If you're in India, dial 101. Evacuate the area and don't use elevators."),
    ("police", "Call police immediately. If you're in India, dial 100. Provide your location and describe the situation clearly."),
    ("natural_disaster", "Follow local authorities' instructions. Have an emergency kit ready with water, food, and first aid supplies."),
    ("road_accident", "Call emergency services. If you're in India, dial 108 for emergency response. Provide exact location and number of injured."),
    ("cyber_crime", "Report to cyber crime cell. In India, visit cybercrime.gov.in or call 1930. Preserve all evidence."),
    ("domestic_violence", "Call women's helpline. In India, dial 181. Seek help from trusted friends or family immediately."),
];

/// Keyword → location-based offer, checked in order.
pub const LOCATION_INFO: [(&str, &str); 5] = [
    ("nearest_police", "I can help you find the nearest police station. Please share your location."),
    ("nearest_hospital", "I can help you find the nearest hospital. Please share your location."),
    ("safe_route", "I can help you find the safest route. Please share your current location and destination."),
    ("emergency_shelters", "I can help you find emergency shelters. Please share your location."),
    ("public_transport", "I can help you find safe public transport options. Please share your location."),
];

pub const WELCOME_MESSAGE: &str = "Hello! I'm ShieldMate, your personal safety assistant. How can I help you today? You can ask me about:\n\n• Safety tips\n• Emergency guidance\n• Location information\n• Emergency contacts";

const GREETING: &str = "Hello! How can I help you stay safe today?";
const HELP: &str = "I can help you with:\n\n• Safety tips and advice\n• Emergency guidance\n• Finding nearby emergency services\n• Location-based safety information\n\nWhat would you like to know?";
const NEED_LOCATION: &str = "I need your location permission to help with that. Please enable location services in your settings.";
const FALLBACK: &str = "I'm not sure I understand. Could you rephrase that? I can help with safety tips, emergency guidance, or location information.";

fn mentions(input: &str, keyword: &str) -> bool {
    input.contains(keyword) || (keyword.contains('_') && input.contains(&keyword.replace('_', " ")))
}

/// Reply to one user message.
pub fn respond<R: Rng + ?Sized>(input: &str, has_location: bool, rng: &mut R) -> String {
    let input = input.to_lowercase();

    if input.contains("tip") || input.contains("advice") {
        let tip = SAFETY_TIPS.choose(rng).copied().unwrap_or(SAFETY_TIPS[0]);
        return format!("Here's a safety tip: {tip}\n\nWould you like another tip?");
    }

    if let Some((_, guidance)) = EMERGENCY_GUIDANCE.iter().find(|(k, _)| mentions(&input, k)) {
        return guidance.to_string();
    }

    if let Some((key, info)) = LOCATION_INFO.iter().find(|(k, _)| mentions(&input, k)) {
        return if has_location {
            format!(
                "{info}\n\nI have your location. Would you like me to find the nearest {}?",
                key.replace('_', " ")
            )
        } else {
            NEED_LOCATION.to_string()
        };
    }

    if input.contains("hello") || input.contains("hi") {
        return GREETING.to_string();
    }

    if input.contains("help") {
        return HELP.to_string();
    }

    FALLBACK.to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: u64,
    pub text: String,
    pub sender: Sender,
    pub timestamp: DateTime<Utc>,
}

/// Conversation shown on the bot screen, opened with the welcome message.
#[derive(Debug, Clone)]
pub struct ChatTranscript {
    messages: Vec<ChatMessage>,
    next_id: u64,
    reply_delay: Duration,
}

impl ChatTranscript {
    pub fn new(now: DateTime<Utc>, reply_delay_ms: u64) -> Self {
        let mut transcript = Self {
            messages: Vec::new(),
            next_id: 1,
            reply_delay: Duration::milliseconds(
                reply_delay_ms.min(MAX_BOT_REPLY_DELAY_MS) as i64,
            ),
        };
        transcript.push(WELCOME_MESSAGE.to_string(), Sender::Bot, now);
        transcript
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Post a user message and the bot's reply. Blank input is ignored and
    /// returns `None`; otherwise returns the reply, stamped after the
    /// configured delay.
    pub fn send<R: Rng + ?Sized>(
        &mut self,
        text: &str,
        has_location: bool,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Option<&ChatMessage> {
        if text.trim().is_empty() {
            return None;
        }
        self.push(text.to_string(), Sender::User, now);
        let reply = respond(text, has_location, rng);
        log::debug!("Bot reply ({} chars)", reply.len());
        self.push(reply, Sender::Bot, now + self.reply_delay);
        self.messages.last()
    }

    fn push(&mut self, text: String, sender: Sender, timestamp: DateTime<Utc>) {
        self.messages.push(ChatMessage {
            id: self.next_id,
            text,
            sender,
            timestamp,
        });
        self.next_id += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    #[test]
    fn tip_request_returns_known_tip() {
        let reply = respond("Any safety TIPS?", false, &mut rng());
        assert!(reply.starts_with("Here's a safety tip: "));
        assert!(SAFETY_TIPS.iter().any(|t| reply.contains(t)));
        assert!(reply.ends_with("Would you like another tip?"));
    }

    #[test]
    fn tips_take_precedence_over_guidance() {
        let reply = respond("fire safety advice", false, &mut rng());
        assert!(reply.starts_with("Here's a safety tip"));
    }

    #[test]
    fn guidance_keywords_in_table_order() {
        assert!(respond("medical", false, &mut rng()).contains("102"));
        assert!(respond("call the police", false, &mut rng()).contains("dial 100"));
        // "medical" listed before "police"
        assert!(respond("police medical", false, &mut rng()).contains("102"));
    }

    #[test]
    fn multi_word_keywords_match_spaces_or_underscores() {
        assert!(respond("road accident on the highway", false, &mut rng()).contains("108"));
        assert!(respond("road_accident", false, &mut rng()).contains("108"));
        assert!(respond("domestic violence", false, &mut rng()).contains("181"));
    }

    #[test]
    fn location_info_depends_on_fix() {
        let with = respond("nearest hospital please", true, &mut rng());
        assert!(with.contains("nearest hospital?"));
        let without = respond("nearest hospital please", false, &mut rng());
        assert_eq!(without, NEED_LOCATION);
    }

    #[test]
    fn greeting_help_and_fallback() {
        assert_eq!(respond("Hello there", false, &mut rng()), GREETING);
        assert_eq!(respond("help", false, &mut rng()), HELP);
        assert_eq!(respond("qwerty", false, &mut rng()), FALLBACK);
    }

    #[test]
    fn transcript_starts_with_welcome_and_ignores_blank() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
        let mut chat = ChatTranscript::new(now, 500);
        assert_eq!(chat.messages().len(), 1);
        assert_eq!(chat.messages()[0].sender, Sender::Bot);
        assert!(chat.send("   ", false, now, &mut rng()).is_none());
        assert_eq!(chat.messages().len(), 1);

        let reply = chat.send("hi", false, now, &mut rng()).unwrap().clone();
        assert_eq!(reply.text, GREETING);
        assert_eq!(reply.timestamp, now + Duration::milliseconds(500));
        let ids: Vec<u64> = chat.messages().iter().map(|m| m.id).collect();
        assert_eq!(ids, [1, 2, 3]);
        assert_eq!(chat.messages()[1].sender, Sender::User);
    }
}
