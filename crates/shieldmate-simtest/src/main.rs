//! ShieldMate Headless Flow Harness
//!
//! Drives the contact store and every dispatch flow against simulated
//! platform collaborators. Runs entirely in-process: no UI, no OS
//! intents, no network.
//!
//! Usage:
//!   cargo run -p shieldmate-simtest
//!   cargo run -p shieldmate-simtest -- --verbose
//!   cargo run -p shieldmate-simtest -- --config settings.json --json

mod platform;

use chrono::{DateTime, Duration, TimeZone, Utc};
use platform::{SimGps, SimMic, SimOs, SimSpeaker};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use shieldmate_logic::bot::{ChatTranscript, Sender};
use shieldmate_logic::compose::Platform;
use shieldmate_logic::config::validate_config;
use shieldmate_logic::contacts::{ContactDraft, ContactStore};
use shieldmate_logic::dispatch::{
    compose_sos, send_sos, share_location, share_recording, Channel, SendGate,
};
use shieldmate_logic::location::{Coordinate, LocationService, LocationStatus};
use shieldmate_logic::notice::Notice;
use shieldmate_logic::recording::{Playback, PlaybackState, RecordingLibrary};
use shieldmate_logic::validation::is_valid_phone;
use shieldmate_logic::{AppConfig, SafetyError};

// ── Test harness ────────────────────────────────────────────────────────

#[derive(Serialize)]
struct TestResult {
    name: String,
    passed: bool,
    detail: String,
}

struct Options {
    verbose: bool,
    json: bool,
    config: AppConfig,
}

fn parse_options() -> Result<Options, String> {
    let mut verbose = false;
    let mut json = false;
    let mut config = AppConfig::default();
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--verbose" => verbose = true,
            "--json" => json = true,
            "--config" => {
                let path = args.next().ok_or("--config needs a path")?;
                let text = std::fs::read_to_string(&path)
                    .map_err(|e| format!("cannot read {}: {}", path, e))?;
                config = AppConfig::from_json_str(&text)
                    .map_err(|e| format!("invalid config {}: {}", path, e))?;
            }
            other => return Err(format!("unknown argument: {}", other)),
        }
    }
    Ok(Options {
        verbose,
        json,
        config,
    })
}

fn main() {
    let options = match parse_options() {
        Ok(o) => o,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(2);
        }
    };
    let default_level = if options.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let config_errors = validate_config(&options.config);
    if !config_errors.is_empty() {
        eprintln!("invalid configuration: {:?}", config_errors);
        std::process::exit(2);
    }
    let config = &options.config;
    let verbose = options.verbose;

    if !options.json {
        println!("=== ShieldMate Flow Harness ===\n");
    }

    let mut results = Vec::new();

    // 1. Contact store
    results.extend(validate_contact_store(config, verbose));

    // 2. Form validation
    results.extend(validate_forms(verbose));

    // 3. Location capability
    results.extend(validate_location(config, verbose));

    // 4. SOS flow on both platforms
    results.extend(validate_sos(config, verbose));

    // 5. Location share
    results.extend(validate_location_share(config, verbose));

    // 6. Recordings and recording share
    results.extend(validate_recordings(config, verbose));

    // 7. Safety bot
    results.extend(validate_bot(config, verbose));

    // ── Summary ──
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.iter().filter(|r| !r.passed).count();
    let total = results.len();

    if options.json {
        match serde_json::to_string_pretty(&results) {
            Ok(out) => println!("{}", out),
            Err(e) => eprintln!("cannot serialize results: {}", e),
        }
    } else {
        println!();
        for r in &results {
            let icon = if r.passed { "✓" } else { "✗" };
            if !r.passed || verbose {
                println!("  {} {}: {}", icon, r.name, r.detail);
            }
        }
        println!(
            "\n=== RESULT: {}/{} passed, {} failed ===",
            passed, total, failed
        );
    }

    if failed > 0 {
        std::process::exit(1);
    }
}

fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 22, 0, 0)
        .single()
        .unwrap_or_else(Utc::now)
}

fn seeded_store(config: &AppConfig, count: usize) -> ContactStore {
    let mut store = ContactStore::new(config);
    for i in 0..count {
        let draft = ContactDraft::new(
            format!("Contact {}", i + 1),
            format!("90000000{:02}", i),
            "Friend",
        );
        if let Err(e) = store.add_contact(draft) {
            log::warn!("seeding stopped at {}: {}", i, e);
            break;
        }
    }
    store
}

fn section(title: &str) {
    log::info!("section: {}", title);
    println!("--- {} ---", title);
}

// ── 1. Contact Store ────────────────────────────────────────────────────

fn validate_contact_store(config: &AppConfig, verbose: bool) -> Vec<TestResult> {
    section("Contact Store");
    let mut results = Vec::new();
    let max = config.max_contacts;

    // Fill to capacity, then one more
    let mut store = seeded_store(config, max);
    let overflow = store.add_contact(ContactDraft::new("Overflow", "9999999999", "Stranger"));
    results.push(TestResult {
        name: "store_capacity_enforced".into(),
        passed: store.len() == max
            && overflow == Err(SafetyError::CapacityExceeded { max }),
        detail: format!("{} stored, overflow -> {:?}", store.len(), overflow.err()),
    });

    // Unique ids
    let mut ids: Vec<_> = store.contacts().iter().map(|c| c.id.to_string()).collect();
    ids.sort();
    ids.dedup();
    results.push(TestResult {
        name: "store_ids_unique".into(),
        passed: ids.len() == store.len(),
        detail: format!("{} distinct ids", ids.len()),
    });

    // Update touches only the target
    let before = store.contacts().to_vec();
    let mut edited = before[0].clone();
    edited.relation = "Sister".into();
    let update_ok = store.update_contact(edited.clone()).is_ok();
    let others_same = store.contacts()[1..] == before[1..];
    results.push(TestResult {
        name: "store_update_isolated".into(),
        passed: update_ok && store.contacts()[0] == edited && others_same,
        detail: format!("updated={} others_unchanged={}", update_ok, others_same),
    });

    // Update miss leaves the list alone
    let snapshot = store.contacts().to_vec();
    let mut ghost = seeded_store(config, 1).contacts()[0].clone();
    ghost.name = "Ghost".into();
    let miss = store.update_contact(ghost);
    results.push(TestResult {
        name: "store_update_miss_reported".into(),
        passed: matches!(miss, Err(SafetyError::UnknownContact(_)))
            && store.contacts() == snapshot.as_slice(),
        detail: format!("{:?}", miss.err()),
    });

    // Remove twice == remove once
    let target = store.contacts()[0].id;
    let mut once = store.clone();
    once.remove_contact(target);
    store.remove_contact(target);
    store.remove_contact(target);
    results.push(TestResult {
        name: "store_remove_idempotent".into(),
        passed: once.contacts() == store.contacts(),
        detail: format!("{} contacts after removal", store.len()),
    });

    // Emergency message replaced verbatim
    store.update_emergency_message("  custom SOS text ");
    results.push(TestResult {
        name: "store_message_verbatim".into(),
        passed: store.emergency_message() == "  custom SOS text ",
        detail: format!("{:?}", store.emergency_message()),
    });

    if verbose {
        println!("  Contacts after sweep:");
        for c in store.contacts() {
            println!("    {} {} ({})", c.name, c.phone, c.relation);
        }
    }

    results
}

// ── 2. Form Validation ──────────────────────────────────────────────────

fn validate_forms(_verbose: bool) -> Vec<TestResult> {
    section("Form Validation");
    let mut results = Vec::new();

    for (phone, expected) in [
        ("12345", false),
        ("1234567890", true),
        ("12345678901", false),
        ("12345abcde", false),
        ("", false),
    ] {
        let got = is_valid_phone(phone);
        results.push(TestResult {
            name: format!("phone_{:?}", phone),
            passed: got == expected,
            detail: format!("valid={} expected={}", got, expected),
        });
    }

    let mut store = ContactStore::default();
    let rejected = store.add_validated(ContactDraft::new("", "1234567890", "Friend"));
    let notice = rejected.as_ref().err().map(Notice::from);
    results.push(TestResult {
        name: "form_add_requires_fields".into(),
        passed: rejected.is_err() && store.is_empty(),
        detail: notice.map_or("accepted".into(), |n| n.to_string()),
    });

    results
}

// ── 3. Location ─────────────────────────────────────────────────────────

fn validate_location(config: &AppConfig, _verbose: bool) -> Vec<TestResult> {
    section("Location Capability");
    let mut results = Vec::new();
    let t0 = start_time();
    let max_age = config.location_max_age_secs as i64;

    let mut service = LocationService::with_max_age_secs(
        SimGps::granted(Coordinate::new(12.34, 56.78)),
        config.location_max_age_secs,
    );
    let first = service.locate(t0);
    let again = service.locate(t0 + Duration::seconds(max_age / 2));
    results.push(TestResult {
        name: "location_fix_reused".into(),
        passed: first.is_ok() && first == again && service.provider().fixes == 1,
        detail: format!(
            "prompts={} fixes={}",
            service.provider().prompts,
            service.provider().fixes
        ),
    });

    let _ = service.locate(t0 + Duration::seconds(max_age + 1));
    results.push(TestResult {
        name: "location_stale_refreshed".into(),
        passed: service.provider().fixes == 2 && service.provider().prompts == 1,
        detail: format!("fixes={}", service.provider().fixes),
    });

    let mut denied =
        LocationService::with_max_age_secs(SimGps::denied(), config.location_max_age_secs);
    let a = denied.locate(t0);
    let b = denied.locate(t0);
    results.push(TestResult {
        name: "location_denial_remembered".into(),
        passed: a == Err(SafetyError::PermissionDenied)
            && b == a
            && denied.provider().prompts == 1
            && denied.status(t0) == LocationStatus::Denied,
        detail: denied.status(t0).label().to_string(),
    });

    results
}

// ── 4. SOS ──────────────────────────────────────────────────────────────

fn validate_sos(config: &AppConfig, verbose: bool) -> Vec<TestResult> {
    section("SOS Dispatch");
    let mut results = Vec::new();
    let coord = Coordinate::new(12.34, 56.78);

    let mut store = seeded_store(config, 3);
    store.update_emergency_message("help");

    match compose_sos(&store, Some(&coord), config) {
        Ok(sms) => {
            let expected_link = format!("{}12.34,56.78", config.map_link_base);
            results.push(TestResult {
                name: "sos_location_fragment".into(),
                passed: sms.body == format!("help\n\nMy current location: {}", expected_link),
                detail: format!("{:?}", sms.body),
            });
        }
        Err(e) => results.push(TestResult {
            name: "sos_location_fragment".into(),
            passed: false,
            detail: e.to_string(),
        }),
    }

    let bare = compose_sos(&store, None, config).map(|s| s.body);
    results.push(TestResult {
        name: "sos_no_location_no_fragment".into(),
        passed: bare.as_deref() == Ok("help"),
        detail: format!("{:?}", bare),
    });

    for platform in [Platform::Android, Platform::Ios] {
        let platform_config = AppConfig {
            platform,
            ..config.clone()
        };
        let mut os = SimOs::new();
        let gate = SendGate::new();
        let receipt = send_sos(&store, Some(&coord), &platform_config, &mut os, &gate);
        let prefix = match platform {
            Platform::Android => "smsto:",
            Platform::Ios => "sms:",
        };
        let url = os.opened.first().cloned().unwrap_or_default();
        results.push(TestResult {
            name: format!("sos_url_{:?}", platform).to_lowercase(),
            passed: receipt.is_ok() && os.opened.len() == 1 && url.starts_with(prefix),
            detail: url.clone(),
        });
        if verbose {
            if let Ok(r) = &receipt {
                println!("  {:?}: {}", platform, Notice::for_receipt(r));
            }
        }
    }

    // No SMS app
    let mut os = SimOs::new();
    os.has_sms_app = false;
    let gate = SendGate::new();
    let err = send_sos(&store, None, config, &mut os, &gate);
    results.push(TestResult {
        name: "sos_no_sms_handler".into(),
        passed: matches!(err, Err(SafetyError::PlatformUnavailable { .. }))
            && os.external_calls() == 0
            && !gate.is_sending(),
        detail: err
            .as_ref()
            .err()
            .map(|e| Notice::from(e).to_string())
            .unwrap_or_default(),
    });

    // Zero contacts
    let empty = ContactStore::new(config);
    let mut os = SimOs::new();
    let err = send_sos(&empty, Some(&coord), config, &mut os, &gate);
    results.push(TestResult {
        name: "sos_zero_contacts".into(),
        passed: err == Err(SafetyError::NoContacts) && os.external_calls() == 0,
        detail: format!("{:?}", err.err()),
    });

    results
}

// ── 5. Location Share ───────────────────────────────────────────────────

fn validate_location_share(config: &AppConfig, _verbose: bool) -> Vec<TestResult> {
    section("Location Share");
    let mut results = Vec::new();
    let coord = Coordinate::new(28.6139, 77.209);
    let store = seeded_store(config, 2);
    let gate = SendGate::new();

    let mut os = SimOs::new();
    let missing = share_location(&store, None, config, &mut os, &gate);
    results.push(TestResult {
        name: "location_share_needs_fix".into(),
        passed: missing == Err(SafetyError::LocationUnavailable) && os.external_calls() == 0,
        detail: format!("{:?}", missing.err()),
    });

    let receipt = share_location(&store, Some(&coord), config, &mut os, &gate);
    let single_request = os.opened.len() == 1;
    let joined = store.phone_numbers().join(&config.recipient_delimiter);
    results.push(TestResult {
        name: "location_share_single_request".into(),
        passed: receipt.is_ok()
            && single_request
            && os.opened[0].starts_with(&format!("sms:{}?body=", joined)),
        detail: os.opened.first().cloned().unwrap_or_default(),
    });

    let empty = ContactStore::new(config);
    let mut os = SimOs::new();
    let err = share_location(&empty, Some(&coord), config, &mut os, &gate);
    results.push(TestResult {
        name: "location_share_zero_contacts".into(),
        passed: err == Err(SafetyError::NoContacts) && os.external_calls() == 0,
        detail: format!("{:?}", err.err()),
    });

    results
}

// ── 6. Recordings ───────────────────────────────────────────────────────

fn validate_recordings(config: &AppConfig, verbose: bool) -> Vec<TestResult> {
    section("Recordings");
    let mut results = Vec::new();
    let t0 = start_time();
    let mut mic = SimMic::default();
    let mut speaker = SimSpeaker::default();
    let mut library = RecordingLibrary::new();
    let mut playback = Playback::new();

    for take in 0..2 {
        let start = t0 + Duration::seconds(take * 60);
        let captured = match library.start_capture(&mut mic, start) {
            Ok(()) => library
                .stop_capture(&mut mic, start + Duration::seconds(5))
                .map(|r| r.is_some()),
            Err(e) => Err(e),
        };
        if captured != Ok(true) {
            results.push(TestResult {
                name: format!("recording_capture_{}", take),
                passed: false,
                detail: format!("{:?}", captured),
            });
        }
    }
    results.push(TestResult {
        name: "recording_library_filled".into(),
        passed: library.recordings().len() == 2
            && library.selected().map(|r| r.uri.as_str()) == Some("file:///sim/recording-2.m4a"),
        detail: format!("{} recordings", library.recordings().len()),
    });

    let first = library.recordings()[0].id;
    let play = playback.toggle(&mut library, &mut speaker, first);
    let pause = playback.toggle(&mut library, &mut speaker, first);
    results.push(TestResult {
        name: "recording_play_pause".into(),
        passed: play == Ok(PlaybackState::Playing(first))
            && pause == Ok(PlaybackState::Paused(first)),
        detail: speaker.log.join(", "),
    });

    let store = seeded_store(config, 1);
    let gate = SendGate::new();
    for platform in [Platform::Android, Platform::Ios] {
        let platform_config = AppConfig {
            platform,
            ..config.clone()
        };
        let mut os = SimOs::new();
        let receipt = share_recording(
            &store,
            library.selected(),
            &platform_config,
            &mut os,
            &gate,
        );
        let expected = match platform {
            Platform::Android => Channel::DeepLink,
            Platform::Ios => Channel::ShareSheet,
        };
        results.push(TestResult {
            name: format!("recording_share_{:?}", platform).to_lowercase(),
            passed: receipt.as_ref().map(|r| r.channel) == Ok(expected)
                && os.external_calls() == 1,
            detail: receipt
                .as_ref()
                .map(|r| r.target.clone())
                .unwrap_or_else(|e| e.to_string()),
        });
        if verbose {
            if let Ok(r) = &receipt {
                println!("  {:?}: {}", platform, Notice::for_receipt(r));
            }
        }
    }

    let empty = ContactStore::new(config);
    let mut os = SimOs::new();
    let err = share_recording(&empty, library.selected(), config, &mut os, &gate);
    results.push(TestResult {
        name: "recording_share_zero_contacts".into(),
        passed: err == Err(SafetyError::NoContacts) && os.external_calls() == 0,
        detail: format!("{:?}", err.err()),
    });

    // the selected recording is still the loaded (paused) sound
    let deleted = library.selected().map(|r| r.id);
    let removed = match deleted {
        Some(id) => playback.delete(&mut library, &mut speaker, id),
        None => Ok(false),
    };
    results.push(TestResult {
        name: "recording_delete_unloads_and_clears_selection".into(),
        passed: removed == Ok(true)
            && playback.state() == PlaybackState::Idle
            && speaker.log.last().map(String::as_str) == Some("unload")
            && library.selected().is_none()
            && library.recordings().len() == 1,
        detail: format!("{} left", library.recordings().len()),
    });
    if let Err(e) = playback.release(&mut speaker) {
        log::warn!("release failed: {}", e);
    }

    results
}

// ── 7. Safety Bot ───────────────────────────────────────────────────────

fn validate_bot(config: &AppConfig, verbose: bool) -> Vec<TestResult> {
    section("Safety Bot");
    let mut results = Vec::new();
    let t0 = start_time();
    let mut rng = StdRng::seed_from_u64(2024);
    let mut chat = ChatTranscript::new(t0, config.bot_reply_delay_ms);

    let cases: [(&str, bool, &str); 6] = [
        ("give me a tip", false, "Here's a safety tip"),
        ("there's a fire", false, "dial 101"),
        ("natural disaster nearby", false, "emergency kit"),
        ("nearest hospital please", true, "I have your location"),
        ("nearest hospital please", false, "location permission"),
        ("blah", false, "not sure I understand"),
    ];
    for (input, has_location, expected) in cases {
        let reply = chat
            .send(input, has_location, t0, &mut rng)
            .map(|m| m.text.clone())
            .unwrap_or_default();
        results.push(TestResult {
            name: format!("bot_{}_loc_{}", input.replace(' ', "_"), has_location),
            passed: reply.contains(expected),
            detail: reply.lines().next().unwrap_or_default().to_string(),
        });
    }

    let blank = chat.send("   ", false, t0, &mut rng).is_none();
    let alternating = chat
        .messages()
        .iter()
        .skip(1)
        .enumerate()
        .all(|(i, m)| m.sender == if i % 2 == 0 { Sender::User } else { Sender::Bot });
    results.push(TestResult {
        name: "bot_transcript_shape".into(),
        passed: blank && alternating && chat.messages().len() == 1 + 2 * 6,
        detail: format!("{} messages", chat.messages().len()),
    });

    if verbose {
        println!("  Transcript:");
        for m in chat.messages() {
            println!("    [{:?}] {}", m.sender, m.text.lines().next().unwrap_or_default());
        }
    }

    results
}
