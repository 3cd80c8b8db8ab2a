//! Simulated platform collaborators for the harness.
//!
//! Each fake records what it was asked to do so checks can assert on the
//! exact URLs and share requests the flows produced.

use shieldmate_logic::dispatch::{Delivery, Messenger, ShareRequest};
use shieldmate_logic::location::{Coordinate, LocationProvider, PermissionStatus};
use shieldmate_logic::recording::{AudioPlayer, AudioRecorder};
use shieldmate_logic::{SafetyError, SafetyResult};

pub struct SimGps {
    pub permission: PermissionStatus,
    pub coordinate: Option<Coordinate>,
    pub prompts: usize,
    pub fixes: usize,
}

impl SimGps {
    pub fn granted(coordinate: Coordinate) -> Self {
        Self {
            permission: PermissionStatus::Granted,
            coordinate: Some(coordinate),
            prompts: 0,
            fixes: 0,
        }
    }

    pub fn denied() -> Self {
        Self {
            permission: PermissionStatus::Denied,
            coordinate: None,
            prompts: 0,
            fixes: 0,
        }
    }
}

impl LocationProvider for SimGps {
    fn request_permission(&mut self) -> PermissionStatus {
        self.prompts += 1;
        self.permission
    }

    fn current_fix(&mut self) -> SafetyResult<Coordinate> {
        self.fixes += 1;
        self.coordinate
            .ok_or_else(|| SafetyError::OperationFailed("no fix".into()))
    }
}

/// Messaging surface. `has_sms_app = false` simulates a device without
/// an SMS handler.
pub struct SimOs {
    pub has_sms_app: bool,
    pub opened: Vec<String>,
    pub shared: Vec<ShareRequest>,
}

impl Default for SimOs {
    fn default() -> Self {
        Self {
            has_sms_app: true,
            opened: Vec::new(),
            shared: Vec::new(),
        }
    }
}

impl SimOs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn external_calls(&self) -> usize {
        self.opened.len() + self.shared.len()
    }
}

impl Messenger for SimOs {
    fn can_open_url(&mut self, url: &str) -> bool {
        self.has_sms_app || !url.starts_with("sms")
    }

    fn open_url(&mut self, url: &str) -> SafetyResult<Delivery> {
        if !self.can_open_url(url) {
            return Err(SafetyError::PlatformUnavailable {
                url: url.to_string(),
            });
        }
        self.opened.push(url.to_string());
        Ok(Delivery::HandedOff)
    }

    fn share_file(&mut self, request: &ShareRequest) -> SafetyResult<Delivery> {
        self.shared.push(request.clone());
        Ok(Delivery::HandedOff)
    }
}

#[derive(Default)]
pub struct SimMic {
    pub takes: usize,
}

impl AudioRecorder for SimMic {
    fn start(&mut self) -> SafetyResult<()> {
        Ok(())
    }

    fn stop(&mut self) -> SafetyResult<Option<String>> {
        self.takes += 1;
        Ok(Some(format!("file:///sim/recording-{}.m4a", self.takes)))
    }
}

#[derive(Default)]
pub struct SimSpeaker {
    pub log: Vec<String>,
}

impl AudioPlayer for SimSpeaker {
    fn load(&mut self, uri: &str) -> SafetyResult<()> {
        self.log.push(format!("load {uri}"));
        Ok(())
    }

    fn play(&mut self) -> SafetyResult<()> {
        self.log.push("play".into());
        Ok(())
    }

    fn pause(&mut self) -> SafetyResult<()> {
        self.log.push("pause".into());
        Ok(())
    }

    fn unload(&mut self) -> SafetyResult<()> {
        self.log.push("unload".into());
        Ok(())
    }
}
