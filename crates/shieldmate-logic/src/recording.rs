//! Audio capture library and playback state.
//!
//! The record screen keeps a session-local list of completed captures, one
//! of which may be selected for sharing. Playback is a small state machine
//! over a single loaded sound: tapping the playing recording pauses it,
//! tapping a paused one resumes it, tapping another one swaps the loaded
//! sound and plays it from the start.

use crate::error::{SafetyError, SafetyResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifier of a completed capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordingId(Uuid);

impl RecordingId {
    fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for RecordingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// A completed audio capture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recording {
    pub id: RecordingId,
    /// Platform file handle (usually a `file://` URI).
    pub uri: String,
    pub duration_ms: u64,
    pub recorded_at: DateTime<Utc>,
}

/// Platform capture collaborator.
pub trait AudioRecorder {
    fn start(&mut self) -> SafetyResult<()>;
    /// Stop and unload. `None` when the platform produced no file.
    fn stop(&mut self) -> SafetyResult<Option<String>>;
}

/// Platform playback collaborator for a single loaded sound.
pub trait AudioPlayer {
    fn load(&mut self, uri: &str) -> SafetyResult<()>;
    fn play(&mut self) -> SafetyResult<()>;
    fn pause(&mut self) -> SafetyResult<()>;
    fn unload(&mut self) -> SafetyResult<()>;
}

/// Session-local list of captures plus the current selection.
#[derive(Debug, Default)]
pub struct RecordingLibrary {
    recordings: Vec<Recording>,
    selected: Option<RecordingId>,
    capture_started_at: Option<DateTime<Utc>>,
}

impl RecordingLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn recordings(&self) -> &[Recording] {
        &self.recordings
    }

    pub fn is_capturing(&self) -> bool {
        self.capture_started_at.is_some()
    }

    pub fn get(&self, id: &RecordingId) -> Option<&Recording> {
        self.recordings.iter().find(|r| r.id == *id)
    }

    pub fn selected(&self) -> Option<&Recording> {
        self.selected.as_ref().and_then(|id| self.get(id))
    }

    /// Select a recording for sharing. Returns false for unknown ids.
    pub fn select(&mut self, id: RecordingId) -> bool {
        if self.get(&id).is_some() {
            self.selected = Some(id);
            true
        } else {
            false
        }
    }

    /// Begin a capture. Only one capture can run at a time.
    pub fn start_capture<R: AudioRecorder>(
        &mut self,
        recorder: &mut R,
        now: DateTime<Utc>,
    ) -> SafetyResult<()> {
        if self.is_capturing() {
            return Err(SafetyError::OperationFailed(
                "a recording is already in progress".into(),
            ));
        }
        recorder.start().map_err(|e| {
            log::warn!("Capture start failed: {}", e);
            SafetyError::OperationFailed("failed to start recording".into())
        })?;
        self.capture_started_at = Some(now);
        log::info!("Capture started");
        Ok(())
    }

    /// Finish the running capture, append it and select it.
    ///
    /// Without a running capture this does nothing. If the platform fails
    /// to stop, the capture stays running so the user can try again.
    pub fn stop_capture<R: AudioRecorder>(
        &mut self,
        recorder: &mut R,
        now: DateTime<Utc>,
    ) -> SafetyResult<Option<&Recording>> {
        let Some(started_at) = self.capture_started_at else {
            return Ok(None);
        };
        let uri = recorder.stop().map_err(|e| {
            log::warn!("Capture stop failed: {}", e);
            SafetyError::OperationFailed("failed to stop recording".into())
        })?;
        self.capture_started_at = None;

        let Some(uri) = uri else {
            log::warn!("Capture stopped without a file");
            return Ok(None);
        };
        let duration_ms = (now - started_at).num_milliseconds().max(0) as u64;
        let recording = Recording {
            id: RecordingId::generate(),
            uri,
            duration_ms,
            recorded_at: now,
        };
        log::info!("Capture {} saved ({} ms)", recording.id, duration_ms);
        self.selected = Some(recording.id);
        self.recordings.push(recording);
        Ok(self.recordings.last())
    }

    /// Drop a recording from the list, clearing the selection if it was
    /// the selected one. Returns whether anything was removed.
    ///
    /// Does not touch playback; when a [`Playback`] may hold this recording,
    /// delete through [`Playback::delete`] instead.
    pub fn delete(&mut self, id: RecordingId) -> bool {
        let before = self.recordings.len();
        self.recordings.retain(|r| r.id != id);
        if self.selected == Some(id) {
            self.selected = None;
        }
        self.recordings.len() != before
    }
}

/// Playback state of the single loaded sound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    Idle,
    Playing(RecordingId),
    Paused(RecordingId),
}

/// Playback controller tracking which recording is loaded.
#[derive(Debug, Default)]
pub struct Playback {
    state: PlaybackState,
    loaded: Option<RecordingId>,
}

impl Playback {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_playing(&self, id: RecordingId) -> bool {
        self.state == PlaybackState::Playing(id)
    }

    /// Play/pause tap on a recording row.
    pub fn toggle<P: AudioPlayer>(
        &mut self,
        library: &mut RecordingLibrary,
        player: &mut P,
        id: RecordingId,
    ) -> SafetyResult<PlaybackState> {
        match self.state {
            PlaybackState::Playing(current) if current == id => {
                player.pause().map_err(playback_failed)?;
                self.state = PlaybackState::Paused(id);
                return Ok(self.state);
            }
            PlaybackState::Paused(current) if current == id && self.loaded == Some(id) => {
                player.play().map_err(playback_failed)?;
                self.state = PlaybackState::Playing(id);
                return Ok(self.state);
            }
            _ => {}
        }

        let uri = library
            .get(&id)
            .map(|r| r.uri.clone())
            .ok_or_else(|| SafetyError::OperationFailed(format!("unknown recording {id}")))?;

        self.unload_current(player)?;
        player.load(&uri).map_err(playback_failed)?;
        self.loaded = Some(id);
        library.select(id);
        player.play().map_err(playback_failed)?;
        self.state = PlaybackState::Playing(id);
        log::debug!("Playing recording {}", id);
        Ok(self.state)
    }

    /// Platform status callback: the loaded sound reached its end.
    pub fn on_playback_finished(&mut self) {
        if let PlaybackState::Playing(_) = self.state {
            self.state = PlaybackState::Idle;
        }
    }

    /// Unload whatever is loaded (screen teardown, or before deleting it).
    pub fn release<P: AudioPlayer>(&mut self, player: &mut P) -> SafetyResult<()> {
        self.unload_current(player)
    }

    /// Delete a recording, unloading it first when it is the loaded sound.
    /// If the unload fails nothing is deleted.
    pub fn delete<P: AudioPlayer>(
        &mut self,
        library: &mut RecordingLibrary,
        player: &mut P,
        id: RecordingId,
    ) -> SafetyResult<bool> {
        if self.loaded == Some(id) {
            self.unload_current(player)?;
        }
        Ok(library.delete(id))
    }

    /// State only changes once the player has accepted the unload.
    fn unload_current<P: AudioPlayer>(&mut self, player: &mut P) -> SafetyResult<()> {
        if self.loaded.is_some() {
            player.unload().map_err(playback_failed)?;
            self.loaded = None;
        }
        self.state = PlaybackState::Idle;
        Ok(())
    }
}

fn playback_failed(e: SafetyError) -> SafetyError {
    log::warn!("Playback failed: {}", e);
    SafetyError::OperationFailed("failed to play recording".into())
}
