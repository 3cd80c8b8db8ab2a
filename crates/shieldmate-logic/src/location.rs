//! Consolidated location capability.
//!
//! Every flow that wants a coordinate goes through one [`LocationService`]
//! instead of prompting and fixing independently. The service remembers
//! the permission answer for the session and keeps the last fix, which is
//! reused while it is younger than the configured max age.
//!
//! ```
//! use chrono::{Duration, TimeZone, Utc};
//! use shieldmate_logic::location::{
//!     Coordinate, LocationProvider, LocationService, PermissionStatus,
//! };
//! use shieldmate_logic::SafetyResult;
//!
//! struct Fixed;
//! impl LocationProvider for Fixed {
//!     fn request_permission(&mut self) -> PermissionStatus {
//!         PermissionStatus::Granted
//!     }
//!     fn current_fix(&mut self) -> SafetyResult<Coordinate> {
//!         Ok(Coordinate::new(12.34, 56.78))
//!     }
//! }
//!
//! let mut service = LocationService::new(Fixed, Duration::seconds(60));
//! let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
//! assert_eq!(service.locate(now).unwrap().latitude, 12.34);
//! assert!(service.last_known(now + Duration::seconds(30)).is_some());
//! assert!(service.last_known(now + Duration::seconds(90)).is_none());
//! ```

use crate::error::{SafetyError, SafetyResult};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A geographic position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
    /// Horizontal accuracy in meters, when the platform reports it.
    pub accuracy: Option<f64>,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            accuracy: None,
        }
    }

    pub fn with_accuracy(mut self, meters: f64) -> Self {
        self.accuracy = Some(meters);
        self
    }

    /// Three display lines: latitude, longitude (6 decimals) and accuracy.
    pub fn describe(&self) -> [String; 3] {
        let accuracy = self
            .accuracy
            .map_or_else(|| "Unknown".to_string(), |a| format!("{a:.2}"));
        [
            format!("Latitude: {:.6}", self.latitude),
            format!("Longitude: {:.6}", self.longitude),
            format!("Accuracy: {accuracy} meters"),
        ]
    }
}

/// A coordinate stamped with its acquisition time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fix {
    pub coordinate: Coordinate,
    pub acquired_at: DateTime<Utc>,
}

impl Fix {
    /// Age at `now`. Fixes stamped in the future count as fresh.
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        (now - self.acquired_at).max(Duration::zero())
    }
}

/// Answer to a foreground location permission request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PermissionStatus {
    Granted,
    Denied,
}

/// Platform location collaborator. Both calls are one-shot.
pub trait LocationProvider {
    fn request_permission(&mut self) -> PermissionStatus;
    fn current_fix(&mut self) -> SafetyResult<Coordinate>;
}

/// What a screen shows in its location panel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LocationStatus {
    /// Nothing attempted yet.
    Pending,
    Located(Coordinate),
    Denied,
    Unavailable,
}

impl LocationStatus {
    pub fn label(&self) -> &'static str {
        match self {
            LocationStatus::Pending => "Getting location...",
            LocationStatus::Located(_) => "Location acquired",
            LocationStatus::Denied => "Permission to access location was denied",
            LocationStatus::Unavailable => "Could not get location",
        }
    }
}

/// Session-wide location capability with a "last fix, max age" contract.
pub struct LocationService<P> {
    provider: P,
    max_age: Duration,
    permission: Option<PermissionStatus>,
    last_fix: Option<Fix>,
    last_failed: bool,
}

impl<P: LocationProvider> LocationService<P> {
    pub fn new(provider: P, max_age: Duration) -> Self {
        Self {
            provider,
            max_age,
            permission: None,
            last_fix: None,
            last_failed: false,
        }
    }

    /// Service with the max age taken from seconds (as in `AppConfig`).
    pub fn with_max_age_secs(provider: P, secs: u64) -> Self {
        let secs = secs.min(u64::from(u32::MAX)) as i64;
        Self::new(provider, Duration::seconds(secs))
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn provider_mut(&mut self) -> &mut P {
        &mut self.provider
    }

    pub fn permission(&self) -> Option<PermissionStatus> {
        self.permission
    }

    /// The cached fix if it is no older than the max age.
    pub fn last_known(&self, now: DateTime<Utc>) -> Option<&Fix> {
        self.last_fix
            .as_ref()
            .filter(|fix| fix.age(now) <= self.max_age)
    }

    /// A fresh-enough coordinate, acquiring a new fix when needed.
    ///
    /// Permission is requested at most once per session; a denial is
    /// remembered until [`forget_permission`](Self::forget_permission).
    pub fn locate(&mut self, now: DateTime<Utc>) -> SafetyResult<Coordinate> {
        if let Some(fix) = self.last_known(now) {
            log::debug!("Reusing fix acquired at {}", fix.acquired_at);
            return Ok(fix.coordinate);
        }

        let permission = match self.permission {
            Some(status) => status,
            None => {
                let status = self.provider.request_permission();
                log::info!("Location permission answered: {:?}", status);
                self.permission = Some(status);
                status
            }
        };
        if permission == PermissionStatus::Denied {
            return Err(SafetyError::PermissionDenied);
        }

        match self.provider.current_fix() {
            Ok(coordinate) => {
                self.last_fix = Some(Fix {
                    coordinate,
                    acquired_at: now,
                });
                self.last_failed = false;
                log::info!("Acquired location fix");
                Ok(coordinate)
            }
            Err(e) => {
                log::warn!("Location fix failed: {}", e);
                self.last_failed = true;
                Err(SafetyError::LocationUnavailable)
            }
        }
    }

    /// Like [`locate`](Self::locate) for flows where location is optional.
    pub fn try_locate(&mut self, now: DateTime<Utc>) -> Option<Coordinate> {
        self.locate(now).ok()
    }

    /// Panel state as of `now`.
    pub fn status(&self, now: DateTime<Utc>) -> LocationStatus {
        if let Some(fix) = self.last_known(now) {
            return LocationStatus::Located(fix.coordinate);
        }
        match self.permission {
            Some(PermissionStatus::Denied) => LocationStatus::Denied,
            _ if self.last_failed => LocationStatus::Unavailable,
            _ => LocationStatus::Pending,
        }
    }

    /// Drop a remembered permission answer so the next call prompts again.
    pub fn forget_permission(&mut self) {
        self.permission = None;
    }
}
