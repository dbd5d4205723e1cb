// libs/appointment-cell/src/models.rs
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Duration, Utc, Weekday};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use shared_config::BusinessHours;
use shared_models::error::AppError;

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: Uuid,
    pub name: String,
    pub phone_number: String,
    pub service: ServiceType,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Half-open interval test against `[start, end)`.
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.start < end && start < self.end
    }
}

/// Services offered by the clinic. Keys and durations are part of the public
/// API and must not change.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ServiceType {
    Consultation,
    Treatment,
    Extraction,
    Prosthetics,
}

impl ServiceType {
    pub const ALL: [ServiceType; 4] = [
        ServiceType::Consultation,
        ServiceType::Treatment,
        ServiceType::Extraction,
        ServiceType::Prosthetics,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            ServiceType::Consultation => "consultation",
            ServiceType::Treatment => "treatment",
            ServiceType::Extraction => "extraction",
            ServiceType::Prosthetics => "prosthetics",
        }
    }

    pub fn duration_minutes(&self) -> i64 {
        match self {
            ServiceType::Consultation => 15,
            ServiceType::Treatment | ServiceType::Extraction | ServiceType::Prosthetics => 45,
        }
    }

    pub fn duration(&self) -> Duration {
        Duration::minutes(self.duration_minutes())
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

impl FromStr for ServiceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        ServiceType::ALL
            .into_iter()
            .find(|service| service.key() == wanted)
            .ok_or_else(|| format!("unknown service '{}'", s.trim()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceInfo {
    pub key: ServiceType,
    pub duration_minutes: i64,
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

/// Raw booking request. Fields stay as strings so that validation can report
/// exactly which field is wrong instead of failing at deserialization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppointmentDraft {
    pub name: String,
    pub phone_number: String,
    pub service: String,
    pub start: String,
    /// Minutes east of UTC, applied when `start` carries no offset.
    pub tz_offset: Option<i32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppointmentPatch {
    pub name: Option<String>,
    pub phone_number: Option<String>,
    pub service: Option<String>,
    pub start: Option<String>,
    pub tz_offset: Option<i32>,
}

impl AppointmentPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.phone_number.is_none()
            && self.service.is_none()
            && self.start.is_none()
    }
}

// ==============================================================================
// AVAILABILITY MODELS
// ==============================================================================

/// Working hours for a single day plus the slot width used to slice them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AvailabilityWindow {
    pub start_hour: u32,
    pub end_hour: u32,
    pub granularity_minutes: i64,
    pub closed_days: Vec<Weekday>,
}

impl AvailabilityWindow {
    pub fn new(start_hour: u32, end_hour: u32, granularity_minutes: i64) -> Self {
        Self {
            start_hour,
            end_hour,
            granularity_minutes,
            closed_days: Vec::new(),
        }
    }

    pub fn from_config(hours: &BusinessHours) -> Self {
        Self {
            start_hour: hours.open_hour,
            end_hour: hours.close_hour,
            granularity_minutes: hours.slot_minutes,
            closed_days: hours.closed_days.clone(),
        }
    }

    pub fn with_closed_days(mut self, days: Vec<Weekday>) -> Self {
        self.closed_days = days;
        self
    }

    pub fn granularity(&self) -> Duration {
        Duration::minutes(self.granularity_minutes)
    }

    /// Tolerance used when matching a busy slot to an appointment whose stored
    /// start does not line up with the grid. Scales with the slot width.
    pub fn match_tolerance(&self) -> Duration {
        self.granularity()
    }

    pub fn is_closed_on(&self, day: Weekday) -> bool {
        self.closed_days.contains(&day)
    }
}

impl Default for AvailabilityWindow {
    fn default() -> Self {
        Self::from_config(&BusinessHours::default())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SlotStatus {
    Available,
    Busy,
    Unavailable,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Slot {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub label: String,
    pub status: SlotStatus,
    /// Lookup reference to the booking occupying this slot, when one resolves.
    pub appointment_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityResponse {
    pub available_slots: Vec<DateTime<Utc>>,
    pub busy_slots: Vec<DateTime<Utc>>,
    pub working_slots: Vec<DateTime<Utc>>,
}

// ==============================================================================
// QUERY MODELS
// ==============================================================================

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StatusBucket {
    #[default]
    All,
    Today,
    Upcoming,
    Past,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DateRange {
    #[default]
    All,
    Week,
    Month,
}

/// Filters for list views. Every field is optional and they combine with AND.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct QueryFilters {
    pub search: Option<String>,
    pub status: StatusBucket,
    pub service: Option<ServiceType>,
    pub range: DateRange,
    /// Minutes east of UTC used to decide what "today" means.
    pub tz_offset: i32,
}

// ==============================================================================
// INVALIDATION
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Created,
    Updated,
    Deleted,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Change {
    pub kind: ChangeKind,
    pub appointment_id: Uuid,
}

/// Published after every successful commit. `generation` increases by one per
/// commit; `change` is `None` only for the initial value.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Invalidation {
    pub generation: u64,
    pub change: Option<Change>,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AppointmentError {
    #[error("Invalid {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Appointment conflicts with existing booking {conflicting_id} ({start} - {end})")]
    Conflict {
        conflicting_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("Appointment {0} not found")]
    NotFound(Uuid),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl AppointmentError {
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        AppointmentError::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            AppointmentError::Validation { .. } => "validation",
            AppointmentError::Conflict { .. } => "conflict",
            AppointmentError::NotFound(_) => "not_found",
            AppointmentError::Storage(_) => "storage",
        }
    }

    /// Whether the caller can fix the request and retry.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, AppointmentError::Storage(_))
    }
}

impl From<AppointmentError> for AppError {
    fn from(err: AppointmentError) -> Self {
        match err {
            AppointmentError::Validation { field, message } => {
                AppError::ValidationError { field, message }
            }
            e @ AppointmentError::Conflict { .. } => AppError::Conflict(e.to_string()),
            e @ AppointmentError::NotFound(_) => AppError::NotFound(e.to_string()),
            AppointmentError::Storage(msg) => AppError::Storage(msg),
        }
    }
}
