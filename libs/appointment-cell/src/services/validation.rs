use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};
use regex::Regex;
use tracing::debug;

use crate::models::{AppointmentDraft, AppointmentError, ServiceType};

/// Digits, spaces, `+`, `-` and parentheses.
const PHONE_PATTERN: &str = r"^[0-9\s+\-()]+$";

const NAIVE_START_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"];

/// Booking fields after validation, ready to be turned into an appointment.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedDraft {
    pub name: String,
    pub phone_number: String,
    pub service: ServiceType,
    pub start: DateTime<Utc>,
}

pub struct DraftValidator {
    phone_pattern: Regex,
}

impl DraftValidator {
    pub fn new() -> Self {
        Self {
            phone_pattern: Regex::new(PHONE_PATTERN).expect("phone pattern is a valid regex"),
        }
    }

    pub fn validate_draft(&self, draft: &AppointmentDraft) -> Result<ValidatedDraft, AppointmentError> {
        debug!("Validating booking draft for service '{}'", draft.service);

        Ok(ValidatedDraft {
            name: self.validate_name(&draft.name)?,
            phone_number: self.validate_phone(&draft.phone_number)?,
            service: self.parse_service(&draft.service)?,
            start: self.parse_start(&draft.start, draft.tz_offset)?,
        })
    }

    pub fn validate_name(&self, name: &str) -> Result<String, AppointmentError> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(AppointmentError::validation("name", "patient name is required"));
        }
        Ok(trimmed.to_string())
    }

    pub fn validate_phone(&self, phone: &str) -> Result<String, AppointmentError> {
        let trimmed = phone.trim();
        if trimmed.is_empty() {
            return Err(AppointmentError::validation("phoneNumber", "phone number is required"));
        }
        if !self.phone_pattern.is_match(trimmed) || !trimmed.chars().any(|c| c.is_ascii_digit()) {
            return Err(AppointmentError::validation(
                "phoneNumber",
                "phone number may only contain digits, spaces, '+', '-' and parentheses",
            ));
        }
        Ok(trimmed.to_string())
    }

    pub fn parse_service(&self, service: &str) -> Result<ServiceType, AppointmentError> {
        if service.trim().is_empty() {
            return Err(AppointmentError::validation("service", "service is required"));
        }
        service
            .parse::<ServiceType>()
            .map_err(|e| AppointmentError::validation("service", e))
    }

    /// Parses an RFC 3339 instant. Strings without an offset are read as wall
    /// clock time at `tz_offset` minutes east of UTC (UTC when absent).
    pub fn parse_start(
        &self,
        start: &str,
        tz_offset: Option<i32>,
    ) -> Result<DateTime<Utc>, AppointmentError> {
        let trimmed = start.trim();
        if trimmed.is_empty() {
            return Err(AppointmentError::validation("start", "start time is required"));
        }

        if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
            return Ok(parsed.with_timezone(&Utc));
        }

        let naive = NAIVE_START_FORMATS
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
            .ok_or_else(|| {
                AppointmentError::validation("start", format!("'{}' is not a valid date-time", trimmed))
            })?;

        let offset = fixed_offset(tz_offset.unwrap_or(0))?;
        offset
            .from_local_datetime(&naive)
            .single()
            .map(|local| local.with_timezone(&Utc))
            .ok_or_else(|| AppointmentError::validation("start", "start time is ambiguous"))
    }
}

impl Default for DraftValidator {
    fn default() -> Self {
        Self::new()
    }
}

pub fn fixed_offset(tz_offset_minutes: i32) -> Result<FixedOffset, AppointmentError> {
    tz_offset_minutes
        .checked_mul(60)
        .and_then(FixedOffset::east_opt)
        .ok_or_else(|| {
            AppointmentError::validation(
                "tzOffset",
                format!("offset of {} minutes is out of range", tz_offset_minutes),
            )
        })
}
