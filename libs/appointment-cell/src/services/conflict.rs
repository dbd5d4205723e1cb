use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::Appointment;

/// Two half-open intervals overlap when `start1 < end2 && start2 < end1`.
/// Touching intervals (`end1 == start2`) do not overlap.
pub fn intervals_overlap(
    start1: DateTime<Utc>,
    end1: DateTime<Utc>,
    start2: DateTime<Utc>,
    end2: DateTime<Utc>,
) -> bool {
    start1 < end2 && start2 < end1
}

/// First appointment, by start time, whose interval intersects `[start, end)`.
///
/// This is the only check used to guard the booking invariant; it is exact and
/// never tolerates drift.
pub fn find_conflict<'a>(
    appointments: impl IntoIterator<Item = &'a Appointment>,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    exclude_appointment_id: Option<Uuid>,
) -> Option<&'a Appointment> {
    appointments
        .into_iter()
        .filter(|apt| Some(apt.id) != exclude_appointment_id)
        .filter(|apt| intervals_overlap(start, end, apt.start, apt.end))
        .min_by_key(|apt| (apt.start, apt.id))
}

pub fn has_conflict<'a>(
    appointments: impl IntoIterator<Item = &'a Appointment>,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> bool {
    find_conflict(appointments, start, end, None).is_some()
}
