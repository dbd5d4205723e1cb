//! Display-side lookup of the booking behind a busy slot.
//!
//! Nothing here may be used to decide whether a booking is allowed; see
//! `conflict` for that.

use chrono::{DateTime, Duration, Utc};

use crate::models::Appointment;
use crate::services::grid::local_date;

/// Appointment whose stored interval fully contains `[slot_start, slot_end)`.
pub fn find_containing<'a>(
    appointments: &'a [Appointment],
    slot_start: DateTime<Utc>,
    slot_end: DateTime<Utc>,
) -> Option<&'a Appointment> {
    appointments
        .iter()
        .filter(|apt| apt.start <= slot_start && slot_end <= apt.end)
        .min_by_key(|apt| (apt.start, apt.id))
}

/// Best-effort match for appointments that do not line up with the grid:
/// same local calendar day and a start within `tolerance` of the slot start.
/// The closest start wins.
pub fn find_nearby<'a>(
    appointments: &'a [Appointment],
    slot_start: DateTime<Utc>,
    tolerance: Duration,
    tz_offset_minutes: i32,
) -> Option<&'a Appointment> {
    let slot_day = local_date(slot_start, tz_offset_minutes);

    appointments
        .iter()
        .filter(|apt| local_date(apt.start, tz_offset_minutes) == slot_day)
        .map(|apt| (distance(apt.start, slot_start), apt))
        .filter(|(gap, _)| *gap <= tolerance)
        .min_by_key(|(gap, apt)| (*gap, apt.start, apt.id))
        .map(|(_, apt)| apt)
}

fn distance(a: DateTime<Utc>, b: DateTime<Utc>) -> Duration {
    if a >= b { a - b } else { b - a }
}

/// Containment first, then the tolerant fallback.
pub fn resolve_owner<'a>(
    appointments: &'a [Appointment],
    slot_start: DateTime<Utc>,
    slot_end: DateTime<Utc>,
    tolerance: Duration,
    tz_offset_minutes: i32,
) -> Option<&'a Appointment> {
    find_containing(appointments, slot_start, slot_end)
        .or_else(|| find_nearby(appointments, slot_start, tolerance, tz_offset_minutes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ServiceType;
    use chrono::TimeZone;
    use uuid::Uuid;

    fn at(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, day, hour, minute, 0).unwrap()
    }

    fn appointment(start: DateTime<Utc>) -> Appointment {
        Appointment {
            id: Uuid::new_v4(),
            name: "Drift".to_string(),
            phone_number: "555".to_string(),
            service: ServiceType::Consultation,
            start,
            end: start + ServiceType::Consultation.duration(),
            created_at: start,
            updated_at: start,
        }
    }

    #[test]
    fn test_containment_match() {
        let list = vec![appointment(at(1, 10, 0))];
        let found = find_containing(&list, at(1, 10, 0), at(1, 10, 15));
        assert_eq!(found.map(|a| a.id), Some(list[0].id));
        assert!(find_containing(&list, at(1, 10, 5), at(1, 10, 20)).is_none());
    }

    #[test]
    fn test_off_grid_appointment_falls_back_to_nearby() {
        // 10:10-10:25 does not contain the 10:15 slot but is within one slot width.
        let list = vec![appointment(at(1, 10, 10))];
        let tolerance = Duration::minutes(15);

        assert!(find_containing(&list, at(1, 10, 15), at(1, 10, 30)).is_none());
        let found = resolve_owner(&list, at(1, 10, 15), at(1, 10, 30), tolerance, 0);
        assert_eq!(found.map(|a| a.id), Some(list[0].id));
    }

    #[test]
    fn test_nearby_requires_same_local_day() {
        let list = vec![appointment(at(1, 23, 55))];
        let tolerance = Duration::minutes(15);

        assert!(find_nearby(&list, at(2, 0, 5), tolerance, 0).is_none());
        // At UTC-1 both instants fall on 1 January.
        assert!(find_nearby(&list, at(2, 0, 5), tolerance, -60).is_some());
    }

    #[test]
    fn test_nearby_tolerance_scales() {
        let list = vec![appointment(at(1, 10, 25))];
        assert!(find_nearby(&list, at(1, 10, 0), Duration::minutes(15), 0).is_none());
        assert!(find_nearby(&list, at(1, 10, 0), Duration::minutes(30), 0).is_some());
    }
}
