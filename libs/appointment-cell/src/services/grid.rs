use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};

use crate::models::AvailabilityWindow;

/// UTC instant of local midnight for `date`, where the local clock runs
/// `tz_offset_minutes` ahead of UTC.
pub fn local_midnight_utc(date: NaiveDate, tz_offset_minutes: i32) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc() - Duration::minutes(tz_offset_minutes as i64)
}

/// Calendar day an instant falls on in the given offset.
pub fn local_date(instant: DateTime<Utc>, tz_offset_minutes: i32) -> NaiveDate {
    (instant + Duration::minutes(tz_offset_minutes as i64)).date_naive()
}

/// Wall-clock `HH:MM` label for a slot start.
pub fn slot_label(instant: DateTime<Utc>, tz_offset_minutes: i32) -> String {
    (instant + Duration::minutes(tz_offset_minutes as i64))
        .format("%H:%M")
        .to_string()
}

/// Candidate slot starts for one day, in ascending order.
///
/// Steps from `window.start_hour` to `window.end_hour` in
/// `window.granularity_minutes` increments, keeping only slots that end by
/// closing time. A misconfigured window (end not after start, or a
/// non-positive granularity) yields no slots rather than an error.
pub fn generate_slots(
    date: NaiveDate,
    window: &AvailabilityWindow,
    tz_offset_minutes: i32,
) -> Vec<DateTime<Utc>> {
    if window.end_hour <= window.start_hour || window.granularity_minutes <= 0 {
        return Vec::new();
    }

    let midnight = local_midnight_utc(date, tz_offset_minutes);
    let open = midnight + Duration::hours(window.start_hour as i64);
    let open_minutes = (window.end_hour - window.start_hour) as i64 * 60;
    let count = open_minutes / window.granularity_minutes;

    (0..count)
        .map(|i| open + Duration::minutes(i * window.granularity_minutes))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    #[test]
    fn test_default_window_has_36_slots() {
        let slots = generate_slots(day(), &AvailabilityWindow::default(), 0);
        assert_eq!(slots.len(), 36);
        assert_eq!(slots[0].to_rfc3339(), "2024-01-01T09:00:00+00:00");
        assert_eq!(slots[35].to_rfc3339(), "2024-01-01T17:45:00+00:00");
    }

    #[test]
    fn test_offset_shifts_slots_into_utc() {
        let slots = generate_slots(day(), &AvailabilityWindow::new(9, 10, 30), 120);
        assert_eq!(slots.len(), 2);
        assert_eq!(slots[0].to_rfc3339(), "2024-01-01T07:00:00+00:00");
        assert_eq!(slot_label(slots[0], 120), "09:00");
        assert_eq!(local_date(slots[0], 120), day());
    }

    #[test]
    fn test_negative_offset_crosses_into_next_utc_day() {
        let slots = generate_slots(day(), &AvailabilityWindow::new(17, 18, 60), -480);
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].to_rfc3339(), "2024-01-02T01:00:00+00:00");
        assert_eq!(local_date(slots[0], -480), day());
    }

    #[test]
    fn test_invalid_windows_yield_no_slots() {
        assert!(generate_slots(day(), &AvailabilityWindow::new(18, 9, 15), 0).is_empty());
        assert!(generate_slots(day(), &AvailabilityWindow::new(9, 9, 15), 0).is_empty());
        assert!(generate_slots(day(), &AvailabilityWindow::new(9, 18, 0), 0).is_empty());
        assert!(generate_slots(day(), &AvailabilityWindow::new(9, 18, -15), 0).is_empty());
    }

    #[test]
    fn test_partial_trailing_slot_is_dropped() {
        // 60 minutes sliced into 40 minute slots leaves one whole slot.
        let slots = generate_slots(day(), &AvailabilityWindow::new(9, 10, 40), 0);
        assert_eq!(slots.len(), 1);
    }

    #[test]
    fn test_generation_is_repeatable() {
        let window = AvailabilityWindow::default();
        assert_eq!(generate_slots(day(), &window, 60), generate_slots(day(), &window, 60));
    }
}
