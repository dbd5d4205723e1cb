use chrono::{DateTime, Duration, Utc};

use crate::models::{Appointment, DateRange, QueryFilters, StatusBucket};
use crate::services::grid::local_date;

/// Filters and orders appointments for list views, newest start first.
///
/// `now` is taken as a parameter so that every bucket in one call is judged
/// against the same instant.
pub fn query(
    appointments: &[Appointment],
    filters: &QueryFilters,
    now: DateTime<Utc>,
) -> Vec<Appointment> {
    let needle = filters
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(SearchTerm::new);

    let mut matches: Vec<Appointment> = appointments
        .iter()
        .filter(|apt| needle.as_ref().map_or(true, |term| term.matches(apt)))
        .filter(|apt| matches_status(apt, filters.status, now, filters.tz_offset))
        .filter(|apt| filters.service.map_or(true, |service| apt.service == service))
        .filter(|apt| matches_range(apt, filters.range, now))
        .cloned()
        .collect();

    matches.sort_by(|a, b| b.start.cmp(&a.start).then(a.id.cmp(&b.id)));
    matches
}

/// Same as [`query`] with `now` sampled once from the system clock.
pub fn query_now(appointments: &[Appointment], filters: &QueryFilters) -> Vec<Appointment> {
    query(appointments, filters, Utc::now())
}

struct SearchTerm {
    lowered: String,
    digits: String,
}

impl SearchTerm {
    fn new(raw: &str) -> Self {
        Self {
            lowered: raw.to_lowercase(),
            digits: digits_of(raw),
        }
    }

    fn matches(&self, apt: &Appointment) -> bool {
        if apt.name.to_lowercase().contains(&self.lowered) {
            return true;
        }
        !self.digits.is_empty() && digits_of(&apt.phone_number).contains(&self.digits)
    }
}

fn digits_of(value: &str) -> String {
    value.chars().filter(|c| c.is_ascii_digit()).collect()
}

fn matches_status(apt: &Appointment, bucket: StatusBucket, now: DateTime<Utc>, tz_offset: i32) -> bool {
    match bucket {
        StatusBucket::All => true,
        StatusBucket::Today => local_date(apt.start, tz_offset) == local_date(now, tz_offset),
        StatusBucket::Upcoming => apt.start > now,
        StatusBucket::Past => apt.start < now,
    }
}

fn matches_range(apt: &Appointment, range: DateRange, now: DateTime<Utc>) -> bool {
    match range {
        DateRange::All => true,
        DateRange::Week => apt.start >= now - Duration::days(7),
        DateRange::Month => apt.start >= now - Duration::days(30),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ServiceType;
    use chrono::TimeZone;
    use uuid::Uuid;

    fn apt(name: &str, phone: &str, service: ServiceType, start: DateTime<Utc>) -> Appointment {
        Appointment {
            id: Uuid::new_v4(),
            name: name.to_string(),
            phone_number: phone.to_string(),
            service,
            start,
            end: start + service.duration(),
            created_at: start,
            updated_at: start,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap()
    }

    fn sample() -> Vec<Appointment> {
        vec![
            apt("Ana Costa", "+351 912 111 222", ServiceType::Consultation, now() - Duration::days(40)),
            apt("Bruno Dias", "(21) 555-0100", ServiceType::Treatment, now() - Duration::days(3)),
            apt("Carla Reis", "912 333 444", ServiceType::Extraction, now() - Duration::hours(2)),
            apt("Diogo Ana", "930 000 000", ServiceType::Prosthetics, now() + Duration::hours(3)),
            apt("Eva Lopes", "915 555 666", ServiceType::Consultation, now() + Duration::days(2)),
        ]
    }

    fn names(result: &[Appointment]) -> Vec<&str> {
        result.iter().map(|a| a.name.as_str()).collect()
    }

    #[test]
    fn test_no_filters_sorts_newest_first() {
        let result = query(&sample(), &QueryFilters::default(), now());
        assert_eq!(
            names(&result),
            vec!["Eva Lopes", "Diogo Ana", "Carla Reis", "Bruno Dias", "Ana Costa"]
        );
    }

    #[test]
    fn test_search_matches_name_case_insensitively() {
        let filters = QueryFilters {
            search: Some("ANA".to_string()),
            ..Default::default()
        };
        assert_eq!(names(&query(&sample(), &filters, now())), vec!["Diogo Ana", "Ana Costa"]);
    }

    #[test]
    fn test_search_matches_phone_digits() {
        let filters = QueryFilters {
            search: Some("555-01".to_string()),
            ..Default::default()
        };
        assert_eq!(names(&query(&sample(), &filters, now())), vec!["Bruno Dias"]);

        let filters = QueryFilters {
            search: Some("912".to_string()),
            ..Default::default()
        };
        assert_eq!(names(&query(&sample(), &filters, now())), vec!["Carla Reis", "Ana Costa"]);
    }

    #[test]
    fn test_status_buckets() {
        let today = QueryFilters {
            status: StatusBucket::Today,
            ..Default::default()
        };
        assert_eq!(names(&query(&sample(), &today, now())), vec!["Diogo Ana", "Carla Reis"]);

        let upcoming = QueryFilters {
            status: StatusBucket::Upcoming,
            ..Default::default()
        };
        assert_eq!(names(&query(&sample(), &upcoming, now())), vec!["Eva Lopes", "Diogo Ana"]);

        let past = QueryFilters {
            status: StatusBucket::Past,
            ..Default::default()
        };
        assert_eq!(
            names(&query(&sample(), &past, now())),
            vec!["Carla Reis", "Bruno Dias", "Ana Costa"]
        );
    }

    #[test]
    fn test_today_follows_offset() {
        // 23:30 UTC on the 14th is already the 15th at UTC+1.
        let late = apt("Late", "1", ServiceType::Consultation, now() - Duration::minutes(750));
        let filters = QueryFilters {
            status: StatusBucket::Today,
            tz_offset: 60,
            ..Default::default()
        };
        assert_eq!(query(&[late.clone()], &filters, now()).len(), 1);
        assert!(query(&[late], &QueryFilters { tz_offset: 0, ..filters }, now()).is_empty());
    }

    #[test]
    fn test_filters_compose() {
        let filters = QueryFilters {
            service: Some(ServiceType::Consultation),
            range: DateRange::Month,
            ..Default::default()
        };
        assert_eq!(names(&query(&sample(), &filters, now())), vec!["Eva Lopes"]);

        let week = QueryFilters {
            range: DateRange::Week,
            status: StatusBucket::Past,
            ..Default::default()
        };
        assert_eq!(names(&query(&sample(), &week, now())), vec!["Carla Reis", "Bruno Dias"]);
    }

    #[test]
    fn test_query_is_idempotent() {
        let data = sample();
        let filters = QueryFilters {
            search: Some("a".to_string()),
            ..Default::default()
        };
        assert_eq!(query(&data, &filters, now()), query(&data, &filters, now()));
    }
}
