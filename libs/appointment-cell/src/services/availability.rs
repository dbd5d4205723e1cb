use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use moka::future::Cache;
use tokio::sync::{watch, Mutex};
use tracing::debug;

use crate::models::{
    Appointment, AvailabilityResponse, AvailabilityWindow, Invalidation, ServiceType, Slot,
    SlotStatus,
};
use crate::services::conflict::{has_conflict, intervals_overlap};
use crate::services::grid::{generate_slots, local_midnight_utc, slot_label};
use crate::services::matching::resolve_owner;
use crate::services::repository::{AppointmentRepository, Snapshot};

/// Classifies every grid slot of one day against a set of bookings.
///
/// A slot is `busy` when any booking intersects it, `available` when it lies
/// inside working hours on an open day, and `unavailable` otherwise.
pub fn classify_slots(
    date: NaiveDate,
    window: &AvailabilityWindow,
    tz_offset_minutes: i32,
    appointments: &[Appointment],
) -> Vec<Slot> {
    let granularity = window.granularity();
    let (open, close) = working_bounds(date, window, tz_offset_minutes);
    let closed_today = window.is_closed_on(date.weekday());

    generate_slots(date, window, tz_offset_minutes)
        .into_iter()
        .map(|start| {
            let end = start + granularity;

            let (status, appointment_id) = if has_conflict(appointments, start, end) {
                let owner = resolve_owner(
                    appointments,
                    start,
                    end,
                    window.match_tolerance(),
                    tz_offset_minutes,
                );
                (SlotStatus::Busy, owner.map(|apt| apt.id))
            } else if !closed_today && start >= open && end <= close {
                (SlotStatus::Available, None)
            } else {
                (SlotStatus::Unavailable, None)
            };

            Slot {
                start,
                end,
                label: slot_label(start, tz_offset_minutes),
                status,
                appointment_id,
            }
        })
        .collect()
}

fn working_bounds(
    date: NaiveDate,
    window: &AvailabilityWindow,
    tz_offset_minutes: i32,
) -> (DateTime<Utc>, DateTime<Utc>) {
    let midnight = local_midnight_utc(date, tz_offset_minutes);
    (
        midnight + Duration::hours(window.start_hour as i64),
        midnight + Duration::hours(window.end_hour as i64),
    )
}

/// Days kept in the slot cache before the least useful ones are evicted.
pub const SLOT_CACHE_CAPACITY: u64 = 512;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    date: NaiveDate,
    tz_offset_minutes: i32,
    window: AvailabilityWindow,
}

#[derive(Clone)]
struct CachedDay {
    generation: u64,
    slots: Vec<Slot>,
}

struct SlotCache {
    invalidations: Mutex<watch::Receiver<Invalidation>>,
    entries: Cache<CacheKey, CachedDay>,
}

impl SlotCache {
    /// Drops every entry if the repository committed since the last call and
    /// returns the latest published generation.
    async fn sync(&self) -> u64 {
        let mut invalidations = self.invalidations.lock().await;
        // A closed channel means the repository is gone; drop everything.
        let changed = invalidations.has_changed().unwrap_or(true);
        if changed {
            let generation = invalidations.borrow_and_update().generation;
            debug!(
                "Invalidating {} cached days at generation {}",
                self.entries.entry_count(),
                generation
            );
            self.entries.invalidate_all();
            return generation;
        }
        let generation = invalidations.borrow().generation;
        generation
    }
}

/// Per-day slot classification backed by the repository, with a bounded cache
/// that is cleared whenever the repository publishes an invalidation.
pub struct AvailabilityResolver {
    repository: Arc<AppointmentRepository>,
    cache: SlotCache,
}

impl AvailabilityResolver {
    pub fn new(repository: Arc<AppointmentRepository>) -> Self {
        Self::with_capacity(repository, SLOT_CACHE_CAPACITY)
    }

    pub fn with_capacity(repository: Arc<AppointmentRepository>, capacity: u64) -> Self {
        let invalidations = repository.subscribe();
        Self {
            repository,
            cache: SlotCache {
                invalidations: Mutex::new(invalidations),
                entries: Cache::new(capacity),
            },
        }
    }

    pub async fn resolve(
        &self,
        date: NaiveDate,
        window: &AvailabilityWindow,
        tz_offset_minutes: i32,
    ) -> Vec<Slot> {
        let snapshot = self.repository.snapshot().await;
        self.slots_for(&snapshot, date, window, tz_offset_minutes).await
    }

    /// Slot starts where a booking of `service` fits: the slot is available,
    /// the whole service interval ends by closing time and it overlaps no
    /// existing booking.
    pub async fn bookable_starts(
        &self,
        date: NaiveDate,
        window: &AvailabilityWindow,
        service: ServiceType,
        tz_offset_minutes: i32,
    ) -> Vec<DateTime<Utc>> {
        let snapshot = self.repository.snapshot().await;
        let slots = self.slots_for(&snapshot, date, window, tz_offset_minutes).await;
        bookable_from(&slots, &snapshot.appointments, date, window, service, tz_offset_minutes)
    }

    /// Availability summary served by the HTTP API.
    pub async fn availability(
        &self,
        date: NaiveDate,
        window: &AvailabilityWindow,
        service: Option<ServiceType>,
        tz_offset_minutes: i32,
    ) -> AvailabilityResponse {
        let snapshot = self.repository.snapshot().await;
        let slots = self.slots_for(&snapshot, date, window, tz_offset_minutes).await;

        let available_slots = match service {
            Some(service) => bookable_from(
                &slots,
                &snapshot.appointments,
                date,
                window,
                service,
                tz_offset_minutes,
            ),
            None => starts_with(&slots, |s| s == SlotStatus::Available),
        };

        AvailabilityResponse {
            available_slots,
            busy_slots: starts_with(&slots, |s| s == SlotStatus::Busy),
            working_slots: starts_with(&slots, |s| s != SlotStatus::Unavailable),
        }
    }

    async fn slots_for(
        &self,
        snapshot: &Snapshot,
        date: NaiveDate,
        window: &AvailabilityWindow,
        tz_offset_minutes: i32,
    ) -> Vec<Slot> {
        let key = CacheKey {
            date,
            tz_offset_minutes,
            window: window.clone(),
        };

        let current = self.cache.sync().await;
        if let Some(hit) = self.cache.entries.get(&key).await {
            if hit.generation == snapshot.generation {
                debug!("Slot cache hit for {} at generation {}", date, snapshot.generation);
                return hit.slots;
            }
        }

        let slots = classify_slots(date, window, tz_offset_minutes, &snapshot.appointments);

        // A snapshot taken before a later commit is served but never cached.
        if snapshot.generation == current {
            self.cache
                .entries
                .insert(
                    key,
                    CachedDay {
                        generation: snapshot.generation,
                        slots: slots.clone(),
                    },
                )
                .await;
        }
        slots
    }
}

fn starts_with(slots: &[Slot], keep: impl Fn(SlotStatus) -> bool) -> Vec<DateTime<Utc>> {
    slots
        .iter()
        .filter(|slot| keep(slot.status))
        .map(|slot| slot.start)
        .collect()
}

fn bookable_from(
    slots: &[Slot],
    appointments: &[Appointment],
    date: NaiveDate,
    window: &AvailabilityWindow,
    service: ServiceType,
    tz_offset_minutes: i32,
) -> Vec<DateTime<Utc>> {
    let (_, close) = working_bounds(date, window, tz_offset_minutes);
    let duration = service.duration();

    slots
        .iter()
        .filter(|slot| slot.status == SlotStatus::Available)
        .map(|slot| slot.start)
        .filter(|start| *start + duration <= close)
        .filter(|start| {
            !appointments
                .iter()
                .any(|apt| intervals_overlap(*start, *start + duration, apt.start, apt.end))
        })
        .collect()
}
