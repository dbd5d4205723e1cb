use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{watch, Mutex, RwLock};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::models::{
    Appointment, AppointmentDraft, AppointmentError, AppointmentPatch, Change, ChangeKind,
    Invalidation,
};
use crate::services::conflict::{find_conflict, intervals_overlap};
use crate::services::store::AppointmentStore;
use crate::services::validation::DraftValidator;

/// Consistent view of the appointment set at one commit generation.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub generation: u64,
    pub appointments: Vec<Appointment>,
}

#[derive(Default)]
struct RepositoryState {
    appointments: HashMap<Uuid, Appointment>,
    generation: u64,
}

/// Single owner of the appointment set.
///
/// Mutations are serialized through `write_lock`, which is held across the
/// overlap check, the store commit and the in-memory apply. Reads only take
/// the short-lived `state` read lock and never wait on the store.
pub struct AppointmentRepository {
    state: RwLock<RepositoryState>,
    write_lock: Mutex<()>,
    store: Arc<dyn AppointmentStore>,
    validator: DraftValidator,
    invalidations: watch::Sender<Invalidation>,
}

impl AppointmentRepository {
    pub fn new(store: Arc<dyn AppointmentStore>) -> Self {
        let (invalidations, _) = watch::channel(Invalidation {
            generation: 0,
            change: None,
        });

        Self {
            state: RwLock::new(RepositoryState::default()),
            write_lock: Mutex::new(()),
            store,
            validator: DraftValidator::new(),
            invalidations,
        }
    }

    /// Builds a repository seeded with everything the store currently holds.
    pub async fn load(store: Arc<dyn AppointmentStore>) -> Result<Self, AppointmentError> {
        let existing = store.load_all().await.map_err(|e| {
            error!("Failed to load appointments: {}", e);
            AppointmentError::Storage(e.to_string())
        })?;

        warn_on_overlaps(&existing);
        info!("Loaded {} appointments", existing.len());

        let repository = Self::new(store);
        {
            let mut state = repository.state.write().await;
            state.appointments = existing.into_iter().map(|a| (a.id, a)).collect();
        }
        Ok(repository)
    }

    pub fn subscribe(&self) -> watch::Receiver<Invalidation> {
        self.invalidations.subscribe()
    }

    /// All appointments ordered by start time.
    pub async fn list(&self) -> Vec<Appointment> {
        self.snapshot().await.appointments
    }

    pub async fn snapshot(&self) -> Snapshot {
        let state = self.state.read().await;
        let mut appointments: Vec<Appointment> = state.appointments.values().cloned().collect();
        appointments.sort_by(|a, b| a.start.cmp(&b.start).then(a.id.cmp(&b.id)));

        Snapshot {
            generation: state.generation,
            appointments,
        }
    }

    pub async fn get(&self, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        self.state
            .read()
            .await
            .appointments
            .get(&appointment_id)
            .cloned()
            .ok_or(AppointmentError::NotFound(appointment_id))
    }

    pub async fn create(&self, draft: AppointmentDraft) -> Result<Appointment, AppointmentError> {
        let validated = self.validator.validate_draft(&draft)?;
        let end = validated.start + validated.service.duration();

        let _guard = self.write_lock.lock().await;
        self.ensure_free(validated.start, end, None).await?;

        let now = Utc::now();
        let appointment = Appointment {
            id: Uuid::new_v4(),
            name: validated.name,
            phone_number: validated.phone_number,
            service: validated.service,
            start: validated.start,
            end,
            created_at: now,
            updated_at: now,
        };

        self.store.insert(&appointment).await.map_err(|e| {
            error!("Failed to store appointment {}: {}", appointment.id, e);
            AppointmentError::Storage(e.to_string())
        })?;

        self.apply(ChangeKind::Created, appointment.id, Some(appointment.clone())).await;
        info!(
            "Booked {} for {} at {}",
            appointment.service, appointment.id, appointment.start
        );

        Ok(appointment)
    }

    pub async fn update(
        &self,
        appointment_id: Uuid,
        patch: AppointmentPatch,
    ) -> Result<Appointment, AppointmentError> {
        let name = patch
            .name
            .as_deref()
            .map(|n| self.validator.validate_name(n))
            .transpose()?;
        let phone_number = patch
            .phone_number
            .as_deref()
            .map(|p| self.validator.validate_phone(p))
            .transpose()?;
        let service = patch
            .service
            .as_deref()
            .map(|s| self.validator.parse_service(s))
            .transpose()?;
        let start = patch
            .start
            .as_deref()
            .map(|s| self.validator.parse_start(s, patch.tz_offset))
            .transpose()?;

        let _guard = self.write_lock.lock().await;
        let current = self.get(appointment_id).await?;

        if patch.is_empty() {
            debug!("Empty update for appointment {}, nothing to commit", appointment_id);
            return Ok(current);
        }

        let mut updated = current.clone();
        if let Some(name) = name {
            updated.name = name;
        }
        if let Some(phone_number) = phone_number {
            updated.phone_number = phone_number;
        }
        if let Some(service) = service {
            updated.service = service;
        }
        if let Some(start) = start {
            updated.start = start;
        }
        // Stored rows may carry a drifted end; it is only rewritten, and
        // re-checked, when the booked time itself changes.
        if updated.start != current.start || updated.service != current.service {
            updated.end = updated.start + updated.service.duration();
            self.ensure_free(updated.start, updated.end, Some(appointment_id)).await?;
        }
        updated.updated_at = Utc::now();

        self.store.update(&updated).await.map_err(|e| {
            error!("Failed to store update for {}: {}", appointment_id, e);
            AppointmentError::Storage(e.to_string())
        })?;

        self.apply(ChangeKind::Updated, appointment_id, Some(updated.clone())).await;
        info!("Updated appointment {}", appointment_id);

        Ok(updated)
    }

    pub async fn delete(&self, appointment_id: Uuid) -> Result<(), AppointmentError> {
        let _guard = self.write_lock.lock().await;
        self.get(appointment_id).await?;

        self.store.delete(appointment_id).await.map_err(|e| {
            error!("Failed to delete appointment {}: {}", appointment_id, e);
            AppointmentError::Storage(e.to_string())
        })?;

        self.apply(ChangeKind::Deleted, appointment_id, None).await;
        info!("Deleted appointment {}", appointment_id);

        Ok(())
    }

    // ==============================================================================
    // PRIVATE HELPER METHODS
    // ==============================================================================

    /// Must be called with `write_lock` held.
    async fn ensure_free(
        &self,
        start: chrono::DateTime<Utc>,
        end: chrono::DateTime<Utc>,
        exclude_appointment_id: Option<Uuid>,
    ) -> Result<(), AppointmentError> {
        let state = self.state.read().await;
        match find_conflict(state.appointments.values(), start, end, exclude_appointment_id) {
            Some(existing) => {
                warn!(
                    "Rejected booking {} - {}: overlaps appointment {} ({} - {})",
                    start, end, existing.id, existing.start, existing.end
                );
                Err(AppointmentError::Conflict {
                    conflicting_id: existing.id,
                    start: existing.start,
                    end: existing.end,
                })
            }
            None => Ok(()),
        }
    }

    /// Applies a committed change and publishes the invalidation.
    async fn apply(&self, kind: ChangeKind, appointment_id: Uuid, value: Option<Appointment>) {
        let generation = {
            let mut state = self.state.write().await;
            match value {
                Some(appointment) => {
                    state.appointments.insert(appointment_id, appointment);
                }
                None => {
                    state.appointments.remove(&appointment_id);
                }
            }
            state.generation += 1;
            state.generation
        };

        self.invalidations.send_replace(Invalidation {
            generation,
            change: Some(Change {
                kind,
                appointment_id,
            }),
        });
    }
}

fn warn_on_overlaps(appointments: &[Appointment]) {
    let mut sorted: Vec<&Appointment> = appointments.iter().collect();
    sorted.sort_by_key(|a| a.start);

    for pair in sorted.windows(2) {
        if intervals_overlap(pair[0].start, pair[0].end, pair[1].start, pair[1].end) {
            warn!(
                "Stored appointments {} and {} overlap; new bookings will avoid both",
                pair[0].id, pair[1].id
            );
        }
    }
}
