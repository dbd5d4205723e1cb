use std::sync::Arc;

use tracing::info;

use shared_config::AppConfig;

use crate::models::{AppointmentError, AvailabilityWindow};
use crate::services::{
    AppointmentRepository, AppointmentStore, AvailabilityResolver, InMemoryStore,
    SupabaseAppointmentStore,
};

/// Shared state handed to every appointment handler.
pub struct AppointmentState {
    pub repository: Arc<AppointmentRepository>,
    pub resolver: AvailabilityResolver,
    pub window: AvailabilityWindow,
}

impl AppointmentState {
    pub fn new(repository: Arc<AppointmentRepository>, window: AvailabilityWindow) -> Self {
        Self {
            resolver: AvailabilityResolver::new(repository.clone()),
            repository,
            window,
        }
    }

    /// Picks the store from configuration, loads existing appointments and
    /// wires the resolver to the repository.
    pub async fn from_config(config: &AppConfig) -> Result<Self, AppointmentError> {
        let store: Arc<dyn AppointmentStore> = if config.is_configured() {
            info!("Persisting appointments to Supabase at {}", config.supabase_url);
            Arc::new(SupabaseAppointmentStore::new(config))
        } else {
            info!("Supabase not configured, keeping appointments in memory");
            Arc::new(InMemoryStore::new())
        };

        let repository = Arc::new(AppointmentRepository::load(store).await?);
        Ok(Self::new(
            repository,
            AvailabilityWindow::from_config(&config.business_hours),
        ))
    }
}
