use std::collections::HashMap;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{header::{HeaderMap, HeaderValue}, Method};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{Appointment, ServiceType};

/// Durable home of appointment records. The repository calls it while holding
/// its write lock and only applies a mutation in memory once the call returns
/// `Ok`, so implementations must not report success before the write is
/// durable.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AppointmentStore: Send + Sync {
    async fn load_all(&self) -> Result<Vec<Appointment>>;
    async fn insert(&self, appointment: &Appointment) -> Result<()>;
    async fn update(&self, appointment: &Appointment) -> Result<()>;
    async fn delete(&self, appointment_id: Uuid) -> Result<()>;
}

// ==============================================================================
// IN-MEMORY STORE
// ==============================================================================

#[derive(Default)]
pub struct InMemoryStore {
    rows: RwLock<HashMap<Uuid, Appointment>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_appointments(appointments: Vec<Appointment>) -> Self {
        Self {
            rows: RwLock::new(appointments.into_iter().map(|a| (a.id, a)).collect()),
        }
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }
}

#[async_trait]
impl AppointmentStore for InMemoryStore {
    async fn load_all(&self) -> Result<Vec<Appointment>> {
        Ok(self.rows.read().await.values().cloned().collect())
    }

    async fn insert(&self, appointment: &Appointment) -> Result<()> {
        let mut rows = self.rows.write().await;
        if rows.contains_key(&appointment.id) {
            return Err(anyhow!("appointment {} already stored", appointment.id));
        }
        rows.insert(appointment.id, appointment.clone());
        Ok(())
    }

    async fn update(&self, appointment: &Appointment) -> Result<()> {
        let mut rows = self.rows.write().await;
        match rows.get_mut(&appointment.id) {
            Some(row) => {
                *row = appointment.clone();
                Ok(())
            }
            None => Err(anyhow!("appointment {} is not stored", appointment.id)),
        }
    }

    async fn delete(&self, appointment_id: Uuid) -> Result<()> {
        self.rows
            .write()
            .await
            .remove(&appointment_id)
            .map(|_| ())
            .ok_or_else(|| anyhow!("appointment {} is not stored", appointment_id))
    }
}

// ==============================================================================
// SUPABASE STORE
// ==============================================================================

/// Row layout of the `appointments` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentRow {
    pub id: Uuid,
    pub name: String,
    pub phone_number: String,
    pub service: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Appointment> for AppointmentRow {
    fn from(apt: &Appointment) -> Self {
        Self {
            id: apt.id,
            name: apt.name.clone(),
            phone_number: apt.phone_number.clone(),
            service: apt.service.key().to_string(),
            start_time: apt.start,
            end_time: apt.end,
            created_at: apt.created_at,
            updated_at: apt.updated_at,
        }
    }
}

impl TryFrom<AppointmentRow> for Appointment {
    type Error = anyhow::Error;

    fn try_from(row: AppointmentRow) -> Result<Self> {
        let service = row
            .service
            .parse::<ServiceType>()
            .map_err(|e| anyhow!("row {}: {}", row.id, e))?;

        Ok(Appointment {
            id: row.id,
            name: row.name,
            phone_number: row.phone_number,
            service,
            start: row.start_time,
            end: row.end_time,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

pub struct SupabaseAppointmentStore {
    supabase: SupabaseClient,
}

impl SupabaseAppointmentStore {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    fn representation_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));
        headers
    }

    async fn write(&self, method: Method, path: &str, body: Option<Value>) -> Result<()> {
        let result: Vec<Value> = self
            .supabase
            .request_with_headers(method, path, body, Some(Self::representation_headers()))
            .await?;

        if result.is_empty() {
            return Err(anyhow!("write to {} affected no rows", path));
        }
        Ok(())
    }
}

#[async_trait]
impl AppointmentStore for SupabaseAppointmentStore {
    async fn load_all(&self) -> Result<Vec<Appointment>> {
        let rows: Vec<AppointmentRow> = self
            .supabase
            .request(Method::GET, "/rest/v1/appointments?select=*&order=start_time.asc", None)
            .await?;

        debug!("Loaded {} appointments from Supabase", rows.len());
        rows.into_iter().map(Appointment::try_from).collect()
    }

    async fn insert(&self, appointment: &Appointment) -> Result<()> {
        let body = serde_json::to_value(AppointmentRow::from(appointment))?;
        self.write(Method::POST, "/rest/v1/appointments", Some(body)).await
    }

    async fn update(&self, appointment: &Appointment) -> Result<()> {
        let body = serde_json::to_value(AppointmentRow::from(appointment))?;
        let path = format!("/rest/v1/appointments?id=eq.{}", appointment.id);
        self.write(Method::PATCH, &path, Some(body)).await
    }

    async fn delete(&self, appointment_id: Uuid) -> Result<()> {
        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        self.write(Method::DELETE, &path, None).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> Appointment {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();
        Appointment {
            id: Uuid::new_v4(),
            name: "Row Test".to_string(),
            phone_number: "555 0100".to_string(),
            service: ServiceType::Extraction,
            start,
            end: start + ServiceType::Extraction.duration(),
            created_at: start,
            updated_at: start,
        }
    }

    #[test]
    fn test_row_conversion_keeps_service_key() {
        let apt = sample();
        let row = AppointmentRow::from(&apt);
        assert_eq!(row.service, "extraction");
        assert_eq!(Appointment::try_from(row).unwrap(), apt);
    }

    #[test]
    fn test_row_with_unknown_service_is_rejected() {
        let mut row = AppointmentRow::from(&sample());
        row.service = "massage".to_string();
        assert!(Appointment::try_from(row).is_err());
    }

    #[tokio::test]
    async fn test_in_memory_store_lifecycle() {
        let store = InMemoryStore::new();
        let mut apt = sample();

        store.insert(&apt).await.unwrap();
        assert!(store.insert(&apt).await.is_err());

        apt.name = "Renamed".to_string();
        store.update(&apt).await.unwrap();
        assert_eq!(store.load_all().await.unwrap()[0].name, "Renamed");

        store.delete(apt.id).await.unwrap();
        assert!(store.delete(apt.id).await.is_err());
        assert_eq!(store.len().await, 0);
    }
}
