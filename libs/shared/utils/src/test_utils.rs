use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::json;
use uuid::Uuid;

use shared_config::{AppConfig, BusinessHours};

pub struct TestConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub business_hours: BusinessHours,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            supabase_url: String::new(),
            supabase_anon_key: String::new(),
            business_hours: BusinessHours::default(),
        }
    }
}

impl TestConfig {
    /// Configuration pointing the Supabase store at a mock server.
    pub fn with_supabase(url: &str) -> Self {
        Self {
            supabase_url: url.to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            business_hours: self.business_hours.clone(),
            ..AppConfig::default()
        }
    }
}

/// UTC instant on the given day, for readable fixtures.
pub fn utc(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, minute, 0)
        .single()
        .unwrap_or_else(|| panic!("invalid fixture time {year}-{month}-{day} {hour}:{minute}"))
}

/// JSON body accepted by `POST /appointments`.
pub fn booking_body(name: &str, phone: &str, service: &str, start: &str) -> serde_json::Value {
    json!({
        "name": name,
        "phoneNumber": phone,
        "service": service,
        "start": start
    })
}

pub struct MockSupabaseResponses;

impl MockSupabaseResponses {
    /// Row of the `appointments` table as PostgREST returns it.
    pub fn appointment_row(
        id: Uuid,
        name: &str,
        service: &str,
        duration_minutes: i64,
        start: DateTime<Utc>,
    ) -> serde_json::Value {
        json!({
            "id": id,
            "name": name,
            "phone_number": "+351 912 345 678",
            "service": service,
            "start_time": start.to_rfc3339(),
            "end_time": (start + Duration::minutes(duration_minutes)).to_rfc3339(),
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn error_response(message: &str, code: &str) -> serde_json::Value {
        json!({
            "message": message,
            "code": code
        })
    }
}
