use std::env;
use std::str::FromStr;

use chrono::Weekday;
use tracing::warn;

/// Working hours of the clinic, as read from the environment.
#[derive(Debug, Clone, PartialEq)]
pub struct BusinessHours {
    pub open_hour: u32,
    pub close_hour: u32,
    pub slot_minutes: i64,
    pub closed_days: Vec<Weekday>,
}

impl Default for BusinessHours {
    fn default() -> Self {
        Self {
            open_hour: 9,
            close_hour: 18,
            slot_minutes: 15,
            closed_days: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub host: String,
    pub port: u16,
    pub business_hours: BusinessHours,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = BusinessHours::default();

        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, appointments will be kept in memory");
                    String::new()
                }),
            supabase_anon_key: env::var("SUPABASE_ANON_PUBLIC_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                    String::new()
                }),
            host: env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: parse_var("APP_PORT", 3000),
            business_hours: BusinessHours {
                open_hour: parse_var("CLINIC_OPEN_HOUR", defaults.open_hour),
                close_hour: parse_var("CLINIC_CLOSE_HOUR", defaults.close_hour),
                slot_minutes: parse_var("CLINIC_SLOT_MINUTES", defaults.slot_minutes),
                closed_days: env::var("CLINIC_CLOSED_DAYS")
                    .map(|raw| parse_weekdays(&raw))
                    .unwrap_or_default(),
            },
        };

        if config.business_hours.close_hour <= config.business_hours.open_hour {
            warn!(
                "CLINIC_CLOSE_HOUR ({}) is not after CLINIC_OPEN_HOUR ({}), no slots will be offered",
                config.business_hours.close_hour, config.business_hours.open_hour
            );
        }

        config
    }

    /// True when a Supabase backend is available for persistence.
    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty() && !self.supabase_anon_key.is_empty()
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            supabase_url: String::new(),
            supabase_anon_key: String::new(),
            host: "0.0.0.0".to_string(),
            port: 3000,
            business_hours: BusinessHours::default(),
        }
    }
}

fn parse_var<T>(name: &str, default: T) -> T
where
    T: FromStr + std::fmt::Display + Copy,
{
    match env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{} has invalid value '{}', using default {}", name, raw, default);
            default
        }),
        Err(_) => default,
    }
}

/// Parses a comma separated list such as `sat,sun` into weekdays, skipping
/// entries chrono does not recognise.
pub fn parse_weekdays(raw: &str) -> Vec<Weekday> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| match Weekday::from_str(s) {
            Ok(day) => Some(day),
            Err(_) => {
                warn!("Ignoring unknown weekday '{}' in CLINIC_CLOSED_DAYS", s);
                None
            }
        })
        .collect()
}
