pub mod grid;
pub mod conflict;
pub mod matching;
pub mod validation;
pub mod store;
pub mod repository;
pub mod availability;
pub mod query;

pub use availability::AvailabilityResolver;
pub use repository::{AppointmentRepository, Snapshot};
pub use store::{AppointmentStore, InMemoryStore, SupabaseAppointmentStore};
