// libs/appointment-cell/src/services/store.rs
use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use shared_config::{AppConfig, StoreBackend};

use crate::models::{Appointment, AppointmentFilter, AppointmentStatus, NewAppointment, StoreError};
use crate::services::memory_store::InMemoryAppointmentStore;
use crate::services::supabase_store::SupabaseAppointmentStore;

/// Persistence for appointment rows.
///
/// `save_if_status` is the check-and-set used for every state change: the write
/// only lands if the stored row still has `expected` status, and `Ok(None)`
/// means another writer got there first.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AppointmentStore: Send + Sync {
    async fn create(&self, appointment: NewAppointment) -> Result<Appointment, StoreError>;

    async fn bulk_create(
        &self,
        appointments: Vec<NewAppointment>,
    ) -> Result<Vec<Appointment>, StoreError>;

    async fn find_one(&self, filter: AppointmentFilter) -> Result<Option<Appointment>, StoreError>;

    async fn find_all(&self, filter: AppointmentFilter) -> Result<Vec<Appointment>, StoreError>;

    async fn save(&self, appointment: &Appointment) -> Result<Appointment, StoreError>;

    async fn save_if_status(
        &self,
        appointment: &Appointment,
        expected: AppointmentStatus,
    ) -> Result<Option<Appointment>, StoreError>;
}

pub fn store_from_config(config: &AppConfig) -> Arc<dyn AppointmentStore> {
    match config.store_backend {
        StoreBackend::Supabase => {
            info!("Using Supabase appointment store at {}", config.supabase_url);
            Arc::new(SupabaseAppointmentStore::new(config))
        }
        StoreBackend::Memory => {
            info!("Using in-memory appointment store; data is lost on restart");
            Arc::new(InMemoryAppointmentStore::new())
        }
    }
}
