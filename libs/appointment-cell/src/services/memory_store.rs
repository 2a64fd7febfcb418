// libs/appointment-cell/src/services/memory_store.rs
use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::models::{Appointment, AppointmentFilter, AppointmentStatus, NewAppointment, StoreError};
use crate::services::store::AppointmentStore;

#[derive(Default)]
struct MemoryState {
    next_id: i64,
    rows: BTreeMap<i64, Appointment>,
}

impl MemoryState {
    fn insert(&mut self, appointment: NewAppointment) -> Appointment {
        self.next_id += 1;
        let now = Utc::now();
        let row = Appointment {
            id: self.next_id,
            provider: appointment.provider,
            timeslot_start: appointment.timeslot_start,
            timeslot_end: appointment.timeslot_end,
            status: appointment.status,
            reserved_at: appointment.reserved_at,
            created_at: Some(now),
            updated_at: Some(now),
        };
        self.rows.insert(row.id, row.clone());
        row
    }

    fn update(&mut self, appointment: &Appointment) -> Option<Appointment> {
        let row = self.rows.get_mut(&appointment.id)?;
        *row = Appointment {
            created_at: row.created_at,
            updated_at: Some(Utc::now()),
            ..appointment.clone()
        };
        Some(row.clone())
    }
}

/// Process-local store. Ids start at 1; check-and-set runs under one write lock.
#[derive(Default)]
pub struct InMemoryAppointmentStore {
    state: RwLock<MemoryState>,
}

impl InMemoryAppointmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.rows.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl AppointmentStore for InMemoryAppointmentStore {
    async fn create(&self, appointment: NewAppointment) -> Result<Appointment, StoreError> {
        Ok(self.state.write().await.insert(appointment))
    }

    async fn bulk_create(
        &self,
        appointments: Vec<NewAppointment>,
    ) -> Result<Vec<Appointment>, StoreError> {
        let mut state = self.state.write().await;
        Ok(appointments.into_iter().map(|a| state.insert(a)).collect())
    }

    async fn find_one(&self, filter: AppointmentFilter) -> Result<Option<Appointment>, StoreError> {
        let state = self.state.read().await;
        Ok(state.rows.values().find(|a| filter.matches(a)).cloned())
    }

    async fn find_all(&self, filter: AppointmentFilter) -> Result<Vec<Appointment>, StoreError> {
        let state = self.state.read().await;
        Ok(state.rows.values().filter(|a| filter.matches(a)).cloned().collect())
    }

    async fn save(&self, appointment: &Appointment) -> Result<Appointment, StoreError> {
        self.state
            .write()
            .await
            .update(appointment)
            .ok_or_else(|| StoreError::Empty(format!("appointment id={}", appointment.id)))
    }

    async fn save_if_status(
        &self,
        appointment: &Appointment,
        expected: AppointmentStatus,
    ) -> Result<Option<Appointment>, StoreError> {
        let mut state = self.state.write().await;

        let still_expected = state
            .rows
            .get(&appointment.id)
            .is_some_and(|current| current.status == expected);

        if !still_expected {
            return Ok(None);
        }

        Ok(state.update(appointment))
    }
}
