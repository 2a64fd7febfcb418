// libs/appointment-cell/src/services/lifecycle.rs
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, instrument, warn};

use crate::models::{
    Appointment, AppointmentError, AppointmentFilter, AppointmentStatus, CreateSlotsRequest,
    ExpirySummary, LifecycleAction, LifecycleRules,
};
use crate::services::slots::SlotGenerator;
use crate::services::store::AppointmentStore;

/// Drives appointments through `available -> reserved -> confirmed` and
/// releases reservations that were never confirmed.
pub struct AppointmentLifecycleService {
    store: Arc<dyn AppointmentStore>,
    slot_generator: SlotGenerator,
    rules: LifecycleRules,
}

impl AppointmentLifecycleService {
    pub fn new(store: Arc<dyn AppointmentStore>) -> Self {
        Self::with_rules(store, LifecycleRules::default())
    }

    pub fn with_rules(store: Arc<dyn AppointmentStore>, rules: LifecycleRules) -> Self {
        Self {
            store,
            slot_generator: SlotGenerator::new(rules.clone()),
            rules,
        }
    }

    /// Validate a range, split it into slots and persist them as one batch
    #[instrument(skip(self))]
    pub async fn create_slots(
        &self,
        request: CreateSlotsRequest,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let range = self.slot_generator.validate(&request)?;
        let slots = self.slot_generator.generate(&range);

        if slots.is_empty() {
            debug!("Empty range for {}, nothing to persist", range.provider);
            return Ok(Vec::new());
        }

        let created = self.store.bulk_create(slots).await?;
        info!("Created {} slots for provider {}", created.len(), range.provider);

        Ok(created)
    }

    pub async fn find_available(&self) -> Result<Vec<Appointment>, AppointmentError> {
        self.find_available_at(Utc::now()).await
    }

    /// Available slots that are still outside the booking cutoff, earliest first.
    pub async fn find_available_at(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let filter = AppointmentFilter::StatusStartingBetween {
            status: AppointmentStatus::Available,
            from: now + self.rules.booking_window(),
            to: None,
        };

        let mut appointments = self.store.find_all(filter).await?;
        appointments.sort_by_key(|a| (a.timeslot_start, a.id));

        debug!("Found {} bookable appointments", appointments.len());
        Ok(appointments)
    }

    pub async fn reserve(&self, id: i64) -> Result<Appointment, AppointmentError> {
        self.reserve_at(id, Utc::now()).await
    }

    pub async fn reserve_at(
        &self,
        id: i64,
        now: DateTime<Utc>,
    ) -> Result<Appointment, AppointmentError> {
        self.transition(id, LifecycleAction::Reserve, now).await
    }

    pub async fn confirm(&self, id: i64) -> Result<Appointment, AppointmentError> {
        self.confirm_at(id, Utc::now()).await
    }

    pub async fn confirm_at(
        &self,
        id: i64,
        now: DateTime<Utc>,
    ) -> Result<Appointment, AppointmentError> {
        self.transition(id, LifecycleAction::Confirm, now).await
    }

    pub async fn expire(&self) -> ExpirySummary {
        self.expire_at(Utc::now()).await
    }

    /// Release every reservation older than the hold. Never fails: store errors
    /// are logged and counted, and the sweep moves on to the next row.
    #[instrument(skip(self))]
    pub async fn expire_at(&self, now: DateTime<Utc>) -> ExpirySummary {
        let mut summary = ExpirySummary::default();

        let reserved = match self.store.find_all(AppointmentFilter::Reserved).await {
            Ok(reserved) => reserved,
            Err(e) => {
                error!("Failed to load reserved appointments for expiry: {}", e);
                summary.failed += 1;
                return summary;
            }
        };

        let hold = self.rules.reservation_hold();

        for appointment in reserved {
            summary.scanned += 1;

            if !appointment.reservation_expired(hold, now) {
                continue;
            }

            if appointment.status != AppointmentStatus::Reserved {
                warn!(
                    "Appointment {} has reserved_at set while {}; leaving it for manual repair",
                    appointment.id, appointment.status
                );
                summary.skipped += 1;
                continue;
            }

            let mut released = appointment.clone();
            released.mark_available();

            match self
                .store
                .save_if_status(&released, AppointmentStatus::Reserved)
                .await
            {
                Ok(Some(_)) => {
                    info!("Released expired reservation on appointment {}", appointment.id);
                    summary.released += 1;
                }
                Ok(None) => {
                    debug!("Appointment {} changed before it could be released", appointment.id);
                    summary.skipped += 1;
                }
                Err(e) => {
                    error!("Failed to release appointment {}: {}", appointment.id, e);
                    summary.failed += 1;
                }
            }
        }

        if summary.released > 0 || summary.failed > 0 {
            info!(
                "Expiry sweep: scanned={}, released={}, skipped={}, failed={}",
                summary.scanned, summary.released, summary.skipped, summary.failed
            );
        }

        summary
    }

    #[instrument(skip(self))]
    async fn transition(
        &self,
        id: i64,
        action: LifecycleAction,
        now: DateTime<Utc>,
    ) -> Result<Appointment, AppointmentError> {
        let appointment = self.load(id).await?;
        let required = action.required_status();

        if appointment.status != required {
            warn!("Cannot {} appointment {} in status {}", action, id, appointment.status);
            return Err(AppointmentError::InvalidTransition {
                id,
                action,
                status: appointment.status,
            });
        }

        self.check_booking_window(&appointment, action, now)?;

        let mut updated = appointment;
        match action {
            LifecycleAction::Reserve => updated.mark_reserved(now),
            LifecycleAction::Confirm => updated.mark_confirmed(),
        }

        match self.store.save_if_status(&updated, required).await? {
            Some(saved) => {
                info!("Appointment {} is now {}", id, saved.status);
                Ok(saved)
            }
            None => {
                // Lost a race with another writer; report what the row holds now.
                let current = self.load(id).await?;
                warn!(
                    "Concurrent update on appointment {}: expected {}, found {}",
                    id, required, current.status
                );
                Err(AppointmentError::InvalidTransition {
                    id,
                    action,
                    status: current.status,
                })
            }
        }
    }

    async fn load(&self, id: i64) -> Result<Appointment, AppointmentError> {
        self.store
            .find_one(AppointmentFilter::Id(id))
            .await?
            .ok_or(AppointmentError::NotFound(id))
    }

    fn check_booking_window(
        &self,
        appointment: &Appointment,
        action: LifecycleAction,
        now: DateTime<Utc>,
    ) -> Result<(), AppointmentError> {
        if appointment.within_booking_window(self.rules.booking_window(), now) {
            return Ok(());
        }

        warn!(
            "Cannot {} appointment {} starting at {}: inside the {}h cutoff",
            action, appointment.id, appointment.timeslot_start, self.rules.booking_window_hours
        );
        Err(AppointmentError::TooSoon {
            id: appointment.id,
            action,
            window_hours: self.rules.booking_window_hours,
        })
    }
}
