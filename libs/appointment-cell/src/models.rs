// libs/appointment-cell/src/models.rs
use serde::{Deserialize, Serialize};
use chrono::{DateTime, Duration, Utc};
use std::fmt;

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

/// One bookable slot for a provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: i64,
    pub provider: String,
    pub timeslot_start: DateTime<Utc>,
    pub timeslot_end: DateTime<Utc>,
    pub status: AppointmentStatus,
    pub reserved_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Appointment {
    // Status and reserved_at always change together so the pair stays consistent.

    pub fn mark_reserved(&mut self, now: DateTime<Utc>) {
        self.status = AppointmentStatus::Reserved;
        self.reserved_at = Some(now);
    }

    pub fn mark_confirmed(&mut self) {
        self.status = AppointmentStatus::Confirmed;
        self.reserved_at = None;
    }

    pub fn mark_available(&mut self) {
        self.status = AppointmentStatus::Available;
        self.reserved_at = None;
    }

    /// True once the reservation hold has fully elapsed.
    pub fn reservation_expired(&self, hold: Duration, now: DateTime<Utc>) -> bool {
        match self.reserved_at {
            Some(reserved_at) => reserved_at + hold < now,
            None => false,
        }
    }

    /// Whether the slot starts far enough ahead to be booked or confirmed.
    pub fn within_booking_window(&self, window: Duration, now: DateTime<Utc>) -> bool {
        self.timeslot_start >= now + window
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Available,
    Reserved,
    Confirmed,
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Available => write!(f, "available"),
            AppointmentStatus::Reserved => write!(f, "reserved"),
            AppointmentStatus::Confirmed => write!(f, "confirmed"),
        }
    }
}

/// A slot that has not been persisted yet; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAppointment {
    pub provider: String,
    pub timeslot_start: DateTime<Utc>,
    pub timeslot_end: DateTime<Utc>,
    pub status: AppointmentStatus,
    pub reserved_at: Option<DateTime<Utc>>,
}

impl NewAppointment {
    pub fn available(provider: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            provider: provider.to_string(),
            timeslot_start: start,
            timeslot_end: end,
            status: AppointmentStatus::Available,
            reserved_at: None,
        }
    }
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

/// Body of a slot creation request. Fields stay optional so missing values can
/// be reported one by one instead of as a generic deserialization failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateSlotsRequest {
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
}

impl CreateSlotsRequest {
    pub fn new(provider: &str, start: &str, end: &str) -> Self {
        Self {
            provider: Some(provider.to_string()),
            start: Some(start.to_string()),
            end: Some(end.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

// ==============================================================================
// STORE QUERIES
// ==============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum AppointmentFilter {
    Id(i64),
    Status(AppointmentStatus),
    /// Status plus a `timeslot_start` range; `from` inclusive, `to` exclusive.
    StatusStartingBetween {
        status: AppointmentStatus,
        from: DateTime<Utc>,
        to: Option<DateTime<Utc>>,
    },
    /// Rows holding a reservation timestamp.
    Reserved,
}

impl AppointmentFilter {
    pub fn matches(&self, appointment: &Appointment) -> bool {
        match self {
            AppointmentFilter::Id(id) => appointment.id == *id,
            AppointmentFilter::Status(status) => appointment.status == *status,
            AppointmentFilter::StatusStartingBetween { status, from, to } => {
                appointment.status == *status
                    && appointment.timeslot_start >= *from
                    && to.map_or(true, |to| appointment.timeslot_start < to)
            }
            AppointmentFilter::Reserved => appointment.reserved_at.is_some(),
        }
    }
}

// ==============================================================================
// LIFECYCLE
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleAction {
    Reserve,
    Confirm,
}

impl LifecycleAction {
    /// The only status this action may start from.
    pub fn required_status(&self) -> AppointmentStatus {
        match self {
            LifecycleAction::Reserve => AppointmentStatus::Available,
            LifecycleAction::Confirm => AppointmentStatus::Reserved,
        }
    }

    pub fn ineligible_label(&self) -> &'static str {
        match self {
            LifecycleAction::Reserve => "unavailable",
            LifecycleAction::Confirm => "unreserved",
        }
    }

    pub fn success_message(&self) -> &'static str {
        match self {
            LifecycleAction::Reserve => "Appointment was reserved successfully.",
            LifecycleAction::Confirm => "Appointment was confirmed successfully.",
        }
    }

    pub fn progressive(&self) -> &'static str {
        match self {
            LifecycleAction::Reserve => "reserving",
            LifecycleAction::Confirm => "confirming",
        }
    }
}

impl fmt::Display for LifecycleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleAction::Reserve => write!(f, "reserve"),
            LifecycleAction::Confirm => write!(f, "confirm"),
        }
    }
}

/// Timing rules for slots and reservations
#[derive(Debug, Clone)]
pub struct LifecycleRules {
    pub slot_minutes: i64,
    pub booking_window_hours: i64,
    pub reservation_hold_minutes: i64,
}

impl Default for LifecycleRules {
    fn default() -> Self {
        Self {
            slot_minutes: 15,             // Slot length and grid alignment
            booking_window_hours: 24,     // Reserve/confirm only 24h+ ahead
            reservation_hold_minutes: 30, // Unconfirmed holds are released after 30 minutes
        }
    }
}

impl LifecycleRules {
    pub fn slot_duration(&self) -> Duration {
        Duration::minutes(self.slot_minutes)
    }

    pub fn booking_window(&self) -> Duration {
        Duration::hours(self.booking_window_hours)
    }

    pub fn reservation_hold(&self) -> Duration {
        Duration::minutes(self.reservation_hold_minutes)
    }
}

/// Outcome of one expiry sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpirySummary {
    pub scanned: usize,
    pub released: usize,
    pub skipped: usize,
    pub failed: usize,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Store request failed: {0}")]
    Request(String),

    #[error("Failed to decode stored appointment: {0}")]
    Decode(String),

    #[error("Store returned no rows for {0}")]
    Empty(String),
}

#[derive(Debug, thiserror::Error)]
pub enum AppointmentError {
    #[error("{0}")]
    Validation(String),

    #[error("Appointment with id={0} not found")]
    NotFound(i64),

    #[error("Cant {action} {} appointment", .action.ineligible_label())]
    InvalidTransition {
        id: i64,
        action: LifecycleAction,
        status: AppointmentStatus,
    },

    #[error("Cant {action} appointment under {window_hours}h of the selected time.")]
    TooSoon {
        id: i64,
        action: LifecycleAction,
        window_hours: i64,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn slot(status: AppointmentStatus, reserved_at: Option<DateTime<Utc>>) -> Appointment {
        let start = Utc.with_ymd_and_hms(2030, 9, 24, 14, 0, 0).unwrap();
        Appointment {
            id: 1,
            provider: "Dr. X".to_string(),
            timeslot_start: start,
            timeslot_end: start + Duration::minutes(15),
            status,
            reserved_at,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn transitions_keep_reserved_at_in_step_with_status() {
        let now = Utc::now();
        let mut appointment = slot(AppointmentStatus::Available, None);

        appointment.mark_reserved(now);
        assert_eq!(appointment.status, AppointmentStatus::Reserved);
        assert_eq!(appointment.reserved_at, Some(now));

        appointment.mark_confirmed();
        assert_eq!(appointment.status, AppointmentStatus::Confirmed);
        assert!(appointment.reserved_at.is_none());

        let mut held = slot(AppointmentStatus::Reserved, Some(now));
        held.mark_available();
        assert_eq!(held.status, AppointmentStatus::Available);
        assert!(held.reserved_at.is_none());
    }

    #[test]
    fn reservation_expires_strictly_after_hold() {
        let now = Utc::now();
        let hold = Duration::minutes(30);

        assert!(slot(AppointmentStatus::Reserved, Some(now - Duration::minutes(31)))
            .reservation_expired(hold, now));
        assert!(!slot(AppointmentStatus::Reserved, Some(now - Duration::minutes(30)))
            .reservation_expired(hold, now));
        assert!(!slot(AppointmentStatus::Available, None).reservation_expired(hold, now));
    }

    #[test]
    fn error_messages_read_like_api_responses() {
        let invalid = AppointmentError::InvalidTransition {
            id: 1,
            action: LifecycleAction::Reserve,
            status: AppointmentStatus::Confirmed,
        };
        assert_eq!(invalid.to_string(), "Cant reserve unavailable appointment");

        let unreserved = AppointmentError::InvalidTransition {
            id: 1,
            action: LifecycleAction::Confirm,
            status: AppointmentStatus::Available,
        };
        assert_eq!(unreserved.to_string(), "Cant confirm unreserved appointment");

        let too_soon = AppointmentError::TooSoon {
            id: 1,
            action: LifecycleAction::Confirm,
            window_hours: 24,
        };
        assert_eq!(
            too_soon.to_string(),
            "Cant confirm appointment under 24h of the selected time."
        );
    }

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_value(AppointmentStatus::Reserved).unwrap(),
            serde_json::json!("reserved")
        );
        assert_eq!(AppointmentStatus::Available.to_string(), "available");
    }

    #[test]
    fn range_filter_is_half_open() {
        let appointment = slot(AppointmentStatus::Available, None);
        let start = appointment.timeslot_start;

        let inclusive = AppointmentFilter::StatusStartingBetween {
            status: AppointmentStatus::Available,
            from: start,
            to: Some(start + Duration::minutes(15)),
        };
        let exclusive = AppointmentFilter::StatusStartingBetween {
            status: AppointmentStatus::Available,
            from: start - Duration::minutes(15),
            to: Some(start),
        };

        assert!(inclusive.matches(&appointment));
        assert!(!exclusive.matches(&appointment));
        assert!(!AppointmentFilter::Reserved.matches(&appointment));
    }
}
