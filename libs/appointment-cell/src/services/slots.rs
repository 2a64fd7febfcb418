// libs/appointment-cell/src/services/slots.rs
use chrono::{DateTime, FixedOffset, NaiveDateTime, Timelike, Utc};
use tracing::debug;

use crate::models::{AppointmentError, CreateSlotsRequest, LifecycleRules, NewAppointment};

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// A validated creation request: one provider, one same-day range on the slot grid.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotRange {
    pub provider: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

pub struct SlotGenerator {
    rules: LifecycleRules,
}

impl SlotGenerator {
    pub fn new(rules: LifecycleRules) -> Self {
        Self { rules }
    }

    /// Check a raw creation request and turn it into a slot range
    pub fn validate(&self, request: &CreateSlotsRequest) -> Result<SlotRange, AppointmentError> {
        let provider = required(request.provider.as_deref(), "Provider")?;
        let raw_start = required(request.start.as_deref(), "Start")?;
        let raw_end = required(request.end.as_deref(), "End")?;

        let start = parse_timestamp(raw_start, "Start")?;
        let end = parse_timestamp(raw_end, "End")?;

        if start > end {
            return Err(AppointmentError::Validation(
                "Start can not be after end!".to_string(),
            ));
        }

        if start.date_naive() != end.date_naive() {
            return Err(AppointmentError::Validation(
                "Start and end must be on the same day!".to_string(),
            ));
        }

        let grid = self.rules.slot_minutes as u32;
        if start.minute() % grid != 0 || end.minute() % grid != 0 {
            return Err(AppointmentError::Validation(format!(
                "Start and end must be aligned to {} minute intervals!",
                grid
            )));
        }

        Ok(SlotRange {
            provider: provider.to_string(),
            start: start.with_timezone(&Utc),
            end: end.with_timezone(&Utc),
        })
    }

    /// Split a range into contiguous slots. A trailing partial slot is dropped.
    pub fn generate(&self, range: &SlotRange) -> Vec<NewAppointment> {
        let slot = self.rules.slot_duration();
        let slot_count = (range.end - range.start).num_seconds() / slot.num_seconds();

        debug!(
            "Generating {} slots for {} between {} and {}",
            slot_count, range.provider, range.start, range.end
        );

        (0..slot_count as i32)
            .map(|index| {
                let slot_start = range.start + slot * index;
                NewAppointment::available(&range.provider, slot_start, slot_start + slot)
            })
            .collect()
    }
}

fn required<'a>(value: Option<&'a str>, field: &str) -> Result<&'a str, AppointmentError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(AppointmentError::Validation(format!("{} can not be empty!", field))),
    }
}

/// Accepts RFC 3339 or a naive ISO-8601 datetime, which is read as UTC.
///
/// The written offset is kept so calendar checks see the day the caller wrote.
pub fn parse_timestamp(raw: &str, field: &str) -> Result<DateTime<FixedOffset>, AppointmentError> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(parsed);
    }

    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| naive.and_utc().fixed_offset())
        .ok_or_else(|| {
            AppointmentError::Validation(format!("{} is not a valid date: {}", field, raw))
        })
}
