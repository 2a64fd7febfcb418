// libs/appointment-cell/src/services/supabase_store.rs
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{Appointment, AppointmentFilter, AppointmentStatus, NewAppointment, StoreError};
use crate::services::store::AppointmentStore;

const APPOINTMENTS_PATH: &str = "/rest/v1/appointments";

/// Column layout of the `appointments` table.
#[derive(Debug, Deserialize)]
struct AppointmentRow {
    id: i64,
    provider: String,
    timeslot_start: DateTime<Utc>,
    timeslot_end: DateTime<Utc>,
    status: AppointmentStatus,
    reserved_at: Option<DateTime<Utc>>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
}

impl From<AppointmentRow> for Appointment {
    fn from(row: AppointmentRow) -> Self {
        Appointment {
            id: row.id,
            provider: row.provider,
            timeslot_start: row.timeslot_start,
            timeslot_end: row.timeslot_end,
            status: row.status,
            reserved_at: row.reserved_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Appointment store backed by PostgREST.
///
/// Conditional updates are a single `PATCH` filtered on both id and status, so
/// Postgres decides which of two racing writers wins.
pub struct SupabaseAppointmentStore {
    supabase: Arc<SupabaseClient>,
}

impl SupabaseAppointmentStore {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: Arc::new(SupabaseClient::new(config)),
        }
    }

    pub fn with_client(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    fn filter_query(filter: &AppointmentFilter) -> String {
        match filter {
            AppointmentFilter::Id(id) => format!("id=eq.{}", id),
            AppointmentFilter::Status(status) => {
                format!("status=eq.{}&order=timeslot_start.asc", status)
            }
            AppointmentFilter::StatusStartingBetween { status, from, to } => {
                let mut query_parts = vec![
                    format!("status=eq.{}", status),
                    format!("timeslot_start=gte.{}", urlencoding::encode(&from.to_rfc3339())),
                ];
                if let Some(to) = to {
                    query_parts.push(format!(
                        "timeslot_start=lt.{}",
                        urlencoding::encode(&to.to_rfc3339())
                    ));
                }
                query_parts.push("order=timeslot_start.asc".to_string());
                query_parts.join("&")
            }
            AppointmentFilter::Reserved => "reserved_at=not.is.null".to_string(),
        }
    }

    fn representation_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));
        headers
    }

    fn insert_body(appointment: &NewAppointment) -> Value {
        json!({
            "provider": appointment.provider,
            "timeslot_start": appointment.timeslot_start.to_rfc3339(),
            "timeslot_end": appointment.timeslot_end.to_rfc3339(),
            "status": appointment.status.to_string(),
            "reserved_at": appointment.reserved_at.map(|t| t.to_rfc3339()),
        })
    }

    fn update_body(appointment: &Appointment) -> Value {
        json!({
            "provider": appointment.provider,
            "timeslot_start": appointment.timeslot_start.to_rfc3339(),
            "timeslot_end": appointment.timeslot_end.to_rfc3339(),
            "status": appointment.status.to_string(),
            "reserved_at": appointment.reserved_at.map(|t| t.to_rfc3339()),
            "updated_at": Utc::now().to_rfc3339(),
        })
    }

    fn parse_rows(rows: Vec<Value>) -> Result<Vec<Appointment>, StoreError> {
        rows.into_iter()
            .map(|row| {
                serde_json::from_value::<AppointmentRow>(row)
                    .map(Appointment::from)
                    .map_err(|e| StoreError::Decode(e.to_string()))
            })
            .collect()
    }

    async fn patch(&self, query: &str, appointment: &Appointment) -> Result<Vec<Appointment>, StoreError> {
        let path = format!("{}?{}", APPOINTMENTS_PATH, query);
        let rows: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(Self::update_body(appointment)),
                Some(Self::representation_headers()),
            )
            .await
            .map_err(|e| StoreError::Request(e.to_string()))?;

        Self::parse_rows(rows)
    }
}

#[async_trait]
impl AppointmentStore for SupabaseAppointmentStore {
    async fn create(&self, appointment: NewAppointment) -> Result<Appointment, StoreError> {
        self.bulk_create(vec![appointment])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::Empty("appointment insert".to_string()))
    }

    async fn bulk_create(
        &self,
        appointments: Vec<NewAppointment>,
    ) -> Result<Vec<Appointment>, StoreError> {
        debug!("Inserting {} appointments", appointments.len());

        let body = Value::Array(appointments.iter().map(Self::insert_body).collect());
        let rows: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::POST,
                APPOINTMENTS_PATH,
                Some(body),
                Some(Self::representation_headers()),
            )
            .await
            .map_err(|e| StoreError::Request(e.to_string()))?;

        let created = Self::parse_rows(rows)?;
        if created.len() != appointments.len() {
            return Err(StoreError::Empty(format!(
                "bulk insert (expected {} rows, got {})",
                appointments.len(),
                created.len()
            )));
        }

        Ok(created)
    }

    async fn find_one(&self, filter: AppointmentFilter) -> Result<Option<Appointment>, StoreError> {
        let path = format!("{}?select=*&{}&limit=1", APPOINTMENTS_PATH, Self::filter_query(&filter));
        let rows: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| StoreError::Request(e.to_string()))?;

        Ok(Self::parse_rows(rows)?.into_iter().next())
    }

    async fn find_all(&self, filter: AppointmentFilter) -> Result<Vec<Appointment>, StoreError> {
        let path = format!("{}?select=*&{}", APPOINTMENTS_PATH, Self::filter_query(&filter));
        let rows: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| StoreError::Request(e.to_string()))?;

        Self::parse_rows(rows)
    }

    async fn save(&self, appointment: &Appointment) -> Result<Appointment, StoreError> {
        let query = format!("id=eq.{}", appointment.id);
        self.patch(&query, appointment)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::Empty(format!("appointment id={}", appointment.id)))
    }

    async fn save_if_status(
        &self,
        appointment: &Appointment,
        expected: AppointmentStatus,
    ) -> Result<Option<Appointment>, StoreError> {
        let query = format!("id=eq.{}&status=eq.{}", appointment.id, expected);
        Ok(self.patch(&query, appointment).await?.into_iter().next())
    }
}
