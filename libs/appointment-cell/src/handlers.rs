// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use tracing::error;

use shared_models::error::AppError;

use crate::models::{
    Appointment, AppointmentError, CreateSlotsRequest, LifecycleAction, MessageResponse,
};
use crate::services::lifecycle::AppointmentLifecycleService;

// Transition and cutoff errors surface as 500.
fn map_lifecycle_error(e: AppointmentError, storage_message: String) -> AppError {
    let message = e.to_string();

    match e {
        AppointmentError::Validation(_) => AppError::ValidationError(message),
        AppointmentError::NotFound(_) => AppError::NotFound(message),
        AppointmentError::InvalidTransition { .. } | AppointmentError::TooSoon { .. } => {
            AppError::Internal(message)
        }
        AppointmentError::Storage(inner) => {
            error!("Storage failure: {}", inner);
            AppError::Database(storage_message)
        }
    }
}

fn parse_appointment_id(raw: &str) -> Result<i64, AppError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(AppError::ValidationError("Id can not be empty!".to_string()));
    }

    raw.parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| AppError::ValidationError(format!("Invalid appointment id: {}", raw)))
}

pub async fn create_appointments(
    State(lifecycle): State<Arc<AppointmentLifecycleService>>,
    payload: Result<Json<CreateSlotsRequest>, JsonRejection>,
) -> Result<Json<Vec<Appointment>>, AppError> {
    let Json(request) = payload.map_err(|rejection| AppError::ValidationError(rejection.body_text()))?;

    let appointments = lifecycle.create_slots(request).await.map_err(|e| {
        map_lifecycle_error(e, "Some error occurred while creating the Appointment.".to_string())
    })?;

    Ok(Json(appointments))
}

pub async fn find_available_appointments(
    State(lifecycle): State<Arc<AppointmentLifecycleService>>,
) -> Result<Json<Vec<Appointment>>, AppError> {
    let appointments = lifecycle.find_available().await.map_err(|e| {
        map_lifecycle_error(e, "Some error occurred while retrieving appointments.".to_string())
    })?;

    Ok(Json(appointments))
}

pub async fn reserve_appointment(
    State(lifecycle): State<Arc<AppointmentLifecycleService>>,
    Path(appointment_id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    let id = parse_appointment_id(&appointment_id)?;
    let action = LifecycleAction::Reserve;

    lifecycle.reserve(id).await.map_err(|e| {
        map_lifecycle_error(e, format!("Error {} appointment with id={}", action.progressive(), id))
    })?;

    Ok(Json(MessageResponse::new(action.success_message())))
}

pub async fn confirm_appointment(
    State(lifecycle): State<Arc<AppointmentLifecycleService>>,
    Path(appointment_id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    let id = parse_appointment_id(&appointment_id)?;
    let action = LifecycleAction::Confirm;

    lifecycle.confirm(id).await.map_err(|e| {
        map_lifecycle_error(e, format!("Error {} appointment with id={}", action.progressive(), id))
    })?;

    Ok(Json(MessageResponse::new(action.success_message())))
}
