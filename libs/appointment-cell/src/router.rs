// libs/appointment-cell/src/router.rs
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};

use crate::handlers;
use crate::services::lifecycle::AppointmentLifecycleService;

pub fn appointment_routes(lifecycle: Arc<AppointmentLifecycleService>) -> Router {
    Router::new()
        .route("/", post(handlers::create_appointments))
        .route("/", get(handlers::find_available_appointments))
        .route("/{appointment_id}/reserve", post(handlers::reserve_appointment))
        .route("/{appointment_id}/confirm", post(handlers::confirm_appointment))
        .with_state(lifecycle)
}
