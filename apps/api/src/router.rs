use std::sync::Arc;

use axum::{routing::get, Json, Router};
use serde_json::{json, Value};

use appointment_cell::router::appointment_routes;
use appointment_cell::services::AppointmentLifecycleService;

pub fn create_router(lifecycle: Arc<AppointmentLifecycleService>) -> Router {
    Router::new()
        .route("/", get(welcome))
        .nest("/api/appointments", appointment_routes(lifecycle))
}

async fn welcome() -> Json<Value> {
    Json(json!({ "message": "Welcome to appointments api." }))
}
