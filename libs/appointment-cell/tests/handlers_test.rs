use std::sync::Arc;

use assert_matches::assert_matches;
use axum::{
    body::{to_bytes, Body},
    extract::{Path, State},
    http::{Request, StatusCode},
    Json,
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;

use appointment_cell::handlers::*;
use appointment_cell::models::{AppointmentStatus, CreateSlotsRequest, NewAppointment};
use appointment_cell::router::appointment_routes;
use appointment_cell::services::{
    AppointmentLifecycleService, AppointmentStore, InMemoryAppointmentStore,
};
use shared_models::error::AppError;

fn setup() -> (Arc<InMemoryAppointmentStore>, Arc<AppointmentLifecycleService>) {
    let store = Arc::new(InMemoryAppointmentStore::new());
    let service = Arc::new(AppointmentLifecycleService::new(store.clone()));
    (store, service)
}

async fn seed(store: &InMemoryAppointmentStore, start: DateTime<Utc>, status: AppointmentStatus) -> i64 {
    let reserved_at = (status == AppointmentStatus::Reserved).then(Utc::now);
    store
        .create(NewAppointment {
            provider: "Dr. X".to_string(),
            timeslot_start: start,
            timeslot_end: start + Duration::minutes(15),
            status,
            reserved_at,
        })
        .await
        .unwrap()
        .id
}

fn far_future() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2030, 9, 24, 14, 0, 0).unwrap()
}

async fn send(
    service: Arc<AppointmentLifecycleService>,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let app = axum::Router::new().nest("/api/appointments", appointment_routes(service));

    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(match body {
            Some(body) => Body::from(body.to_string()),
            None => Body::empty(),
        })
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

    (status, json)
}

// ==============================================================================
// DIRECT HANDLER CALLS
// ==============================================================================

#[tokio::test]
async fn test_create_handler_returns_slots() {
    let (_store, service) = setup();

    let Json(created) = create_appointments(
        State(service),
        Ok(Json(CreateSlotsRequest::new("Dr. X", "2023-09-24T12:00:00", "2023-09-24T12:30:00"))),
    )
    .await
    .unwrap();

    assert_eq!(created.len(), 2);
}

#[tokio::test]
async fn test_create_handler_maps_validation_error() {
    let (_store, service) = setup();

    let result = create_appointments(State(service), Ok(Json(CreateSlotsRequest::default()))).await;

    assert_matches!(result, Err(AppError::ValidationError(msg)) if msg == "Provider can not be empty!");
}

#[tokio::test]
async fn test_reserve_handler_rejects_blank_id() {
    let (_store, service) = setup();

    let result = reserve_appointment(State(service), Path(" ".to_string())).await;

    assert_matches!(result, Err(AppError::ValidationError(msg)) if msg == "Id can not be empty!");
}

#[tokio::test]
async fn test_reserve_handler_rejects_non_numeric_id() {
    let (_store, service) = setup();

    let result = reserve_appointment(State(service), Path("abc".to_string())).await;

    assert_matches!(result, Err(AppError::ValidationError(_)));
}

#[tokio::test]
async fn test_reserve_then_confirm_handlers() {
    let (store, service) = setup();
    let id = seed(&store, far_future(), AppointmentStatus::Available).await;

    let Json(reserved) = reserve_appointment(State(service.clone()), Path(id.to_string()))
        .await
        .unwrap();
    assert_eq!(reserved.message, "Appointment was reserved successfully.");

    let Json(confirmed) = confirm_appointment(State(service), Path(id.to_string()))
        .await
        .unwrap();
    assert_eq!(confirmed.message, "Appointment was confirmed successfully.");
}

#[tokio::test]
async fn test_transition_errors_surface_as_internal() {
    let (store, service) = setup();
    let id = seed(&store, far_future(), AppointmentStatus::Available).await;

    let result = confirm_appointment(State(service), Path(id.to_string())).await;

    assert_matches!(result, Err(AppError::Internal(msg)) if msg == "Cant confirm unreserved appointment");
}

#[tokio::test]
async fn test_unknown_id_is_not_found() {
    let (_store, service) = setup();

    let result = confirm_appointment(State(service), Path("99".to_string())).await;

    assert_matches!(result, Err(AppError::NotFound(_)));
}

// ==============================================================================
// ROUTER
// ==============================================================================

#[tokio::test]
async fn test_post_create_route() {
    let (_store, service) = setup();

    let (status, body) = send(
        service,
        "POST",
        "/api/appointments",
        Some(json!({
            "provider": "Dr. X",
            "start": "2030-09-24T12:00:00",
            "end": "2030-09-24T13:00:00"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let slots = body.as_array().unwrap();
    assert_eq!(slots.len(), 4);
    assert_eq!(slots[0]["status"], "available");
    assert_eq!(slots[0]["provider"], "Dr. X");
    assert!(slots[0]["reservedAt"].is_null());
    assert_eq!(slots[3]["timeslotEnd"], "2030-09-24T13:00:00Z");
}

#[tokio::test]
async fn test_post_create_route_validation_is_400() {
    let (_store, service) = setup();

    let (status, body) = send(
        service,
        "POST",
        "/api/appointments",
        Some(json!({ "provider": "Dr. X", "start": "2030-09-24T12:00:00" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "message": "End can not be empty!" }));
}

#[tokio::test]
async fn test_post_create_route_without_json_body_is_400() {
    let (store, service) = setup();
    let app = axum::Router::new().nest("/api/appointments", appointment_routes(service));

    let request = Request::builder()
        .method("POST")
        .uri("/api/appointments")
        .header("content-type", "application/x-www-form-urlencoded")
        .body(Body::from("provider=Dr.+X&start=2030-09-24T12:00:00&end=2030-09-24T13:00:00"))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert!(body["message"].as_str().unwrap().contains("Content-Type"));
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn test_post_create_route_malformed_json_is_400() {
    let (_store, service) = setup();
    let app = axum::Router::new().nest("/api/appointments", appointment_routes(service));

    let request = Request::builder()
        .method("POST")
        .uri("/api/appointments")
        .header("content-type", "application/json")
        .body(Body::from("{\"provider\": "))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn test_get_route_lists_bookable_slots() {
    let (store, service) = setup();
    let later = seed(&store, far_future() + Duration::hours(1), AppointmentStatus::Available).await;
    let sooner = seed(&store, far_future(), AppointmentStatus::Available).await;
    seed(&store, far_future(), AppointmentStatus::Reserved).await;
    seed(&store, Utc::now() + Duration::hours(1), AppointmentStatus::Available).await;

    let (status, body) = send(service, "GET", "/api/appointments", None).await;

    assert_eq!(status, StatusCode::OK);
    let ids: Vec<i64> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![sooner, later]);
}

#[tokio::test]
async fn test_reserve_route_twice_returns_500() {
    let (store, service) = setup();
    let id = seed(&store, far_future(), AppointmentStatus::Available).await;
    let uri = format!("/api/appointments/{}/reserve", id);

    let (status, body) = send(service.clone(), "POST", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "message": "Appointment was reserved successfully." }));

    let (status, body) = send(service, "POST", &uri, None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "message": "Cant reserve unavailable appointment" }));
}

#[tokio::test]
async fn test_reserve_route_too_soon_returns_500() {
    let (store, service) = setup();
    let id = seed(&store, Utc::now() + Duration::seconds(1), AppointmentStatus::Available).await;

    let (status, body) = send(service, "POST", &format!("/api/appointments/{}/reserve", id), None).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body,
        json!({ "message": "Cant reserve appointment under 24h of the selected time." })
    );
}

#[tokio::test]
async fn test_confirm_route_after_reserve() {
    let (store, service) = setup();
    let id = seed(&store, far_future(), AppointmentStatus::Reserved).await;

    let (status, body) = send(service, "POST", &format!("/api/appointments/{}/confirm", id), None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "message": "Appointment was confirmed successfully." }));
}
