use chrono::{DateTime, Utc};
use serde_json::json;

use shared_config::{AppConfig, StoreBackend};

pub struct TestConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub store_backend: StoreBackend,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
            store_backend: StoreBackend::Memory,
        }
    }
}

impl TestConfig {
    /// Config pointing the Supabase store at a mock server.
    pub fn with_mock_url(url: &str) -> Self {
        Self {
            supabase_url: url.to_string(),
            store_backend: StoreBackend::Supabase,
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            store_backend: self.store_backend,
            port: 0,
            cors_allowed_origin: "http://localhost:8081".to_string(),
            expiry_sweep_interval_seconds: 60,
        }
    }
}

/// PostgREST row bodies shaped like the `appointments` table.
pub struct MockSupabaseResponses;

impl MockSupabaseResponses {
    pub fn appointment_row(
        id: i64,
        provider: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        status: &str,
        reserved_at: Option<DateTime<Utc>>,
    ) -> serde_json::Value {
        json!({
            "id": id,
            "provider": provider,
            "timeslot_start": start.to_rfc3339(),
            "timeslot_end": end.to_rfc3339(),
            "status": status,
            "reserved_at": reserved_at.map(|t| t.to_rfc3339()),
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn available_row(id: i64, start: DateTime<Utc>) -> serde_json::Value {
        Self::appointment_row(
            id,
            "Dr. Test",
            start,
            start + chrono::Duration::minutes(15),
            "available",
            None,
        )
    }

    pub fn error_response(message: &str, code: &str) -> serde_json::Value {
        json!({
            "message": message,
            "code": code,
            "details": null,
            "hint": null
        })
    }
}
