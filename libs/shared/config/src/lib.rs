use std::env;
use std::str::FromStr;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Supabase,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "supabase" | "postgrest" => Ok(StoreBackend::Supabase),
            "memory" | "in-memory" | "in_memory" => Ok(StoreBackend::Memory),
            other => Err(format!("Unknown appointment store backend: {}", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub store_backend: StoreBackend,
    pub port: u16,
    pub cors_allowed_origin: String,
    pub expiry_sweep_interval_seconds: u64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let supabase_url = env::var("SUPABASE_URL")
            .unwrap_or_else(|_| {
                warn!("SUPABASE_URL not set, using empty value");
                String::new()
            });
        let supabase_anon_key = env::var("SUPABASE_ANON_PUBLIC_KEY")
            .unwrap_or_else(|_| {
                warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                String::new()
            });

        let default_backend = if supabase_url.is_empty() || supabase_anon_key.is_empty() {
            StoreBackend::Memory
        } else {
            StoreBackend::Supabase
        };

        let store_backend = match env::var("APPOINTMENT_STORE") {
            Ok(value) => value.parse().unwrap_or_else(|e| {
                warn!("{}, using {:?}", e, default_backend);
                default_backend
            }),
            Err(_) => default_backend,
        };

        let config = Self {
            supabase_url,
            supabase_anon_key,
            store_backend,
            port: parse_or_default("PORT", 8080),
            cors_allowed_origin: env::var("CORS_ALLOWED_ORIGIN")
                .unwrap_or_else(|_| "http://localhost:8081".to_string()),
            expiry_sweep_interval_seconds: parse_or_default("EXPIRY_SWEEP_INTERVAL_SECONDS", 60),
        };

        if config.store_backend == StoreBackend::Supabase && !config.is_configured() {
            warn!("Supabase store selected but not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty() && !self.supabase_anon_key.is_empty()
    }
}

fn parse_or_default<T>(key: &str, default: T) -> T
where
    T: FromStr + Copy + std::fmt::Debug,
{
    match env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("{} has invalid value {:?}, using default {:?}", key, raw, default);
            default
        }),
        Err(_) => default,
    }
}
