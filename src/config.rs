// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! A `.env` file is honored for local development.

use std::env;
use std::time::Duration;

/// Default frame sampling interval, roughly one display refresh at 30 Hz.
const DEFAULT_SCAN_FRAME_INTERVAL_MS: u64 = 33;
const DEFAULT_TICKET_MODULE_PX: u32 = 8;

/// Which document store backs the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// Cloud Firestore (or the emulator when FIRESTORE_EMULATOR_HOST is set)
    Firestore,
    /// In-process store; data is lost on restart
    Memory,
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// GCP project ID
    pub gcp_project_id: String,
    /// Server port
    pub port: u16,
    /// Frontend URL (CORS origin)
    pub frontend_url: String,
    /// Event name printed on tickets and certificates
    pub event_name: String,
    pub store_backend: StoreBackend,
    /// Delay between frame samples while scanning
    pub scan_frame_interval: Duration,
    /// Pixel size of one QR module on rendered tickets
    pub ticket_module_px: u32,

    // --- Secrets ---
    /// JWT signing key for session tokens (raw bytes)
    pub jwt_signing_key: Vec<u8>,
}

impl Config {
    /// Config for tests only.
    pub fn test_default() -> Self {
        Self {
            gcp_project_id: "test-project".to_string(),
            port: 8080,
            frontend_url: "http://localhost:5173".to_string(),
            event_name: "Test Ride".to_string(),
            store_backend: StoreBackend::Memory,
            scan_frame_interval: Duration::from_millis(5),
            ticket_module_px: 4,
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let store_backend = match env::var("STORE_BACKEND")
            .unwrap_or_else(|_| "firestore".to_string())
            .trim()
            .to_ascii_lowercase()
            .as_str()
        {
            "firestore" => StoreBackend::Firestore,
            "memory" => StoreBackend::Memory,
            other => {
                return Err(ConfigError::Invalid {
                    var: "STORE_BACKEND",
                    value: other.to_string(),
                })
            }
        };

        let jwt_signing_key = env::var("JWT_SIGNING_KEY")
            .map_err(|_| ConfigError::Missing("JWT_SIGNING_KEY"))?
            .trim()
            .as_bytes()
            .to_vec();
        if jwt_signing_key.len() < 32 {
            return Err(ConfigError::Invalid {
                var: "JWT_SIGNING_KEY",
                value: "<shorter than 32 bytes>".to_string(),
            });
        }

        Ok(Self {
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            port: parse_var("PORT", 8080)?,
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            event_name: env::var("EVENT_NAME").unwrap_or_else(|_| "Community Ride".to_string()),
            store_backend,
            scan_frame_interval: Duration::from_millis(parse_nonzero(
                "SCAN_FRAME_INTERVAL_MS",
                DEFAULT_SCAN_FRAME_INTERVAL_MS,
            )?),
            ticket_module_px: parse_nonzero("TICKET_MODULE_PX", DEFAULT_TICKET_MODULE_PX)?,
            jwt_signing_key,
        })
    }
}

/// Read an optional numeric variable, rejecting unparseable values.
fn parse_var<T: std::str::FromStr>(var: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(var) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid { var, value: raw }),
        Err(_) => Ok(default),
    }
}

/// Like [`parse_var`], but zero is invalid too.
fn parse_nonzero<T>(var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr + PartialEq + Default + std::fmt::Display,
{
    let value = parse_var(var, default)?;
    if value == T::default() {
        return Err(ConfigError::Invalid {
            var,
            value: value.to_string(),
        });
    }
    Ok(value)
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {var}: {value}")]
    Invalid { var: &'static str, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    // Single test touching the process environment to avoid races between tests.
    #[test]
    fn test_config_from_env() {
        env::remove_var("JWT_SIGNING_KEY");
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::Missing("JWT_SIGNING_KEY"))
        ));

        env::set_var("JWT_SIGNING_KEY", "test_jwt_key_32_bytes_minimum!!!");
        env::set_var("STORE_BACKEND", "memory");
        env::set_var("SCAN_FRAME_INTERVAL_MS", "50");

        let config = Config::from_env().expect("Config should load");
        assert_eq!(config.store_backend, StoreBackend::Memory);
        assert_eq!(config.scan_frame_interval, Duration::from_millis(50));
        assert_eq!(config.ticket_module_px, DEFAULT_TICKET_MODULE_PX);

        env::set_var("SCAN_FRAME_INTERVAL_MS", "fast");
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::Invalid {
                var: "SCAN_FRAME_INTERVAL_MS",
                ..
            })
        ));

        // A zero interval would stall the frame sampler
        env::set_var("SCAN_FRAME_INTERVAL_MS", "0");
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::Invalid {
                var: "SCAN_FRAME_INTERVAL_MS",
                ..
            })
        ));

        env::set_var("SCAN_FRAME_INTERVAL_MS", "50");
        env::set_var("TICKET_MODULE_PX", "0");
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::Invalid {
                var: "TICKET_MODULE_PX",
                ..
            })
        ));
        env::remove_var("TICKET_MODULE_PX");

        env::set_var("STORE_BACKEND", "postgres");
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::Invalid {
                var: "STORE_BACKEND",
                ..
            })
        ));
        env::remove_var("STORE_BACKEND");
    }
}
