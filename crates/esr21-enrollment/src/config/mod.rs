use std::env;
use std::net::{IpAddr, SocketAddr};

use crate::enrollment::{EnrollmentConfig, IllnessNumbering};

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the enrollment service.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub enrollment: EnrollmentConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            enrollment: load_enrollment()?,
        })
    }
}

fn load_enrollment() -> Result<EnrollmentConfig, ConfigError> {
    let defaults = EnrollmentConfig::default();

    let secondary_capacity = match env::var("ENROLLMENT_SECONDARY_CAPACITY") {
        Ok(raw) => raw
            .trim()
            .parse::<usize>()
            .map_err(|_| ConfigError::InvalidCapacity(raw))?,
        Err(_) => defaults.secondary_capacity,
    };

    let illness_numbering = match env::var("ENROLLMENT_ILLNESS_NUMBERING") {
        Ok(raw) => {
            IllnessNumbering::parse(&raw).ok_or(ConfigError::InvalidIllnessNumbering(raw))?
        }
        Err(_) => defaults.illness_numbering,
    };

    let illness_schedules = match env::var("ENROLLMENT_ILLNESS_SCHEDULES") {
        Ok(raw) => match raw.trim().parse::<u32>() {
            Ok(count) if count >= 1 => count,
            _ => return Err(ConfigError::InvalidIllnessSchedules(raw)),
        },
        Err(_) => defaults.illness_schedules,
    };

    Ok(EnrollmentConfig {
        secondary_capacity,
        illness_numbering,
        illness_schedules,
    })
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("APP_PORT must be a valid u16")]
    InvalidPort,
    #[error("APP_HOST must parse to an IPv4 or IPv6 address")]
    InvalidHost { source: std::net::AddrParseError },
    #[error("ENROLLMENT_SECONDARY_CAPACITY must be a non-negative integer, got '{0}'")]
    InvalidCapacity(String),
    #[error("ENROLLMENT_ILLNESS_NUMBERING must be 'per_participant' or 'global', got '{0}'")]
    InvalidIllnessNumbering(String),
    #[error("ENROLLMENT_ILLNESS_SCHEDULES must be a positive integer, got '{0}'")]
    InvalidIllnessSchedules(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        for key in [
            "APP_ENV",
            "APP_HOST",
            "APP_PORT",
            "APP_LOG_LEVEL",
            "ENROLLMENT_SECONDARY_CAPACITY",
            "ENROLLMENT_ILLNESS_NUMBERING",
            "ENROLLMENT_ILLNESS_SCHEDULES",
        ] {
            env::remove_var(key);
        }
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.enrollment, EnrollmentConfig::default());
        assert_eq!(config.enrollment.secondary_capacity, 3000);
    }

    #[test]
    fn reads_enrollment_overrides() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("ENROLLMENT_SECONDARY_CAPACITY", "25");
        env::set_var("ENROLLMENT_ILLNESS_NUMBERING", "global");
        env::set_var("ENROLLMENT_ILLNESS_SCHEDULES", "4");
        let config = AppConfig::load().expect("config loads");
        reset_env();

        assert_eq!(config.enrollment.secondary_capacity, 25);
        assert_eq!(config.enrollment.illness_numbering, IllnessNumbering::Global);
        assert_eq!(config.enrollment.illness_schedules, 4);
    }

    #[test]
    fn rejects_zero_illness_schedules() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("ENROLLMENT_ILLNESS_SCHEDULES", "0");
        let result = AppConfig::load();
        reset_env();

        assert!(matches!(
            result,
            Err(ConfigError::InvalidIllnessSchedules(ref raw)) if raw == "0"
        ));
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        reset_env();
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
    }
}
