//! Process configuration, loaded from the environment: every knob has an
//! environment variable and a documented default, with no CLI-argument
//! parsing crate involved.

use std::time::Duration;

use crate::hit::BackendFailurePolicy;

/// Process exit codes.
pub mod exit_code {
    pub const OK: i32 = 0;
    pub const CONFIG_ERROR: i32 = 1;
    pub const BIND_FAILURE: i32 = 2;
    pub const BACKEND_INIT_FAILURE: i32 = 3;
}

#[derive(Debug, Clone)]
pub struct Settings {
    /// `DIVVY_LISTEN_ADDR` — address to bind the TCP listener on.
    pub listen_addr: String,
    /// `DIVVY_CONFIG_PATH` — path to the INI rule file. Required.
    pub config_path: String,
    /// `DIVVY_BACKEND_ADDR` — only consulted when built with `redis-backend`.
    pub backend_addr: String,
    /// `DIVVY_LOG` — a `tracing_subscriber::EnvFilter` string.
    pub log_filter: String,
    /// `DIVVY_FAIL_OPEN` — backend-failure policy.
    pub failure_policy: BackendFailurePolicy,
    /// `DIVVY_MAX_LINE_BYTES` — per-connection read buffer cap.
    pub max_line_bytes: usize,
    /// `DIVVY_MAX_CONNECTIONS` — optional concurrent-connection cap.
    pub max_connections: Option<usize>,
    /// `DIVVY_SHUTDOWN_GRACE_SECONDS` — drain deadline on shutdown.
    pub shutdown_grace: Duration,
}

/// Error loading settings: currently only a missing required variable.
#[derive(Debug)]
pub struct SettingsError(pub String);

impl std::fmt::Display for SettingsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for SettingsError {}

impl Settings {
    pub fn from_env() -> Result<Self, SettingsError> {
        let config_path = std::env::var("DIVVY_CONFIG_PATH")
            .map_err(|_| SettingsError("DIVVY_CONFIG_PATH is required".to_string()))?;

        let listen_addr =
            std::env::var("DIVVY_LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:0".to_string());
        let backend_addr =
            std::env::var("DIVVY_BACKEND_ADDR").unwrap_or_else(|_| "127.0.0.1:6379".to_string());
        let log_filter = std::env::var("DIVVY_LOG").unwrap_or_else(|_| "info".to_string());

        let failure_policy = std::env::var("DIVVY_FAIL_OPEN")
            .map(|v| v != "false" && v != "0")
            .map(|open| {
                if open {
                    BackendFailurePolicy::FailOpen
                } else {
                    BackendFailurePolicy::FailClosed
                }
            })
            .unwrap_or(BackendFailurePolicy::FailOpen);

        let max_line_bytes = std::env::var("DIVVY_MAX_LINE_BYTES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(crate::protocol::DEFAULT_MAX_LINE_BYTES);

        let max_connections = std::env::var("DIVVY_MAX_CONNECTIONS")
            .ok()
            .and_then(|v| v.parse().ok());

        let shutdown_grace = std::env::var("DIVVY_SHUTDOWN_GRACE_SECONDS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(5));

        Ok(Settings {
            listen_addr,
            config_path,
            backend_addr,
            log_filter,
            failure_policy,
            max_line_bytes,
            max_connections,
            shutdown_grace,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Environment variables are process-global; serialize tests that touch
    // them so they don't race under the test harness's thread pool.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn missing_config_path_is_an_error() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::remove_var("DIVVY_CONFIG_PATH");
        assert!(Settings::from_env().is_err());
    }

    #[test]
    fn defaults_are_applied() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::set_var("DIVVY_CONFIG_PATH", "/tmp/divvy.ini");
        std::env::remove_var("DIVVY_LISTEN_ADDR");
        std::env::remove_var("DIVVY_FAIL_OPEN");
        let settings = Settings::from_env().unwrap();
        assert_eq!(settings.listen_addr, "0.0.0.0:0");
        assert_eq!(settings.failure_policy, BackendFailurePolicy::FailOpen);
        std::env::remove_var("DIVVY_CONFIG_PATH");
    }

    #[test]
    fn fail_open_toggle_honors_false() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::set_var("DIVVY_CONFIG_PATH", "/tmp/divvy.ini");
        std::env::set_var("DIVVY_FAIL_OPEN", "false");
        let settings = Settings::from_env().unwrap();
        assert_eq!(settings.failure_policy, BackendFailurePolicy::FailClosed);
        std::env::remove_var("DIVVY_CONFIG_PATH");
        std::env::remove_var("DIVVY_FAIL_OPEN");
    }
}
