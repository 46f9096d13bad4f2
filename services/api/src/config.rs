use std::net::SocketAddr;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

pub const DEFAULT_APP_NAME: &str = "mission-relay";
pub const DEFAULT_QUEUE_DEPTH_WARNING: usize = 256;

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub app_name: String,
    /// Backend model. `None` lets the session initializer pick its default.
    pub model_id: Option<String>,
    pub gemini_api_key: String,
    pub gemini_live_url: Option<String>,
    pub queue_depth_warning: usize,
    pub log_level: Level,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
        let bind_address = bind_address_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string()))?;

        let app_name = std::env::var("APP_NAME")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_APP_NAME.to_string());

        let model_id = std::env::var("MODEL_ID")
            .ok()
            .filter(|s| !s.trim().is_empty());

        let gemini_api_key = std::env::var("GEMINI_API_KEY")
            .map_err(|_| ConfigError::MissingVar("GEMINI_API_KEY".to_string()))?;

        let gemini_live_url = std::env::var("GEMINI_LIVE_URL").ok();

        let queue_depth_warning = match std::env::var("QUEUE_DEPTH_WARNING") {
            Ok(raw) => raw.parse::<usize>().map_err(|e| {
                ConfigError::InvalidValue("QUEUE_DEPTH_WARNING".to_string(), e.to_string())
            })?,
            Err(_) => DEFAULT_QUEUE_DEPTH_WARNING,
        };

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        Ok(Self {
            bind_address,
            app_name,
            model_id,
            gemini_api_key,
            gemini_live_url,
            queue_depth_warning,
            log_level,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;
    use tracing::Level;

    fn clear_env_vars() {
        unsafe {
            env::remove_var("BIND_ADDRESS");
            env::remove_var("APP_NAME");
            env::remove_var("MODEL_ID");
            env::remove_var("GEMINI_API_KEY");
            env::remove_var("GEMINI_LIVE_URL");
            env::remove_var("QUEUE_DEPTH_WARNING");
            env::remove_var("RUST_LOG");
        }
    }

    fn set_minimal_env() {
        unsafe {
            env::set_var("GEMINI_API_KEY", "test-gemini-key");
        }
    }

    #[test]
    fn test_config_error_display() {
        let missing_var = ConfigError::MissingVar("TEST_VAR".to_string());
        assert_eq!(
            format!("{}", missing_var),
            "Missing environment variable: TEST_VAR"
        );

        let invalid_value =
            ConfigError::InvalidValue("TEST_VAR".to_string(), "bad_value".to_string());
        assert_eq!(
            format!("{}", invalid_value),
            "Invalid value for environment variable TEST_VAR: bad_value"
        );
    }

    #[test]
    #[serial]
    fn test_config_from_env_minimal() {
        clear_env_vars();
        set_minimal_env();

        let config = Config::from_env().expect("Config should load successfully");

        assert_eq!(config.bind_address.to_string(), "0.0.0.0:8080");
        assert_eq!(config.app_name, DEFAULT_APP_NAME);
        assert_eq!(config.model_id, None);
        assert_eq!(config.gemini_api_key, "test-gemini-key");
        assert_eq!(config.gemini_live_url, None);
        assert_eq!(config.queue_depth_warning, DEFAULT_QUEUE_DEPTH_WARNING);
        assert_eq!(config.log_level, Level::INFO);
    }

    #[test]
    #[serial]
    fn test_config_from_env_custom_values() {
        clear_env_vars();
        unsafe {
            env::set_var("BIND_ADDRESS", "127.0.0.1:8000");
            env::set_var("APP_NAME", "mission-bravo");
            env::set_var("MODEL_ID", "gemini-2.5-flash");
            env::set_var("GEMINI_API_KEY", "custom-gemini-key");
            env::set_var("GEMINI_LIVE_URL", "ws://localhost:9000/live");
            env::set_var("QUEUE_DEPTH_WARNING", "32");
            env::set_var("RUST_LOG", "debug");
        }

        let config = Config::from_env().expect("Config should load successfully");

        assert_eq!(config.bind_address.to_string(), "127.0.0.1:8000");
        assert_eq!(config.app_name, "mission-bravo");
        assert_eq!(config.model_id.as_deref(), Some("gemini-2.5-flash"));
        assert_eq!(config.gemini_api_key, "custom-gemini-key");
        assert_eq!(
            config.gemini_live_url.as_deref(),
            Some("ws://localhost:9000/live")
        );
        assert_eq!(config.queue_depth_warning, 32);
        assert_eq!(config.log_level, Level::DEBUG);
    }

    #[test]
    #[serial]
    fn test_blank_model_id_is_treated_as_unset() {
        clear_env_vars();
        set_minimal_env();
        unsafe {
            env::set_var("MODEL_ID", "  ");
        }

        let config = Config::from_env().expect("Config should load successfully");
        assert_eq!(config.model_id, None);
    }

    #[test]
    #[serial]
    fn test_config_invalid_bind_address() {
        clear_env_vars();
        set_minimal_env();
        unsafe {
            env::set_var("BIND_ADDRESS", "not-a-valid-address");
        }

        let err = Config::from_env().unwrap_err();
        match err {
            ConfigError::InvalidValue(var, _) => assert_eq!(var, "BIND_ADDRESS"),
            _ => panic!("Expected InvalidValue for BIND_ADDRESS"),
        }
    }

    #[test]
    #[serial]
    fn test_config_invalid_queue_depth() {
        clear_env_vars();
        set_minimal_env();
        unsafe {
            env::set_var("QUEUE_DEPTH_WARNING", "lots");
        }

        let err = Config::from_env().unwrap_err();
        match err {
            ConfigError::InvalidValue(var, _) => assert_eq!(var, "QUEUE_DEPTH_WARNING"),
            _ => panic!("Expected InvalidValue for QUEUE_DEPTH_WARNING"),
        }
    }

    #[test]
    #[serial]
    fn test_config_invalid_log_level() {
        clear_env_vars();
        set_minimal_env();
        unsafe {
            env::set_var("RUST_LOG", "not-a-level");
        }

        let err = Config::from_env().unwrap_err();
        match err {
            ConfigError::InvalidValue(var, _) => assert_eq!(var, "RUST_LOG"),
            _ => panic!("Expected InvalidValue for RUST_LOG"),
        }
    }

    #[test]
    #[serial]
    fn test_config_missing_gemini_key() {
        clear_env_vars();

        let err = Config::from_env().unwrap_err();
        match err {
            ConfigError::MissingVar(msg) => assert!(msg.contains("GEMINI_API_KEY")),
            _ => panic!("Expected MissingVar for GEMINI_API_KEY"),
        }
    }
}
