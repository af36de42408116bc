//! Configuration validation logic
//!
//! Each section validates itself; [`Settings::validate`] reports the first
//! failure with the dotted path of the offending key.

use crate::config::error::ConfigError;
use crate::config::settings::{
    AuthConfig, DatabaseConfig, LoggerSettings, ServerConfig, Settings, StoreBackend,
};
use crate::logger::{LOG_LEVELS, LogFormat};

const POSTGRES_SCHEMES: &[&str] = &["postgres://", "postgresql://"];

impl ServerConfig {
    /// # Validation Rules
    /// - Port must not be 0
    /// - Request timeout must be greater than 0
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::validation(
                "server.port",
                "Port must be between 1 and 65535. Please specify a valid port number.",
            ));
        }

        if self.request_timeout == 0 {
            return Err(ConfigError::validation(
                "server.request_timeout",
                "Request timeout must be greater than 0 seconds.",
            ));
        }

        if self.host.trim().is_empty() {
            return Err(ConfigError::validation("server.host", "Host must not be empty."));
        }

        Ok(())
    }
}

impl DatabaseConfig {
    /// # Validation Rules
    /// - A non-empty URL for the Postgres backend must use a postgres scheme
    /// - Max connections must be greater than 0
    /// - Min connections must not exceed max connections
    /// - Connection timeout must be greater than 0
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.backend == StoreBackend::Postgres
            && !self.url.is_empty()
            && !POSTGRES_SCHEMES.iter().any(|scheme| self.url.starts_with(scheme))
        {
            return Err(ConfigError::validation(
                "database.url",
                "Invalid database URL format. Expected format: postgres://[user:password@]host[:port]/database",
            ));
        }

        if self.max_connections == 0 {
            return Err(ConfigError::validation(
                "database.max_connections",
                "Max connections must be greater than 0.",
            ));
        }

        if self.min_connections > self.max_connections {
            return Err(ConfigError::validation(
                "database.min_connections",
                format!(
                    "Min connections ({}) cannot exceed max connections ({}).",
                    self.min_connections, self.max_connections
                ),
            ));
        }

        if self.connection_timeout == 0 {
            return Err(ConfigError::validation(
                "database.connection_timeout",
                "Connection timeout must be greater than 0 seconds.",
            ));
        }

        Ok(())
    }
}

impl AuthConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let admin = &self.bootstrap_admin;
        if !admin.enabled {
            return Ok(());
        }
        if admin.username.trim().is_empty() {
            return Err(ConfigError::validation(
                "auth.bootstrap_admin.username",
                "Bootstrap admin username must not be empty while the bootstrap admin is enabled.",
            ));
        }
        if admin.password.is_empty() {
            return Err(ConfigError::validation(
                "auth.bootstrap_admin.password",
                "Bootstrap admin password must not be empty while the bootstrap admin is enabled.",
            ));
        }
        Ok(())
    }
}

impl LoggerSettings {
    /// # Validation Rules
    /// - Log level must be one of: trace, debug, info, warn, error
    /// - If file logging is enabled, path must not be empty
    /// - Log format must be one of: full, compact, json
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !LOG_LEVELS.contains(&self.level.to_lowercase().as_str()) {
            return Err(ConfigError::validation(
                "logger.level",
                format!(
                    "Invalid log level '{}'. Valid levels are: {}",
                    self.level,
                    LOG_LEVELS.join(", ")
                ),
            ));
        }

        if self.file.enabled && self.file.path.trim().is_empty() {
            return Err(ConfigError::validation(
                "logger.file.path",
                "File path is required when file logging is enabled.",
            ));
        }

        self.file
            .format
            .parse::<LogFormat>()
            .map_err(|e| ConfigError::validation("logger.file.format", e.to_string()))?;

        Ok(())
    }
}

impl Settings {
    /// Validates every section, returning the first error encountered.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.database.validate()?;
        self.auth.validate()?;
        self.logger.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::settings::BootstrapAdmin;

    fn field_of(err: ConfigError) -> String {
        err.field().map(str::to_string).unwrap_or_default()
    }

    #[test]
    fn test_default_settings_are_valid() {
        assert!(Settings::default().validate().is_ok());
    }

    #[test]
    fn test_server_rejects_port_zero() {
        let config = ServerConfig {
            port: 0,
            ..Default::default()
        };
        assert_eq!(field_of(config.validate().unwrap_err()), "server.port");
    }

    #[test]
    fn test_server_rejects_zero_timeout() {
        let config = ServerConfig {
            request_timeout: 0,
            ..Default::default()
        };
        assert_eq!(field_of(config.validate().unwrap_err()), "server.request_timeout");
    }

    #[test]
    fn test_database_url_scheme() {
        let config = DatabaseConfig {
            url: "mysql://localhost/db".to_string(),
            ..Default::default()
        };
        assert_eq!(field_of(config.validate().unwrap_err()), "database.url");

        let memory = DatabaseConfig {
            backend: StoreBackend::Memory,
            ..config
        };
        assert!(memory.validate().is_ok());
    }

    #[test]
    fn test_database_empty_url_is_assembled_later() {
        assert!(DatabaseConfig::default().validate().is_ok());
    }

    #[test]
    fn test_database_pool_bounds() {
        let config = DatabaseConfig {
            max_connections: 2,
            min_connections: 5,
            ..Default::default()
        };
        assert_eq!(field_of(config.validate().unwrap_err()), "database.min_connections");

        let config = DatabaseConfig {
            max_connections: 0,
            min_connections: 0,
            ..Default::default()
        };
        assert_eq!(field_of(config.validate().unwrap_err()), "database.max_connections");

        let config = DatabaseConfig {
            connection_timeout: 0,
            ..Default::default()
        };
        assert_eq!(field_of(config.validate().unwrap_err()), "database.connection_timeout");
    }

    #[test]
    fn test_enabled_bootstrap_admin_needs_credentials() {
        let auth = AuthConfig {
            bootstrap_admin: BootstrapAdmin {
                password: String::new(),
                ..Default::default()
            },
        };
        assert_eq!(field_of(auth.validate().unwrap_err()), "auth.bootstrap_admin.password");

        let disabled = AuthConfig {
            bootstrap_admin: BootstrapAdmin {
                enabled: false,
                username: String::new(),
                password: String::new(),
            },
        };
        assert!(disabled.validate().is_ok());
    }

    #[test]
    fn test_logger_rejects_unknown_level_and_format() {
        let mut logger = LoggerSettings {
            level: "chatty".to_string(),
            ..Default::default()
        };
        assert_eq!(field_of(logger.validate().unwrap_err()), "logger.level");

        logger.level = "warn".to_string();
        logger.file.format = "yaml".to_string();
        assert_eq!(field_of(logger.validate().unwrap_err()), "logger.file.format");
    }
}
