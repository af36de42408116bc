//! Serve command handler
//!
//! Handles the serve command including dry-run validation and server startup.

use crate::config::{Settings, StoreBackend};
use crate::error::AppResult;
use crate::server::Server;

/// Handler for the serve command
pub struct ServeCommandHandler {
    config: Settings,
}

impl ServeCommandHandler {
    /// Create a new serve command handler
    pub fn new(config: Settings) -> Self {
        Self { config }
    }

    /// Run the server until a shutdown signal, or only validate with `dry_run`.
    ///
    /// `recreate_tables` drops and recreates the schema before binding.
    pub async fn execute(self, dry_run: bool, recreate_tables: bool) -> AppResult<()> {
        if dry_run {
            return self.validate_only();
        }

        Server::new(self.config).run(recreate_tables).await?;
        Ok(())
    }

    /// Validate configuration without starting the server
    pub fn validate_only(&self) -> AppResult<()> {
        self.config.validate()?;

        println!("✓ Configuration is valid");
        println!("✓ Server would bind to: {}", self.config.server.address());
        match self.config.database.backend {
            StoreBackend::Postgres => println!("✓ Store backend: postgres"),
            StoreBackend::Memory => println!("✓ Store backend: memory (data is not persisted)"),
        }
        if self.config.auth.bootstrap_admin.enabled {
            println!(
                "✓ Bootstrap admin: {}",
                self.config.auth.bootstrap_admin.username
            );
        }
        println!("✓ Logger configuration is valid");

        println!("Dry run completed successfully - configuration is ready for deployment");
        Ok(())
    }

    /// Get the configuration
    pub fn config(&self) -> &Settings {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_serve_handler_new() {
        let config = Settings::default();
        let handler = ServeCommandHandler::new(config.clone());
        assert_eq!(handler.config(), &config);
    }

    #[tokio::test]
    async fn test_serve_handler_dry_run() {
        let handler = ServeCommandHandler::new(Settings::default());
        assert!(handler.execute(true, false).await.is_ok());
    }

    #[tokio::test]
    async fn test_serve_handler_dry_run_invalid_config() {
        let mut config = Settings::default();
        config.server.port = 0;
        let handler = ServeCommandHandler::new(config);

        assert!(handler.execute(true, false).await.is_err());
    }
}
