//! Setup command handler
//!
//! Creates the store schema outside of the serving process.

use crate::config::Settings;
use crate::error::AppResult;
use crate::store::open_store;

/// Handler for the setup command
pub struct SetupCommandHandler {
    config: Settings,
}

impl SetupCommandHandler {
    pub fn new(config: Settings) -> Self {
        Self { config }
    }

    /// Create the tables, dropping existing ones first with `recreate`.
    pub async fn execute(&self, recreate: bool) -> AppResult<()> {
        self.config.database.validate()?;

        let store = open_store(&self.config.database).await?;
        tracing::info!(
            backend = %self.config.database.backend,
            recreate,
            "Setting up store schema"
        );
        store.setup(recreate).await?;
        tracing::info!("Store schema ready");

        println!(
            "✓ Schema {} on the {} backend",
            if recreate { "recreated" } else { "created" },
            self.config.database.backend
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreBackend;

    fn memory_config() -> Settings {
        let mut config = Settings::default();
        config.database.backend = StoreBackend::Memory;
        config
    }

    #[tokio::test]
    async fn test_setup_memory_backend() {
        let handler = SetupCommandHandler::new(memory_config());
        assert!(handler.execute(false).await.is_ok());
        assert!(handler.execute(true).await.is_ok());
    }

    #[tokio::test]
    async fn test_setup_rejects_invalid_database_config() {
        let mut config = memory_config();
        config.database.max_connections = 0;

        let err = SetupCommandHandler::new(config)
            .execute(false)
            .await
            .unwrap_err();
        assert!(matches!(err, crate::error::AppError::Configuration { .. }));
    }
}
