//! Logger setup on top of `tracing-subscriber`.
//!
//! Supports console output (ANSI colors only on a TTY), file output in full,
//! compact or JSON format, or both at once.

pub mod config;
pub mod error;
pub(crate) mod writer;

pub use config::{ConsoleConfig, FileConfig, LOG_LEVELS, LogFormat, LoggerConfig};
pub use error::LoggerError;

use std::io::IsTerminal;

use tracing_subscriber::{
    EnvFilter, Layer, Registry, fmt, layer::SubscriberExt, util::SubscriberInitExt,
};
use writer::LogFileWriter;

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

fn file_layer(config: &FileConfig) -> Result<BoxedLayer, LoggerError> {
    let writer = LogFileWriter::new(config)?;
    let layer = fmt::layer().with_ansi(false).with_target(true).with_writer(writer);
    Ok(match config.format {
        LogFormat::Full => layer.boxed(),
        LogFormat::Compact => layer.compact().boxed(),
        LogFormat::Json => layer.json().boxed(),
    })
}

fn console_layer(config: &ConsoleConfig) -> BoxedLayer {
    let use_ansi = config.colored && std::io::stdout().is_terminal();
    fmt::layer()
        .with_ansi(use_ansi)
        .with_target(true)
        .with_level(true)
        .boxed()
}

/// Builds the output layers; the file layer comes first so console ANSI
/// settings never leak into the file.
fn build_layers(config: &LoggerConfig) -> Result<Vec<BoxedLayer>, LoggerError> {
    let mut layers = Vec::with_capacity(2);
    if config.file.enabled {
        layers.push(file_layer(&config.file)?);
    }
    if config.console.enabled {
        layers.push(console_layer(&config.console));
    }
    Ok(layers)
}

/// Installs the global subscriber.
pub fn init_logger(config: LoggerConfig) -> Result<(), LoggerError> {
    config.validate()?;

    let filter = EnvFilter::try_new(config.level.to_lowercase())
        .map_err(|e| LoggerError::config(e.to_string()))?;

    tracing_subscriber::registry()
        .with(build_layers(&config)?)
        .with(filter)
        .try_init()
        .map_err(|e| LoggerError::Init(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_build_layers_respects_enabled_outputs() {
        let dir = TempDir::new().unwrap();
        let mut config = LoggerConfig::default();
        assert_eq!(build_layers(&config).unwrap().len(), 1);

        config.file = FileConfig {
            enabled: true,
            path: dir.path().join("app.log"),
            append: false,
            format: LogFormat::Compact,
        };
        assert_eq!(build_layers(&config).unwrap().len(), 2);
        assert!(config.file.path.exists());

        config.console.enabled = false;
        assert_eq!(build_layers(&config).unwrap().len(), 1);
    }

    #[test]
    fn test_init_rejects_invalid_config() {
        let mut config = LoggerConfig::default();
        config.level = "loud".to_string();
        assert!(matches!(init_logger(config), Err(LoggerError::Config { .. })));
    }
}
