//! CLI argument parsing with clap

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Movie and actor catalogue REST service
#[derive(Parser, Debug)]
#[command(name = "filmoteka")]
#[command(about = "Movie and actor catalogue REST service")]
#[command(long_about = "
Filmoteka serves a catalogue of movies and actors over HTTP. Reads are open
to any known user; changes require an administrator.

EXAMPLES:
    # Start the server with default configuration
    filmoteka serve

    # Start server on custom host and port
    filmoteka serve --host 0.0.0.0 --port 8080

    # Use custom configuration file
    filmoteka --config /path/to/config.toml serve

    # Check configuration without starting server
    filmoteka serve --dry-run

    # Create the database tables
    filmoteka setup

    # Drop and recreate the database tables
    filmoteka setup --recreate
")]
#[command(version = crate::build::CLAP_LONG_VERSION)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Configuration file path
    ///
    /// Load this TOML file instead of the layered `config/` directory.
    ///
    /// Example: --config /etc/filmoteka/production.toml
    #[arg(short, long, value_name = "FILE", value_parser = super::validation::validate_config_file_path)]
    pub config: Option<PathBuf>,

    /// Override environment detection
    ///
    /// Selects which `config/{env}.toml` layer is loaded.
    ///
    /// Available values: development (dev), test, staging (stage), production (prod)
    #[arg(short, long, value_enum)]
    pub env: Option<Environment>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the web server (default)
    ///
    /// Examples:
    ///   filmoteka serve                           # Start with defaults
    ///   filmoteka serve --host 0.0.0.0 --port 80  # Bind to all interfaces on port 80
    ///   filmoteka serve --dry-run                 # Validate config without starting
    Serve {
        /// Host address to bind to
        #[arg(long, value_name = "ADDRESS", value_parser = super::validation::validate_host_address)]
        host: Option<String>,

        /// Port number to listen on
        #[arg(short, long, value_name = "PORT", value_parser = super::validation::validate_port)]
        port: Option<u16>,

        /// Log level override
        ///
        /// Takes precedence over the configuration files and --verbose/--quiet.
        #[arg(long, value_enum)]
        log_level: Option<LogLevel>,

        /// Validate configuration and exit
        #[arg(long)]
        dry_run: bool,

        /// Drop and recreate the database tables before serving
        ///
        /// All stored actors, movies and users are lost.
        #[arg(long, conflicts_with = "dry_run")]
        recreate_tables: bool,
    },
    /// Create the database tables and exit
    ///
    /// Examples:
    ///   filmoteka setup              # Create missing tables
    ///   filmoteka setup --recreate   # Drop everything first
    Setup {
        /// Drop existing tables before creating them
        #[arg(long)]
        recreate: bool,
    },
}

/// Environment options
#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum Environment {
    #[value(name = "development", alias = "dev")]
    Development,
    #[value(name = "test")]
    Test,
    #[value(name = "staging", alias = "stage")]
    Staging,
    #[value(name = "production", alias = "prod")]
    Production,
}

/// Log level options
#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum LogLevel {
    #[value(name = "error")]
    Error,
    #[value(name = "warn", alias = "warning")]
    Warn,
    #[value(name = "info")]
    Info,
    #[value(name = "debug")]
    Debug,
    #[value(name = "trace")]
    Trace,
}

impl Cli {
    /// Whether the process should start the HTTP server after this command.
    pub fn starts_server(&self) -> bool {
        matches!(
            self.command,
            None | Some(Commands::Serve { dry_run: false, .. })
        )
    }

    /// Whether the store tables must be dropped before use.
    pub fn recreates_tables(&self) -> bool {
        matches!(
            self.command,
            Some(Commands::Serve {
                recreate_tables: true,
                ..
            })
        )
    }
}

impl From<LogLevel> for String {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => "error".to_string(),
            LogLevel::Warn => "warn".to_string(),
            LogLevel::Info => "info".to_string(),
            LogLevel::Debug => "debug".to_string(),
            LogLevel::Trace => "trace".to_string(),
        }
    }
}

impl From<Environment> for crate::config::Environment {
    fn from(env: Environment) -> Self {
        match env {
            Environment::Development => crate::config::Environment::Development,
            Environment::Test => crate::config::Environment::Test,
            Environment::Staging => crate::config::Environment::Staging,
            Environment::Production => crate::config::Environment::Production,
        }
    }
}
