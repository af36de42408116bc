//! Command handlers for CLI operations

pub mod serve;
pub mod setup;

pub use serve::ServeCommandHandler;
pub use setup::SetupCommandHandler;
