//! AURA Swarm CLI
//!
//! Library half of the `aura-swarm` binary: argument definitions, config,
//! command wiring and terminal rendering.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod monitor_view;
pub mod output;

pub use cli::{Cli, Command, PermissionsCommand};
pub use commands::App;
pub use config::{CliConfig, ConfigLoadError, StoreConfig};
pub use error::CliError;
pub use output::Report;
