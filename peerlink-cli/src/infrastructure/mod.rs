pub mod config_loader;
pub mod error;
pub mod observability;

pub use config_loader::load_config;
pub use error::{CliError, Result};
pub use observability::LogConfig;
