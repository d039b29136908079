pub mod application;
pub mod infrastructure;

pub use application::{DemoOptions, DemoReport, LoopbackDemo};
pub use infrastructure::{CliError, LogConfig, Result};
