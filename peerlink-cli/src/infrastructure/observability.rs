use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::infrastructure::error::{CliError, Result};

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub default_level: tracing::Level,
    pub show_thread_ids: bool,
    pub show_targets: bool,
    /// Whether to write logs to stdout at all
    pub show_logs: bool,

    #[cfg(feature = "console")]
    pub enable_console: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            default_level: tracing::Level::INFO,
            show_thread_ids: false,
            show_targets: true,
            show_logs: true,
            #[cfg(feature = "console")]
            enable_console: false,
        }
    }
}

impl LogConfig {
    /// Development configuration (verbose, human-readable)
    pub fn dev() -> Self {
        Self {
            default_level: tracing::Level::DEBUG,
            show_thread_ids: true,
            ..Default::default()
        }
    }

    /// Warnings and errors only
    pub fn quiet() -> Self {
        Self {
            default_level: tracing::Level::WARN,
            show_targets: false,
            ..Default::default()
        }
    }

    pub fn with_level(mut self, level: tracing::Level) -> Self {
        self.default_level = level;
        self
    }

    /// Enable tokio console
    #[cfg(feature = "console")]
    pub fn with_console(mut self) -> Self {
        self.enable_console = true;
        self
    }

    pub fn without_logs(mut self) -> Self {
        self.show_logs = false;
        self
    }

    /// Filter used when `RUST_LOG` is not set
    pub fn default_directives(&self) -> String {
        format!(
            "{}={level},peerlink_p2p={level}",
            env!("CARGO_PKG_NAME").replace('-', "_"),
            level = self.default_level
        )
    }

    pub fn init(self) -> Result<()> {
        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.default_directives()));

        #[cfg(feature = "console")]
        if self.enable_console {
            use console_subscriber::ConsoleLayer;

            if self.show_logs {
                eprintln!("🔍 Tokio Console enabled - connect with `tokio-console`");
            }

            let console_layer = ConsoleLayer::builder()
                .server_addr(([127, 0, 0, 1], 6669))
                .spawn();

            return tracing_subscriber::registry()
                .with(env_filter)
                .with(console_layer)
                .try_init()
                .map_err(|e| CliError::Logging(e.to_string()));
        }

        if self.show_logs {
            let fmt_layer = fmt::layer()
                .with_target(self.show_targets)
                .with_thread_ids(self.show_thread_ids);

            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt_layer)
                .try_init()
                .map_err(|e| CliError::Logging(e.to_string()))
        } else {
            tracing_subscriber::registry()
                .with(env_filter)
                .try_init()
                .map_err(|e| CliError::Logging(e.to_string()))
        }
    }
}
