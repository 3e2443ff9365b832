use std::sync::Once;

use log::LevelFilter;

/// Crates that log per-frame detail at `info`; kept at `warn` by default.
const GPU_MODULES: [&str; 4] = ["wgpu_core", "wgpu_hal", "wgpu", "naga"];

/// Logger setup for binaries and tests.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// `env_logger` filter directives, e.g. `"easel_engine=debug,warn"`.
    /// Falls back to `RUST_LOG`, then to `info`.
    pub env_filter: Option<String>,
    pub write_style: env_logger::WriteStyle,
    /// Caps the GPU stack at `warn` unless the filter names those crates.
    pub quiet_gpu: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            env_filter: None,
            write_style: env_logger::WriteStyle::Auto,
            quiet_gpu: true,
        }
    }
}

impl LoggingConfig {
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    fn directives(&self) -> Option<String> {
        self.env_filter
            .clone()
            .or_else(|| std::env::var("RUST_LOG").ok())
    }

    fn builder(&self) -> env_logger::Builder {
        let mut builder = env_logger::Builder::new();

        if self.quiet_gpu {
            for module in GPU_MODULES {
                builder.filter_module(module, LevelFilter::Warn);
            }
        }

        // Parsed after the GPU caps so explicit directives win.
        match self.directives() {
            Some(d) => {
                builder.parse_filters(&d);
            }
            None => {
                builder.filter_level(LevelFilter::Info);
            }
        }

        builder.write_style(self.write_style);
        builder
    }
}

static INIT: Once = Once::new();

/// Installs the global logger. Only the first call has any effect.
///
/// A logger installed by someone else (e.g. a test harness) is left in place.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        if config.builder().try_init().is_ok() {
            log::debug!("logging: initialized");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_filter_wins_over_environment() {
        let cfg = LoggingConfig::default().with_filter("easel_engine=trace");
        assert_eq!(cfg.directives().as_deref(), Some("easel_engine=trace"));
    }

    #[test]
    fn init_is_idempotent() {
        init_logging(LoggingConfig::default());
        init_logging(LoggingConfig::default().with_filter("off"));
        log::info!("still alive");
    }
}
