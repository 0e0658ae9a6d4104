use std::sync::Once;

/// Logger configuration.
///
/// `env_filter` follows the `env_logger` filter syntax (e.g. "info", "warn",
/// "mapdraw_engine=debug,wgpu=warn"). Without one, `RUST_LOG` is used, then `default_level`.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub env_filter: Option<String>,
    pub default_level: log::LevelFilter,
    /// Caps wgpu and naga at `warn` unless the filter names them.
    pub quiet_gpu: bool,
    pub write_style: env_logger::WriteStyle,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            env_filter: None,
            default_level: log::LevelFilter::Info,
            quiet_gpu: true,
            write_style: env_logger::WriteStyle::Auto,
        }
    }
}

const GPU_TARGETS: [&str; 4] = ["wgpu_core", "wgpu_hal", "wgpu", "naga"];

/// Filter directives for `config`, given the value of `RUST_LOG`.
fn filter_spec(config: &LoggingConfig, rust_log: Option<String>) -> String {
    let mut spec = config
        .env_filter
        .clone()
        .or(rust_log)
        .unwrap_or_else(|| config.default_level.to_string().to_lowercase());

    if config.quiet_gpu {
        for target in GPU_TARGETS {
            if !spec.split(',').any(|d| d.split('=').next().map(str::trim) == Some(target)) {
                spec.push_str(&format!(",{target}=warn"));
            }
        }
    }
    spec
}

static INIT: Once = Once::new();

/// Initializes the global logger once.
///
/// This function is idempotent; subsequent calls are ignored.
/// Intended usage is early in `main`.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let spec = filter_spec(&config, std::env::var("RUST_LOG").ok());

        let mut builder = env_logger::Builder::new();
        builder.parse_filters(&spec);
        builder.write_style(config.write_style);
        builder.init();

        log::debug!("logging initialized ({spec})");
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_filter_wins_over_rust_log() {
        let config = LoggingConfig { env_filter: Some("debug".into()), quiet_gpu: false, ..Default::default() };
        assert_eq!(filter_spec(&config, Some("trace".into())), "debug");
    }

    #[test]
    fn default_level_applies_without_filters() {
        let config = LoggingConfig { quiet_gpu: false, ..Default::default() };
        assert_eq!(filter_spec(&config, None), "info");
        assert_eq!(filter_spec(&config, Some("warn".into())), "warn");
    }

    #[test]
    fn gpu_targets_are_capped_unless_named() {
        let config = LoggingConfig { env_filter: Some("debug,wgpu_hal=info".into()), ..Default::default() };
        assert_eq!(filter_spec(&config, None), "debug,wgpu_hal=info,wgpu_core=warn,wgpu=warn,naga=warn");
    }
}
