use std::sync::Once;
use std::sync::atomic::{AtomicBool, Ordering};

/// Logger configuration.
///
/// `env_filter` follows the `env_logger` filter syntax (e.g. "info", "warn",
/// "brickie=debug").
///
/// `write_style` controls ANSI coloring behavior.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub env_filter: Option<String>,
    pub write_style: env_logger::WriteStyle,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            env_filter: None,
            write_style: env_logger::WriteStyle::Auto,
        }
    }
}

static INIT: Once = Once::new();
static DEBUG: AtomicBool = AtomicBool::new(false);

/// Initializes the global logger once.
///
/// This function is idempotent; subsequent calls are ignored.
/// Intended usage is early in `main`.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let mut builder = env_logger::Builder::new();

        if let Some(filter) = config.env_filter {
            builder.parse_filters(&filter);
        } else if let Ok(filter) = std::env::var("RUST_LOG") {
            builder.parse_filters(&filter);
        } else {
            builder.filter_level(log::LevelFilter::Info);
        }

        builder.write_style(config.write_style);
        // A host may already have installed its own logger.
        if builder.try_init().is_err() {
            log::debug!("logger already installed, keeping it");
        }

        log::debug!("logging initialized");
    });
}

/// Turn per-node render tracing on or off.
///
/// Tracing is emitted at `debug` level, so the logger filter must also let it
/// through.
pub fn set_debug(enabled: bool) {
    DEBUG.store(enabled, Ordering::Relaxed);
}

pub fn debug_enabled() -> bool {
    DEBUG.load(Ordering::Relaxed)
}

/// `log::debug!`, but only while [`set_debug`] is on.
macro_rules! trace_render {
    ($($arg:tt)*) => {
        if $crate::logging::debug_enabled() {
            log::debug!($($arg)*);
        }
    };
}

pub(crate) use trace_render;
