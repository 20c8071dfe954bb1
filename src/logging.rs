// Logging setup
//
// Everything goes to stderr through env_logger. Validation layer output is let
// through at every level unless a filter says otherwise.

use env_logger::Builder;
use log::LevelFilter;

use crate::backend::debug::VALIDATION_TARGET;

/// Filters apply in order: `info` for everything and `trace` for validation
/// messages, then the config file's `log_level`, then `RUST_LOG`.
pub fn logger_builder(config_level: Option<&str>, rust_log: Option<&str>) -> Builder {
    let mut builder = Builder::new();
    builder.filter_level(LevelFilter::Info);
    builder.filter_module(VALIDATION_TARGET, LevelFilter::Trace);

    if let Some(level) = config_level {
        builder.parse_filters(level);
    }
    if let Some(filter) = rust_log {
        builder.parse_filters(filter);
    }

    builder
}

pub fn init_logging(config_level: Option<&str>) {
    let rust_log = std::env::var("RUST_LOG").ok();
    logger_builder(config_level, rust_log.as_deref()).init();
}
