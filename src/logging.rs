// Logging for the worker pool.
//
// Built on the `tracing` ecosystem. The pool emits structured events for
// lifecycle transitions (spawn, dispatch, stop, respawn) under the crate's
// module targets; initialize a subscriber here, or install your own before
// constructing a pool. Worker threads inherit whatever dispatcher is
// current at pool construction, so worker-side events land in the same
// subscriber as the owner's.

use std::sync::Once;

use tracing::{Level, Subscriber};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Configuration for the logging setup.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Minimum log level to display.
    pub level: Level,
    /// Whether to use JSON format for logs.
    pub json_format: bool,
    /// Whether to include file and line information.
    pub show_file_line: bool,
    /// Whether to include thread name/id. Worker threads carry their pool
    /// index in the name, so this is the cheapest way to see who did what.
    pub show_thread_info: bool,
    /// Whether to include timestamps.
    pub show_time: bool,
    /// Target filter expressions (format: "target=level,target2=level2,...").
    pub target_filters: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            json_format: false,
            show_file_line: false,
            show_thread_info: true,
            show_time: true,
            target_filters: None,
        }
    }
}

// Initialization guard so only the first call takes effect.
static INIT: Once = Once::new();

/// Initialize the global subscriber with the given configuration.
///
/// Safe to call multiple times; only the first call takes effect.
pub fn init(config: LogConfig) {
    INIT.call_once(|| {
        let mut env_filter = EnvFilter::from_default_env().add_directive(config.level.into());
        if let Some(filters) = config.target_filters {
            for filter in filters.split(',') {
                if let Ok(directive) = filter.parse() {
                    env_filter = env_filter.add_directive(directive);
                }
            }
        }

        let fmt_layer = fmt::layer()
            .with_ansi(atty::is(atty::Stream::Stdout))
            .with_file(config.show_file_line)
            .with_line_number(config.show_file_line)
            .with_thread_names(config.show_thread_info)
            .with_thread_ids(config.show_thread_info);

        let registry = tracing_subscriber::registry().with(env_filter);
        let subscriber: Box<dyn Subscriber + Send + Sync> = if config.json_format {
            Box::new(registry.with(fmt::layer().json().flatten_event(true)))
        } else if config.show_time {
            Box::new(registry.with(fmt_layer))
        } else {
            Box::new(registry.with(fmt_layer.without_time()))
        };

        set_global_subscriber(subscriber);
    });
}

fn set_global_subscriber<S>(subscriber: S)
where
    S: Subscriber + Send + Sync + 'static,
{
    if let Err(err) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Error setting global tracing subscriber: {}", err);
    }
}

/// Initialize with defaults: INFO level, human-readable console output.
pub fn init_default() {
    init(LogConfig::default());
}

/// Initialize for development: DEBUG level overall, TRACE for the dispatch
/// and worker internals, file/line info included.
pub fn init_development() {
    init(LogConfig {
        level: Level::DEBUG,
        show_file_line: true,
        target_filters: Some("perch=trace".to_string()),
        ..LogConfig::default()
    });
}

/// Initialize for production: JSON output, no file/line info.
pub fn init_production() {
    init(LogConfig {
        level: Level::INFO,
        json_format: true,
        ..LogConfig::default()
    });
}

/// Initialize for tests: warnings and errors only, compact output.
pub fn init_test() {
    init(LogConfig {
        level: Level::WARN,
        show_thread_info: false,
        show_time: false,
        ..LogConfig::default()
    });
}

/// The current tracing dispatcher.
///
/// The pool captures this at construction and installs it in every worker
/// thread it spawns, so worker-side events use the owner's configuration.
#[inline]
pub fn current_subscriber() -> tracing::Dispatch {
    tracing::dispatcher::get_default(|d| d.clone())
}

// Re-export the most commonly used tracing macros for convenience.
pub use tracing::{debug, error, info, trace, warn};
