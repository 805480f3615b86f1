use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use super::AppConfig;

/// Setup logging with console output, plus a JSON file when configured.
///
/// The filter seeds from `RUST_LOG` when present, falling back to the
/// configured logging level.
pub fn setup_logging(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging_level.to_lowercase()));

    let console_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .compact();

    let file_layer = config.log_file.as_deref().map(|log_file| {
        let path = std::path::Path::new(log_file);
        let dir = path.parent().unwrap_or_else(|| std::path::Path::new("logs"));
        std::fs::create_dir_all(dir).ok();

        let file_appender = RollingFileAppender::new(
            Rotation::DAILY,
            dir,
            path.file_name().unwrap_or_else(|| std::ffi::OsStr::new("app.log")),
        );

        fmt::layer()
            .with_writer(file_appender)
            .with_target(true)
            .with_ansi(false)
            .json()
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    tracing::info!("Logging initialized with level: {}", config.logging_level);
}
