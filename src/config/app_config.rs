use super::env::EnvReader;
use crate::error::Result;

/// Base application configuration.
///
/// Services embed or extend this with their own fields; everything here is
/// populated from environment variables with sensible defaults, so a bare
/// process comes up logging at INFO with no error reporting wired.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub logging_level: String,
    pub sentry_dsn: Option<String>,
    pub env: Option<String>,
    pub log_file: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let reader = EnvReader::from_env()?;

        Ok(Self {
            logging_level: reader.get("LOGGING_LEVEL:INFO")?,
            sentry_dsn: reader.get_opt("SENTRY_DSN:__NONE__")?,
            env: reader.get_opt("ENV:__NONE__")?,
            log_file: reader.get_opt("LOG_FILE:__NONE__")?,
        })
    }

    pub fn is_production(&self) -> bool {
        self.env.as_deref() == Some("production")
    }
}
