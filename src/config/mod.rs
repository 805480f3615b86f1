pub mod app_config;
pub mod env;
pub mod logging;
pub mod redis_config;

pub use app_config::AppConfig;
pub use env::EnvReader;
pub use logging::setup_logging;
pub use redis_config::RedisConfig;
