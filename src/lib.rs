//! Shared utilities for application services: environment-backed
//! configuration, a deduplicating Redis work queue, SQL filter generation,
//! Slack notifications, and a common API error taxonomy.

pub mod config;
pub mod constants;
pub mod error;
pub mod interceptors;
pub mod query;
pub mod queue;
pub mod runner;
pub mod services;

pub use error::{Error, Result};
pub use interceptors::HttpError;
pub use query::{generate_ordering, generate_where, Filter};
pub use queue::{Payload, RedisQueue};
pub use runner::Runner;
pub use services::SlackService;
