//! Configuration Module
//!
//! Client configuration loaded from environment variables.

mod settings;

pub use settings::{ConfigError, DashboardConfig, DashboardSettings, HttpSettings, RetrySettings};
