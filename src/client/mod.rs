//! Client module - process shell around the core
//!
//! Connection thread, configuration, logging and the app update loop.

pub mod app;
pub mod config;
pub mod connection;
pub mod logging;

pub use app::ScoreboardApp;
pub use config::{Config, ConfigError};
pub use connection::{FeedChannel, LiveConnection, Subscription};
