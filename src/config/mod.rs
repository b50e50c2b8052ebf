//! # Configuration
//!
//! Controller configuration loaded once at startup from environment variables.

mod controller;

pub use controller::ControllerConfig;
