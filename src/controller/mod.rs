//! # Controller
//!
//! Core controller modules for the Bitwarden Secrets Operator.
//!
//! - `reconciler`: Sync engine for `BitwardenSecret` resources
//! - `server`: HTTP server for metrics and health checks

pub mod reconciler;
pub mod server;
