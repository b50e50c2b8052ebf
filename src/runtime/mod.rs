//! # Runtime
//!
//! Process-level wiring of the controller.
//!
//! - `initialization`: tracing, metrics, HTTP server, clients and reconciler
//! - `watch_loop`: controller stream with restart on stream end
//! - `error_policy`: handling of reconciliation and watch stream errors

pub mod error_policy;
pub mod initialization;
pub mod watch_loop;
