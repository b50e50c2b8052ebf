//! # Constants
//!
//! Shared constants used throughout the controller.
//!
//! These values represent reasonable defaults and can be overridden via
//! configuration or environment variables where applicable.

/// Default HTTP server port for metrics and health checks
pub const DEFAULT_METRICS_PORT: u16 = 8080;

/// Default HTTP server startup timeout (how long to wait for server to be ready)
pub const DEFAULT_SERVER_STARTUP_TIMEOUT_SECS: u64 = 10;

/// Default HTTP server readiness poll interval
pub const DEFAULT_SERVER_POLL_INTERVAL_MS: u64 = 50;

/// Default Bitwarden Secrets Manager API base URL
pub const DEFAULT_BW_API_URL: &str = "https://api.bitwarden.com";

/// Default Bitwarden identity service base URL
pub const DEFAULT_BW_IDENTITY_API_URL: &str = "https://identity.bitwarden.com";

/// Default directory for cached Bitwarden client state
pub const DEFAULT_BW_STATE_PATH: &str = "/var/bitwarden/state";

/// Default refresh interval (seconds)
/// Every reconciliation, successful or not, requeues after this delay
pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 300;

/// Minimum refresh interval (seconds)
/// Shorter intervals are clamped to avoid hammering the Secrets Manager API
pub const MIN_REFRESH_INTERVAL_SECS: u64 = 180;

/// Default delay before restarting watch stream after errors or stream end (seconds)
pub const DEFAULT_WATCH_RESTART_DELAY_SECS: u64 = 5;

/// Window after the last successful sync in which a reconcile is treated as an
/// echo of the controller's own status write
pub const SYNC_GUARD_WINDOW_MILLIS: i64 = 1000;

/// How far before the watermark each delta query starts
/// Covers edits that landed while the previous pull was in flight
pub const SYNC_LOOKBACK_MILLIS: i64 = 5000;

/// Default namespace when a resource carries none
pub const DEFAULT_NAMESPACE: &str = "default";

/// Field manager used for server-side status patches
pub const FIELD_MANAGER: &str = "bitwarden-secrets-operator";

/// Label on the target Secret carrying the owning BitwardenSecret UID
pub const LABEL_BW_SECRET: &str = "k8s.bitwarden.com/bw-secret";

/// Annotation holding the last sync time of the target Secret
pub const ANNOTATION_SYNC_TIME: &str = "k8s.bitwarden.com/sync-time";

/// Annotation holding the active key-map of the target Secret
pub const ANNOTATION_CUSTOM_MAP: &str = "k8s.bitwarden.com/custom-map";

/// Annotation stamped by `bwsctl sync` to request an immediate reconcile
pub const ANNOTATION_SYNC_REQUESTED_AT: &str = "k8s.bitwarden.com/sync-requested-at";

/// Condition type recorded when a sync attempt fails
pub const CONDITION_FAILED_SYNC: &str = "FailedSync";

/// Condition type recorded when a sync attempt completes
pub const CONDITION_SUCCESSFUL_SYNC: &str = "SuccessfulSync";

/// Reason attached to `FailedSync`
pub const REASON_RECONCILIATION_FAILED: &str = "ReconciliationFailed";

/// Reason attached to `SuccessfulSync`
pub const REASON_RECONCILIATION_COMPLETE: &str = "ReconciliationComplete";

/// Connect timeout for Bitwarden API requests (seconds)
pub const DEFAULT_HTTP_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Overall timeout for Bitwarden API requests (seconds)
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 60;
