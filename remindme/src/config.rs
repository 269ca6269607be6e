//! Application configuration constants
//!
//! Central location for all configuration constants, resource limits,
//! and validation boundaries used throughout the application.

// ===== Storage =====

/// Directory name created under the platform data directory
pub const DATA_DIR_NAME: &str = "remindme";

/// SQLite database file name inside the data directory
pub const DATABASE_FILE_NAME: &str = "remindme.db";

/// Settings file name inside the data directory
pub const SETTINGS_FILE_NAME: &str = "settings.json";

// ===== Logging =====

/// Log filter used when `RUST_LOG` is unset
pub const DEFAULT_LOG_FILTER: &str = "remindme=info";

// ===== Reconciliation =====

/// Default cadence of the reconciliation loop in seconds
pub const RECONCILE_INTERVAL_SECS: u64 = 60;

/// Minimum reconciliation cadence in seconds.
/// Faster ticks only add database load; status granularity is one minute.
pub const MIN_RECONCILE_INTERVAL_SECS: u64 = 5;

/// Maximum reconciliation cadence in seconds (1 hour).
/// The loop is the only guaranteed status correction, so it must stay frequent.
pub const MAX_RECONCILE_INTERVAL_SECS: u64 = 3_600;

/// Capacity of the on-demand reconciliation request channel
pub const RECONCILE_REQUEST_CAPACITY: usize = 16;

/// Capacity of the alert event channel (delivered / activated)
pub const ALERT_EVENT_CAPACITY: usize = 64;

// ===== Reminder Limits =====

/// Maximum length for a reminder title in characters
pub const MAX_TITLE_LENGTH: usize = 200;

/// Maximum length for reminder notes in characters
pub const MAX_NOTES_LENGTH: usize = 4_000;

/// Due time offset used when the user gives none (1 hour from now)
pub const DEFAULT_DUE_OFFSET_SECS: i64 = 3_600;

// ===== Progress Bands =====

/// Progress below this value is in the early band
pub const PROGRESS_EARLY_LIMIT: f64 = 0.33;

/// Progress below this value (and above the early limit) is in the midway band
pub const PROGRESS_MIDWAY_LIMIT: f64 = 0.66;
