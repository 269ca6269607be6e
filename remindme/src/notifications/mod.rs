//! Local notifications
//!
//! - `platform`: the alert-platform seam (`AlertPlatform`) and its events
//! - `local`: in-process alerts backed by tokio-cron-scheduler one-shot jobs
//! - `memory`: recording platform for headless runs and tests
//! - `scheduler`: the scheduling policy on top of a platform

pub mod local;
pub mod memory;
pub mod platform;
pub mod scheduler;

pub use local::LocalAlertPlatform;
pub use memory::MemoryAlertPlatform;
pub use platform::{Alert, AlertEvent, AlertId, AlertPlatform};
pub use scheduler::{AlertSyncReport, NotificationScheduler, ScheduleOutcome, SkipReason};
