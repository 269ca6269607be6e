//! RemindMe library
//!
//! Reminder status lifecycle, notification scheduling and the periodic
//! reconciliation loop, plus the store and front end around them.

pub mod app;
pub mod clock;
pub mod commands;
pub mod config;
pub mod database;
pub mod error;
pub mod lifecycle;
pub mod notifications;
pub mod services;
