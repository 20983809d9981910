//! Core rate model, services and view state

pub mod auth;
pub mod cache;
pub mod calculator;
pub mod config;
pub mod convert;
pub mod draft;
pub mod editor;
pub mod log;
pub mod rate;
pub mod sync;

// Re-export main types for cleaner imports
pub use rate::{DEFAULT_PERIOD, ExchangeRate, Period, RateStore};
pub use sync::{RateSyncService, SyncError};
