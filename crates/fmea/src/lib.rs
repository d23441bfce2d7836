//! `fmea` - Failure Mode and Effects Analysis record keeping
//!
//! This library validates failure mode entries, computes their Risk Priority
//! Number (severity x occurrence x detection), stores them in `SQLite` and
//! summarizes them for the dashboard and reports pages.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod record;
pub mod stats;
pub mod storage;
pub mod validate;
pub mod web;

pub use config::Config;
pub use error::{Error, Result};
pub use logging::init_logging;
pub use record::{FailureModeRecord, NewFailureMode, Rating, Rpn};
pub use stats::{risk_histogram, summarize, top_n, Overview, RiskHistogram, RiskTier, Summary};
pub use storage::{Database, RecordStore, Storage, StorageStats};
pub use validate::{validate, FormInput, ValidationError};
