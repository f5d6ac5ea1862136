#![forbid(unsafe_code)]

//! In-app message triggering, scheduling, delivery validation, and
//! single-message presentation.

pub mod app;
pub mod config;
pub mod deliver;
pub mod errors;
pub mod evaluation;
pub mod manager;
pub mod models;
pub mod platform;
pub mod presenter;
pub mod replay;
pub mod schedule;
pub mod storage;
pub mod trigger;

pub use config::GlobalConfig;
pub use errors::{AppError, Result};
