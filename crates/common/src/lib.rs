//! Shared configuration and error handling for CRM Sync
//!
//! This crate provides common functionality used across the workspace:
//! - Configuration management following 12-factor principles
//! - The workspace error type and its client-facing body

pub mod config;
pub mod error;

pub use config::Config;
pub use error::{Error, ErrorBody, Result};
