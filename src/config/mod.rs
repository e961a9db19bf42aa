//! Configuration
//!
//! Shared types, the error taxonomy, and fixture path configuration.

pub mod config;
pub mod types;
