//! Utilities
//!
//! Cross-cutting helpers: file descriptor census and deadline-blind sleep.

pub mod fd_census;
pub mod sleep;
