//! Google Sheets destination module.
//!
//! This module provides:
//! - `SheetsClient`: clear-then-write replacement of the dashboard tab body
//! - `TokenSource`: service-account token minting with cached reuse
//!
//! Writes go through the values API with user-entered input semantics so
//! dates land as dates, not strings.

pub mod auth;
pub mod writer;

pub use writer::SheetsClient;
