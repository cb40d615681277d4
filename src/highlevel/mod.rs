//! REST API client module for HighLevel (LeadConnector) CRM services.
//!
//! This module provides:
//! - `ApiClient`: paged contact fetching with tag and recency filtering
//! - `PageGuard`: cursor bookkeeping that survives misbehaving pagination
//! - `ApiError`: typed HTTP failures with truncated response bodies
//!
//! The API uses static bearer keys (one per location or one shared) plus a
//! required `Version` header.

pub mod client;
pub mod error;
pub mod pages;

pub use client::ApiClient;
pub use error::ApiError;
pub use pages::{PageGuard, PageStep, StopReason};
