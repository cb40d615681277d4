//! Data models for the sales feed.
//!
//! This module contains the structures the run flows through:
//!
//! - `Contact`, `CustomField`, `ContactsPage`: the CRM's contact listing
//!   as it comes off the wire
//! - `SalesRow`: one flattened dashboard row in sheet column order
//! - `TeamMembers`: deduplicated rosters derived from a run's rows

pub mod contact;
pub mod row;

pub use contact::{Contact, ContactsPage, CustomField};
pub use row::{SalesRow, TeamMembers};
