//! # Campus Common Library
//!
//! Shared code for the smart-campus occupancy services including:
//! - Event types (CampusEvent enum) and the EventBus
//! - Bootstrap configuration loading
//! - Database schema initialization
//! - Timestamp utilities
//! - Server-Sent Events helpers

pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod sse;
pub mod time;

pub use error::{Error, Result};
