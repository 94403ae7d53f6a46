//! Storage abstractions for the service layer
//!
//! One JSON document per named collection, replaced atomically on save and
//! guarded by an in-process lock per collection name.

pub mod metrics;
pub mod record_store;

pub use record_store::{Outcome, RecordStore};
