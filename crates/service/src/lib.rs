//! Service layer for the app catalog.
//! - `storage`: crash-consistent JSON collections with per-collection locking.
//! - `catalog`: app and user operations expressed as store transactions.
//! - Errors are surfaced as `ServiceError` for the HTTP layer to translate.

pub mod errors;
pub mod runtime;
pub mod storage;
pub mod catalog;
#[cfg(test)]
pub mod test_support;
