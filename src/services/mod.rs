//! Validation and orchestration between the HTTP handlers and the store.

pub mod appointments;
pub mod reviews;
pub mod stats;
