//! Domain layer types and invariants.

pub mod error;
pub mod notification;
pub mod types;
