//! Accounts domain layer: entities and registration payloads

pub mod entities;
pub mod registration;
