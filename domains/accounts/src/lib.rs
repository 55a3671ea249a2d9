//! Accounts domain: registration with CRM sync, login, local user store

pub mod domain;
pub mod error;
pub mod orchestrator;
pub mod repository;
pub mod service;

// Re-export domain types at the crate root for convenience
pub use domain::entities::*;
pub use domain::registration::*;
pub use error::AccountError;
pub use orchestrator::RegistrationOrchestrator;
pub use repository::{InMemoryUserStore, UserStore};
pub use service::AccountService;
