//! Common test utilities and fixtures for integration tests
//!
//! Every test gets its own backend wired to a fresh in-memory CRM and user
//! store, plus builders for registration payloads.

use std::sync::Arc;

use anyhow::Result;
use crmsync_accounts::{DealRegistration, InMemoryUserStore, RegistrationRequest, UserStore};
use crmsync_app::Backend;
use crmsync_auth::AuthConfig;
use crmsync_hubspot::{
    DealInput, DealStage, MockCrm, PropertyMap, TicketCategory, TicketInput,
};

pub const TEST_JWT_SECRET: &str = "test_secret_key_for_testing_only";
pub const TEST_PASSWORD: &str = "correct-horse-battery";

/// Test application: the backend plus handles on its collaborators
#[allow(dead_code)]
pub struct TestApp {
    pub backend: Backend,
    pub crm: Arc<MockCrm>,
    pub users: Arc<InMemoryUserStore>,
}

impl TestApp {
    pub fn new() -> Result<Self> {
        Self::with_crm(MockCrm::new())
    }

    pub fn with_crm(crm: MockCrm) -> Result<Self> {
        let crm = Arc::new(crm);
        let users = Arc::new(InMemoryUserStore::for_tests()?);
        let backend = Backend::new(
            crm.sync_service(),
            users.clone() as Arc<dyn UserStore>,
            AuthConfig {
                jwt_secret: TEST_JWT_SECRET.to_string(),
                issuer: Some("crmsync-test".to_string()),
                audience: Some("authenticated".to_string()),
                access_token_ttl_secs: 3600,
            },
        );

        Ok(Self {
            backend,
            crm,
            users,
        })
    }
}

#[allow(dead_code)]
pub fn ticket(subject: &str) -> TicketInput {
    TicketInput {
        subject: subject.to_string(),
        description: "x".to_string(),
        category: TicketCategory::BillingIssue,
        pipeline: "p1".to_string(),
        hs_ticket_priority: "MEDIUM".to_string(),
        hs_pipeline_stage: "1".to_string(),
        extra: PropertyMap::new(),
    }
}

#[allow(dead_code)]
pub fn deal(name: &str, tickets: Vec<TicketInput>) -> DealRegistration {
    DealRegistration {
        deal: DealInput::new(name, 1200.0, DealStage::PresentationScheduled),
        tickets,
    }
}

#[allow(dead_code)]
pub fn registration(email: &str, deals: Vec<DealRegistration>) -> RegistrationRequest {
    RegistrationRequest {
        email: email.to_string(),
        password: TEST_PASSWORD.to_string(),
        firstname: "Ada".to_string(),
        lastname: "Lovelace".to_string(),
        phone: "+1 555 0100".to_string(),
        deals,
    }
}
