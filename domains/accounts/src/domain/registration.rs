//! Registration payloads and the per-entity sync report

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crmsync_hubspot::{DealInput, TicketInput, UpsertAction};

/// Inbound registration: the user plus the deals and tickets to sync
#[derive(Clone, Serialize, Deserialize)]
pub struct RegistrationRequest {
    pub email: String,
    pub password: String,
    pub firstname: String,
    pub lastname: String,
    pub phone: String,
    #[serde(default)]
    pub deals: Vec<DealRegistration>,
}

impl std::fmt::Debug for RegistrationRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistrationRequest")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .field("firstname", &self.firstname)
            .field("lastname", &self.lastname)
            .field("phone", &self.phone)
            .field("deals", &self.deals)
            .finish()
    }
}

/// A deal and the tickets to open under it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DealRegistration {
    #[serde(flatten)]
    pub deal: DealInput,
    #[serde(default)]
    pub tickets: Vec<TicketInput>,
}

/// Outcome of syncing one entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SyncStatus {
    Created { id: String },
    Updated { id: String },
    Failed { error: String },
}

impl SyncStatus {
    pub fn id(&self) -> Option<&str> {
        match self {
            SyncStatus::Created { id } | SyncStatus::Updated { id } => Some(id),
            SyncStatus::Failed { .. } => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, SyncStatus::Failed { .. })
    }

    pub fn from_upsert(action: UpsertAction, id: String) -> Self {
        match action {
            UpsertAction::Created => SyncStatus::Created { id },
            UpsertAction::Updated => SyncStatus::Updated { id },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketOutcome {
    pub subject: String,
    #[serde(flatten)]
    pub status: SyncStatus,
}

/// A deal's outcome. Tickets of a failed deal are not attempted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DealOutcome {
    pub dealname: String,
    #[serde(flatten)]
    pub status: SyncStatus,
    pub tickets: Vec<TicketOutcome>,
}

/// What the registration sync did, entity by entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationReport {
    pub contact_id: String,
    pub contact_action: UpsertAction,
    pub deals: Vec<DealOutcome>,
}

impl RegistrationReport {
    /// True when every deal and ticket synced
    pub fn is_complete(&self) -> bool {
        self.failure_count() == 0
    }

    /// Failed deals plus failed tickets
    pub fn failure_count(&self) -> usize {
        self.deals
            .iter()
            .map(|deal| {
                usize::from(deal.status.is_failed())
                    + deal.tickets.iter().filter(|t| t.status.is_failed()).count()
            })
            .sum()
    }
}

/// A completed registration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    /// Local user id
    pub id: Uuid,
    pub contact_id: String,
    pub report: RegistrationReport,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crmsync_hubspot::{DealStage, TicketCategory};
    use serde_json::json;

    #[test]
    fn test_request_parses_nested_deals_and_tickets() {
        let request: RegistrationRequest = serde_json::from_value(json!({
            "email": "a@b.com",
            "password": "hunter22",
            "firstname": "Ada",
            "lastname": "Lovelace",
            "phone": "555",
            "deals": [{
                "dealname": "D1",
                "amount": 100,
                "dealstage": "appointmentscheduled",
                "pipeline": "default",
                "tickets": [{
                    "subject": "S1",
                    "description": "x",
                    "category": "BILLING_ISSUE",
                    "pipeline": "0",
                    "hs_ticket_priority": "HIGH",
                    "hs_pipeline_stage": "1"
                }]
            }]
        }))
        .unwrap();

        let deal = &request.deals[0];
        assert_eq!(deal.deal.dealname, "D1");
        assert_eq!(deal.deal.amount, 100.0);
        assert_eq!(deal.deal.dealstage, DealStage::AppointmentScheduled);
        assert_eq!(deal.deal.extra.get_text("pipeline").as_deref(), Some("default"));
        assert!(!deal.deal.extra.contains_key("tickets"));
        assert_eq!(deal.tickets[0].category, TicketCategory::BillingIssue);
    }

    #[test]
    fn test_request_without_deals() {
        let request: RegistrationRequest = serde_json::from_value(json!({
            "email": "a@b.com",
            "password": "hunter22",
            "firstname": "Ada",
            "lastname": "Lovelace",
            "phone": "555"
        }))
        .unwrap();
        assert!(request.deals.is_empty());
    }

    #[test]
    fn test_request_rejects_unknown_ticket_category() {
        let result: Result<RegistrationRequest, _> = serde_json::from_value(json!({
            "email": "a@b.com",
            "password": "hunter22",
            "firstname": "Ada",
            "lastname": "Lovelace",
            "phone": "555",
            "deals": [{
                "dealname": "D1",
                "amount": 1,
                "dealstage": "closedwon",
                "tickets": [{
                    "subject": "S1",
                    "description": "x",
                    "category": "COMPLAINT",
                    "pipeline": "0",
                    "hs_ticket_priority": "HIGH",
                    "hs_pipeline_stage": "1"
                }]
            }]
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_request_debug_redacts_password() {
        let request = RegistrationRequest {
            email: "a@b.com".to_string(),
            password: "hunter22".to_string(),
            firstname: "Ada".to_string(),
            lastname: "Lovelace".to_string(),
            phone: "555".to_string(),
            deals: vec![],
        };
        assert!(!format!("{:?}", request).contains("hunter22"));
    }

    #[test]
    fn test_report_serializes_status_inline() {
        let report = RegistrationReport {
            contact_id: "501".to_string(),
            contact_action: UpsertAction::Created,
            deals: vec![DealOutcome {
                dealname: "D1".to_string(),
                status: SyncStatus::Failed {
                    error: "CRM request error: timed out".to_string(),
                },
                tickets: vec![],
            }],
        };

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["contact_action"], "created");
        assert_eq!(json["deals"][0]["status"], "failed");
        assert_eq!(json["deals"][0]["error"], "CRM request error: timed out");
        assert_eq!(report.failure_count(), 1);
        assert!(!report.is_complete());
    }
}
