//! Domain-facing CRM types: object kinds, association codes, inputs and projections

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::properties::PropertyMap;

/// Association type: deal → contact
pub const DEAL_TO_CONTACT: u32 = 3;
/// Association type: ticket → contact
pub const TICKET_TO_CONTACT: u32 = 16;
/// Association type: ticket → deal
pub const TICKET_TO_DEAL: u32 = 28;

/// Association category used for all built-in association types
pub const HUBSPOT_DEFINED: &str = "HUBSPOT_DEFINED";

/// CRM object kinds this service talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    Contacts,
    Deals,
    Tickets,
}

impl ObjectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectKind::Contacts => "contacts",
            ObjectKind::Deals => "deals",
            ObjectKind::Tickets => "tickets",
        }
    }

    /// Properties requested when reading objects of this kind back
    pub fn read_properties(&self) -> &'static [&'static str] {
        match self {
            ObjectKind::Contacts => &["email", "firstname", "lastname", "phone"],
            ObjectKind::Deals => &["dealname", "amount", "dealstage", "pipeline"],
            ObjectKind::Tickets => &[
                "subject",
                "content",
                "hs_ticket_category",
                "hs_pipeline",
                "hs_pipeline_stage",
                "hs_ticket_priority",
            ],
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed association edge sent with a create request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssociationSpec {
    pub to_id: String,
    pub type_id: u32,
}

impl AssociationSpec {
    pub fn new(to_id: impl Into<String>, type_id: u32) -> Self {
        Self {
            to_id: to_id.into(),
            type_id,
        }
    }
}

/// Deal pipeline stages accepted at registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DealStage {
    AppointmentScheduled,
    QualifiedToBuy,
    PresentationScheduled,
    DecisionMakerBoughtIn,
    ContractSent,
    ClosedWon,
    ClosedLost,
}

impl DealStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            DealStage::AppointmentScheduled => "appointmentscheduled",
            DealStage::QualifiedToBuy => "qualifiedtobuy",
            DealStage::PresentationScheduled => "presentationscheduled",
            DealStage::DecisionMakerBoughtIn => "decisionmakerboughtin",
            DealStage::ContractSent => "contractsent",
            DealStage::ClosedWon => "closedwon",
            DealStage::ClosedLost => "closedlost",
        }
    }
}

/// Ticket categories accepted at registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketCategory {
    GeneralInquiry,
    BillingIssue,
    FeatureRequest,
    ProductIssue,
}

impl TicketCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketCategory::GeneralInquiry => "GENERAL_INQUIRY",
            TicketCategory::BillingIssue => "BILLING_ISSUE",
            TicketCategory::FeatureRequest => "FEATURE_REQUEST",
            TicketCategory::ProductIssue => "PRODUCT_ISSUE",
        }
    }
}

/// Contact fields sent to the CRM
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactInput {
    pub email: String,
    pub firstname: String,
    pub lastname: String,
    pub phone: String,
    #[serde(flatten)]
    pub extra: PropertyMap,
}

impl ContactInput {
    pub fn new(
        email: impl Into<String>,
        firstname: impl Into<String>,
        lastname: impl Into<String>,
        phone: impl Into<String>,
    ) -> Self {
        Self {
            email: email.into(),
            firstname: firstname.into(),
            lastname: lastname.into(),
            phone: phone.into(),
            extra: PropertyMap::new(),
        }
    }

    /// Natural key: trimmed, lower-cased email
    pub fn normalized_email(&self) -> String {
        normalize_email(&self.email)
    }

    pub fn into_properties(self) -> PropertyMap {
        let mut properties = PropertyMap::new()
            .with("email", normalize_email(&self.email))
            .with("firstname", self.firstname)
            .with("lastname", self.lastname)
            .with("phone", self.phone);
        properties.merge_missing(self.extra);
        properties
    }
}

/// Deal fields sent to the CRM
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DealInput {
    pub dealname: String,
    pub amount: f64,
    pub dealstage: DealStage,
    #[serde(flatten)]
    pub extra: PropertyMap,
}

impl DealInput {
    pub fn new(dealname: impl Into<String>, amount: f64, dealstage: DealStage) -> Self {
        Self {
            dealname: dealname.into(),
            amount,
            dealstage,
            extra: PropertyMap::new(),
        }
    }

    pub fn into_properties(self) -> PropertyMap {
        let mut properties = PropertyMap::new()
            .with("dealname", self.dealname)
            .with("amount", self.amount)
            .with("dealstage", self.dealstage.as_str());
        properties.merge_missing(self.extra);
        properties
    }
}

/// Ticket fields, named locally (see [`crate::properties::TICKET_PROPERTY_RENAMES`])
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketInput {
    pub subject: String,
    pub description: String,
    pub category: TicketCategory,
    pub pipeline: String,
    pub hs_ticket_priority: String,
    pub hs_pipeline_stage: String,
    #[serde(flatten)]
    pub extra: PropertyMap,
}

impl TicketInput {
    /// Properties under their local names
    pub fn into_properties(self) -> PropertyMap {
        let mut properties = PropertyMap::new()
            .with("subject", self.subject)
            .with("description", self.description)
            .with("category", self.category.as_str())
            .with("pipeline", self.pipeline)
            .with("hs_ticket_priority", self.hs_ticket_priority)
            .with("hs_pipeline_stage", self.hs_pipeline_stage);
        properties.merge_missing(self.extra);
        properties
    }
}

/// Whether an upsert created a new object or updated an existing one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpsertAction {
    Created,
    Updated,
}

/// Result of a create-or-update call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Upserted {
    pub id: String,
    pub action: UpsertAction,
}

/// Ticket as returned by the listing path, with local property names
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketRecord {
    pub id: String,
    #[serde(flatten)]
    pub properties: PropertyMap,
}

/// Deal with its associated tickets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DealRecord {
    pub id: String,
    #[serde(flatten)]
    pub properties: PropertyMap,
    pub tickets: Vec<TicketRecord>,
}

/// Contact with its associated deals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactRecord {
    pub id: String,
    #[serde(flatten)]
    pub properties: PropertyMap,
    pub deals: Vec<DealRecord>,
}

/// One page of expanded contacts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactPage {
    pub contacts: Vec<ContactRecord>,
    pub next_cursor: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineStage {
    pub id: String,
    pub label: String,
    pub display_order: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pipeline {
    pub id: String,
    pub label: String,
    pub display_order: i32,
    pub stages: Vec<PipelineStage>,
}

/// Trim and lower-case an email address for use as a lookup key.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
