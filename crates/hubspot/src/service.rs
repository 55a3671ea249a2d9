//! CRM sync operations
//!
//! Natural-key resolution, create-or-update for contacts and deals, ticket
//! creation and the read paths. Every outbound call asks the token lease for
//! a credential first.

use std::str::FromStr;
use std::sync::Arc;

use crate::api::{CrmApi, CrmObject, PageRequest, SearchRequest};
use crate::lease::TokenLease;
use crate::model::{
    normalize_email, AssociationSpec, ContactInput, ContactPage, ContactRecord, DealInput,
    DealRecord, ObjectKind, Pipeline, TicketInput, TicketRecord, UpsertAction, Upserted,
    DEAL_TO_CONTACT, TICKET_TO_CONTACT, TICKET_TO_DEAL,
};
use crate::properties::{ticket_properties_from_remote, ticket_properties_to_remote};
use crate::CrmError;

/// Contacts per page when the caller does not ask for a size
pub const DEFAULT_PAGE_LIMIT: u32 = 10;
/// Largest page HubSpot serves
pub const MAX_PAGE_LIMIT: u32 = 100;

/// How an upsert treats a failed natural-key search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResolveFailurePolicy {
    /// Log the failure and carry on as if nothing matched.
    #[default]
    Lenient,
    /// Fail the upsert without creating anything.
    Strict,
}

impl FromStr for ResolveFailurePolicy {
    type Err = CrmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lenient" => Ok(ResolveFailurePolicy::Lenient),
            "strict" => Ok(ResolveFailurePolicy::Strict),
            other => Err(CrmError::Configuration(format!(
                "Unknown resolve policy: {}. Supported policies: lenient, strict",
                other
            ))),
        }
    }
}

fn owned(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| name.to_string()).collect()
}

/// CRM sync service shared across requests.
#[derive(Clone)]
pub struct CrmSync {
    api: Arc<dyn CrmApi>,
    lease: Arc<TokenLease>,
    resolve_policy: ResolveFailurePolicy,
}

impl CrmSync {
    pub fn new(api: Arc<dyn CrmApi>, lease: Arc<TokenLease>) -> Self {
        Self {
            api,
            lease,
            resolve_policy: ResolveFailurePolicy::default(),
        }
    }

    pub fn with_resolve_policy(mut self, policy: ResolveFailurePolicy) -> Self {
        self.resolve_policy = policy;
        self
    }

    pub fn lease(&self) -> &Arc<TokenLease> {
        &self.lease
    }

    async fn token(&self) -> Result<String, CrmError> {
        self.lease.access_token().await
    }

    async fn search_first(
        &self,
        kind: ObjectKind,
        property: &str,
        value: &str,
    ) -> Result<Option<String>, CrmError> {
        let token = self.token().await?;
        let results = self
            .api
            .search_objects(&token, kind, &SearchRequest::eq(property, value))
            .await?;
        Ok(results.into_iter().next().map(|object| object.id))
    }

    /// Search with the configured failure policy applied. Token failures always propagate.
    async fn resolve(
        &self,
        kind: ObjectKind,
        property: &str,
        value: &str,
    ) -> Result<Option<String>, CrmError> {
        match self.search_first(kind, property, value).await {
            Ok(found) => Ok(found),
            Err(e @ CrmError::TokenExchange(_)) => Err(e),
            Err(e) => match self.resolve_policy {
                ResolveFailurePolicy::Lenient => {
                    tracing::warn!(
                        kind = %kind,
                        property = %property,
                        error = %e,
                        "CRM search failed, treating as not found"
                    );
                    Ok(None)
                }
                ResolveFailurePolicy::Strict => Err(e),
            },
        }
    }

    /// Id of the contact with this email, if any.
    pub async fn find_contact_by_email(&self, email: &str) -> Result<Option<String>, CrmError> {
        self.search_first(ObjectKind::Contacts, "email", &normalize_email(email))
            .await
    }

    /// Id of the deal with this exact name, if any.
    pub async fn find_deal_by_name(&self, dealname: &str) -> Result<Option<String>, CrmError> {
        self.search_first(ObjectKind::Deals, "dealname", dealname)
            .await
    }

    /// Update the contact matching the input's email, or create it.
    pub async fn create_or_update_contact(
        &self,
        contact: ContactInput,
    ) -> Result<Upserted, CrmError> {
        let email = contact.normalized_email();
        if email.is_empty() {
            return Err(CrmError::InvalidInput("Email is required".to_string()));
        }

        let existing = self.resolve(ObjectKind::Contacts, "email", &email).await?;
        let properties = contact.into_properties();
        let token = self.token().await?;

        match existing {
            Some(id) => {
                self.api
                    .update_object(&token, ObjectKind::Contacts, &id, &properties)
                    .await?;
                tracing::info!(contact_id = %id, "Updated CRM contact");
                Ok(Upserted {
                    id,
                    action: UpsertAction::Updated,
                })
            }
            None => {
                let created = self
                    .api
                    .create_object(&token, ObjectKind::Contacts, &properties, &[])
                    .await?;
                tracing::info!(contact_id = %created.id, "Created CRM contact");
                Ok(Upserted {
                    id: created.id,
                    action: UpsertAction::Created,
                })
            }
        }
    }

    /// Update the deal with the same name, or create it linked to `contact_id`.
    pub async fn create_or_update_deal(
        &self,
        contact_id: &str,
        deal: DealInput,
    ) -> Result<Upserted, CrmError> {
        let existing = self
            .resolve(ObjectKind::Deals, "dealname", &deal.dealname)
            .await?;
        let properties = deal.into_properties();
        let token = self.token().await?;

        match existing {
            // Existing associations are left as they are.
            Some(id) => {
                self.api
                    .update_object(&token, ObjectKind::Deals, &id, &properties)
                    .await?;
                tracing::info!(deal_id = %id, "Updated CRM deal");
                Ok(Upserted {
                    id,
                    action: UpsertAction::Updated,
                })
            }
            None => {
                let associations = [AssociationSpec::new(contact_id, DEAL_TO_CONTACT)];
                let created = self
                    .api
                    .create_object(&token, ObjectKind::Deals, &properties, &associations)
                    .await?;
                tracing::info!(deal_id = %created.id, contact_id = %contact_id, "Created CRM deal");
                Ok(Upserted {
                    id: created.id,
                    action: UpsertAction::Created,
                })
            }
        }
    }

    /// Create a ticket linked to both its deal and its contact. Never deduplicated.
    pub async fn create_ticket(
        &self,
        contact_id: &str,
        deal_id: &str,
        ticket: TicketInput,
    ) -> Result<String, CrmError> {
        let properties = ticket_properties_to_remote(ticket.into_properties());
        let associations = [
            AssociationSpec::new(deal_id, TICKET_TO_DEAL),
            AssociationSpec::new(contact_id, TICKET_TO_CONTACT),
        ];

        let token = self.token().await?;
        let created = self
            .api
            .create_object(&token, ObjectKind::Tickets, &properties, &associations)
            .await?;

        tracing::info!(
            ticket_id = %created.id,
            deal_id = %deal_id,
            contact_id = %contact_id,
            "Created CRM ticket"
        );
        Ok(created.id)
    }

    /// One page of contacts, each expanded with its deals and their tickets.
    pub async fn list_contacts(
        &self,
        limit: u32,
        cursor: Option<&str>,
    ) -> Result<ContactPage, CrmError> {
        let request = PageRequest {
            limit: limit.clamp(1, MAX_PAGE_LIMIT),
            after: cursor.map(str::to_string),
            properties: owned(ObjectKind::Contacts.read_properties()),
            associations: vec![ObjectKind::Deals],
        };

        let token = self.token().await?;
        let page = self
            .api
            .get_page(&token, ObjectKind::Contacts, &request)
            .await?;

        let mut contacts = Vec::with_capacity(page.results.len());
        for contact in page.results {
            let mut deals = Vec::new();
            for deal_id in contact.associated(ObjectKind::Deals) {
                deals.push(self.expand_deal(deal_id).await?);
            }
            contacts.push(ContactRecord {
                id: contact.id,
                properties: contact.properties,
                deals,
            });
        }

        tracing::debug!(
            contacts = contacts.len(),
            has_more = page.next_after.is_some(),
            "Listed CRM contacts"
        );

        Ok(ContactPage {
            contacts,
            next_cursor: page.next_after,
        })
    }

    async fn expand_deal(&self, deal_id: &str) -> Result<DealRecord, CrmError> {
        let deal = self
            .get(
                ObjectKind::Deals,
                deal_id,
                ObjectKind::Deals.read_properties(),
                &[ObjectKind::Tickets],
            )
            .await?;

        let mut tickets = Vec::new();
        for ticket_id in deal.associated(ObjectKind::Tickets) {
            let ticket = self
                .get(
                    ObjectKind::Tickets,
                    ticket_id,
                    ObjectKind::Tickets.read_properties(),
                    &[],
                )
                .await?;
            tickets.push(TicketRecord {
                id: ticket.id,
                properties: ticket_properties_from_remote(ticket.properties),
            });
        }

        Ok(DealRecord {
            id: deal.id,
            properties: deal.properties,
            tickets,
        })
    }

    async fn get(
        &self,
        kind: ObjectKind,
        id: &str,
        properties: &[&str],
        associations: &[ObjectKind],
    ) -> Result<CrmObject, CrmError> {
        let token = self.token().await?;
        self.api
            .get_object(&token, kind, id, &owned(properties), associations)
            .await
    }

    /// Pipelines for `kind` with their stages in display order.
    pub async fn list_pipelines(&self, kind: ObjectKind) -> Result<Vec<Pipeline>, CrmError> {
        let token = self.token().await?;
        let mut pipelines = self.api.list_pipelines(&token, kind).await?;
        for pipeline in &mut pipelines {
            pipeline.stages.sort_by_key(|stage| stage.display_order);
        }
        Ok(pipelines)
    }

    pub async fn list_pipeline_tickets(&self) -> Result<Vec<Pipeline>, CrmError> {
        self.list_pipelines(ObjectKind::Tickets).await
    }

    pub async fn list_deal_stages(&self) -> Result<Vec<Pipeline>, CrmError> {
        self.list_pipelines(ObjectKind::Deals).await
    }
}
