//! Registration sync: contact, then each deal, then each deal's tickets
//!
//! Only a failed contact upsert aborts the run. Deal and ticket failures are
//! logged, recorded in the report, and the run moves on.

use crmsync_hubspot::{ContactInput, CrmError, CrmSync};

use crate::domain::registration::{
    DealOutcome, DealRegistration, RegistrationReport, SyncStatus, TicketOutcome,
};

#[derive(Clone)]
pub struct RegistrationOrchestrator {
    crm: CrmSync,
}

impl RegistrationOrchestrator {
    pub fn new(crm: CrmSync) -> Self {
        Self { crm }
    }

    /// Sync one registration into the CRM in dependency order.
    pub async fn sync(
        &self,
        contact: ContactInput,
        deals: Vec<DealRegistration>,
    ) -> Result<RegistrationReport, CrmError> {
        let contact = self
            .crm
            .create_or_update_contact(contact)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Contact sync failed, aborting registration sync");
                e
            })?;

        let mut outcomes = Vec::with_capacity(deals.len());
        for registration in deals {
            outcomes.push(self.sync_deal(&contact.id, registration).await);
        }

        let report = RegistrationReport {
            contact_id: contact.id,
            contact_action: contact.action,
            deals: outcomes,
        };

        if report.is_complete() {
            tracing::info!(
                contact_id = %report.contact_id,
                deals = report.deals.len(),
                "Registration synced to CRM"
            );
        } else {
            tracing::warn!(
                contact_id = %report.contact_id,
                failures = report.failure_count(),
                "Registration synced to CRM with failures"
            );
        }

        Ok(report)
    }

    async fn sync_deal(&self, contact_id: &str, registration: DealRegistration) -> DealOutcome {
        let DealRegistration { deal, tickets } = registration;
        let dealname = deal.dealname.clone();

        let deal = match self.crm.create_or_update_deal(contact_id, deal).await {
            Ok(upserted) => upserted,
            Err(e) => {
                tracing::warn!(
                    dealname = %dealname,
                    skipped_tickets = tickets.len(),
                    error = %e,
                    "Deal sync failed, skipping its tickets"
                );
                return DealOutcome {
                    dealname,
                    status: SyncStatus::Failed {
                        error: e.to_string(),
                    },
                    tickets: Vec::new(),
                };
            }
        };

        let mut ticket_outcomes = Vec::with_capacity(tickets.len());
        for ticket in tickets {
            let subject = ticket.subject.clone();
            let status = match self.crm.create_ticket(contact_id, &deal.id, ticket).await {
                Ok(id) => SyncStatus::Created { id },
                Err(e) => {
                    tracing::warn!(
                        deal_id = %deal.id,
                        subject = %subject,
                        error = %e,
                        "Ticket sync failed"
                    );
                    SyncStatus::Failed {
                        error: e.to_string(),
                    }
                }
            };
            ticket_outcomes.push(TicketOutcome { subject, status });
        }

        DealOutcome {
            dealname,
            status: SyncStatus::from_upsert(deal.action, deal.id),
            tickets: ticket_outcomes,
        }
    }
}
