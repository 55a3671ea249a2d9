//! Mock CRM Implementation
//!
//! In-memory stand-in for HubSpot used by tests and local development.
//! Issues its own access tokens, keeps objects and association links,
//! records every call, and can be told to fail specific operations.
//! Thread-safe via `Mutex<>`; share it behind an `Arc`.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::api::{CrmApi, CrmObject, ObjectPage, PageRequest, SearchRequest};
use crate::lease::{RefreshGrant, TokenExchange, TokenGrant, TokenLease};
use crate::model::{
    AssociationSpec, DealStage, ObjectKind, Pipeline, PipelineStage, DEAL_TO_CONTACT,
    TICKET_TO_CONTACT, TICKET_TO_DEAL,
};
use crate::properties::PropertyMap;
use crate::service::CrmSync;
use crate::CrmError;

/// Default lifetime of tokens issued by the mock, in seconds
pub const MOCK_TOKEN_TTL_SECS: i64 = 1800;

const FIRST_OBJECT_ID: u64 = 1001;

/// A call received by the mock, in arrival order
#[derive(Debug, Clone, PartialEq)]
pub enum MockCall {
    TokenExchange,
    Create {
        kind: ObjectKind,
        properties: PropertyMap,
        associations: Vec<AssociationSpec>,
    },
    Update {
        kind: ObjectKind,
        id: String,
        properties: PropertyMap,
    },
    Get {
        kind: ObjectKind,
        id: String,
    },
    Search {
        kind: ObjectKind,
        property: String,
        value: String,
    },
    Page {
        kind: ObjectKind,
        limit: u32,
        after: Option<String>,
    },
    Pipelines {
        kind: ObjectKind,
    },
}

/// An injected failure. Stays armed until [`MockCrm::clear_failures`].
#[derive(Debug, Clone, PartialEq)]
pub enum MockFailure {
    TokenExchange,
    Search(ObjectKind),
    Create(ObjectKind),
    /// Fail creates of `kind` whose `property` has the given text value
    CreateWhere {
        kind: ObjectKind,
        property: String,
        value: String,
    },
    Update(ObjectKind),
    /// Single-object reads and page reads
    Read(ObjectKind),
    Pipelines(ObjectKind),
}

#[derive(Debug)]
struct MockState {
    next_id: u64,
    objects: BTreeMap<ObjectKind, BTreeMap<u64, PropertyMap>>,
    links: BTreeSet<(ObjectKind, u64, ObjectKind, u64)>,
    pipelines: BTreeMap<ObjectKind, Vec<Pipeline>>,
    issued_tokens: Vec<String>,
    failures: Vec<MockFailure>,
    calls: Vec<MockCall>,
}

impl MockState {
    fn new() -> Self {
        let mut pipelines = BTreeMap::new();
        pipelines.insert(ObjectKind::Tickets, vec![default_ticket_pipeline()]);
        pipelines.insert(ObjectKind::Deals, vec![default_deal_pipeline()]);

        Self {
            next_id: FIRST_OBJECT_ID,
            objects: BTreeMap::new(),
            links: BTreeSet::new(),
            pipelines,
            issued_tokens: Vec::new(),
            failures: Vec::new(),
            calls: Vec::new(),
        }
    }

    fn authorize(&self, token: &str) -> Result<(), CrmError> {
        if self.issued_tokens.iter().any(|t| t == token) {
            Ok(())
        } else {
            Err(CrmError::Response {
                status: 401,
                message: "Authentication credentials not found".to_string(),
            })
        }
    }

    fn check(&self, failure: &MockFailure) -> Result<(), CrmError> {
        if self.failures.contains(failure) {
            Err(injected(failure))
        } else {
            Ok(())
        }
    }

    fn check_create(&self, kind: ObjectKind, properties: &PropertyMap) -> Result<(), CrmError> {
        self.check(&MockFailure::Create(kind))?;
        for failure in &self.failures {
            if let MockFailure::CreateWhere {
                kind: k,
                property,
                value,
            } = failure
            {
                let matches = properties
                    .get_text(property)
                    .map(|v| v == value.as_str())
                    .unwrap_or(false);
                if *k == kind && matches {
                    return Err(injected(failure));
                }
            }
        }
        Ok(())
    }

    fn lookup(&self, kind: ObjectKind, id: &str) -> Result<(u64, &PropertyMap), CrmError> {
        id.parse::<u64>()
            .ok()
            .and_then(|n| {
                self.objects
                    .get(&kind)
                    .and_then(|objects| objects.get(&n))
                    .map(|properties| (n, properties))
            })
            .ok_or_else(|| not_found(kind, id))
    }

    fn insert(&mut self, kind: ObjectKind, properties: PropertyMap) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.objects.entry(kind).or_default().insert(id, properties);
        id
    }

    fn link(&mut self, a: (ObjectKind, u64), b: (ObjectKind, u64)) {
        self.links.insert((a.0, a.1, b.0, b.1));
        self.links.insert((b.0, b.1, a.0, a.1));
    }

    fn linked(&self, kind: ObjectKind, id: u64, other: ObjectKind) -> Vec<String> {
        self.links
            .iter()
            .filter(|(k, i, o, _)| *k == kind && *i == id && *o == other)
            .map(|(_, _, _, target)| target.to_string())
            .collect()
    }

    fn project(
        &self,
        kind: ObjectKind,
        id: u64,
        stored: &PropertyMap,
        properties: &[String],
        associations: &[ObjectKind],
    ) -> CrmObject {
        let projected = if properties.is_empty() {
            stored.clone()
        } else {
            stored
                .iter()
                .filter(|(key, _)| properties.contains(key))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect()
        };

        let mut object = CrmObject::new(id.to_string(), projected);
        for other in associations {
            let ids = self.linked(kind, id, *other);
            if !ids.is_empty() {
                object.associations.insert(*other, ids);
            }
        }
        object
    }
}

fn injected(failure: &MockFailure) -> CrmError {
    CrmError::Response {
        status: 503,
        message: format!("Mock failure injected: {:?}", failure),
    }
}

fn not_found(kind: ObjectKind, id: &str) -> CrmError {
    CrmError::Response {
        status: 404,
        message: format!("Object not found. objectId are usually numeric. {} {}", kind, id),
    }
}

fn association_target(from: ObjectKind, type_id: u32) -> Option<ObjectKind> {
    match (from, type_id) {
        (ObjectKind::Deals, DEAL_TO_CONTACT) => Some(ObjectKind::Contacts),
        (ObjectKind::Tickets, TICKET_TO_CONTACT) => Some(ObjectKind::Contacts),
        (ObjectKind::Tickets, TICKET_TO_DEAL) => Some(ObjectKind::Deals),
        _ => None,
    }
}

fn default_ticket_pipeline() -> Pipeline {
    let stages = [
        ("1", "New"),
        ("2", "Waiting on contact"),
        ("3", "Waiting on us"),
        ("4", "Closed"),
    ];
    Pipeline {
        id: "0".to_string(),
        label: "Support Pipeline".to_string(),
        display_order: 0,
        stages: stages
            .iter()
            .zip(0..)
            .map(|((id, label), order)| PipelineStage {
                id: id.to_string(),
                label: label.to_string(),
                display_order: order,
            })
            .collect(),
    }
}

fn default_deal_pipeline() -> Pipeline {
    let stages = [
        (DealStage::AppointmentScheduled, "Appointment Scheduled"),
        (DealStage::QualifiedToBuy, "Qualified To Buy"),
        (DealStage::PresentationScheduled, "Presentation Scheduled"),
        (DealStage::DecisionMakerBoughtIn, "Decision Maker Bought-In"),
        (DealStage::ContractSent, "Contract Sent"),
        (DealStage::ClosedWon, "Closed Won"),
        (DealStage::ClosedLost, "Closed Lost"),
    ];
    Pipeline {
        id: "default".to_string(),
        label: "Sales Pipeline".to_string(),
        display_order: 0,
        stages: stages
            .iter()
            .zip(0..)
            .map(|((stage, label), order)| PipelineStage {
                id: stage.as_str().to_string(),
                label: label.to_string(),
                display_order: order,
            })
            .collect(),
    }
}

/// Mock CRM that keeps everything in memory.
#[derive(Debug)]
pub struct MockCrm {
    state: Mutex<MockState>,
    token_ttl_secs: i64,
}

impl MockCrm {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState::new()),
            token_ttl_secs: MOCK_TOKEN_TTL_SECS,
        }
    }

    /// Lifetime of the access tokens this mock hands out
    pub fn with_token_ttl(mut self, ttl_secs: i64) -> Self {
        self.token_ttl_secs = ttl_secs;
        self
    }

    /// A sync service wired to this mock for both object calls and token exchange.
    pub fn sync_service(self: &Arc<Self>) -> CrmSync {
        let grant = RefreshGrant {
            client_id: "mock-client-id".to_string(),
            client_secret: "mock-client-secret".to_string(),
            refresh_token: "mock-refresh-token".to_string(),
        };
        let lease = TokenLease::new(self.clone(), grant);
        CrmSync::new(self.clone(), Arc::new(lease))
    }

    fn state(&self) -> Result<MutexGuard<'_, MockState>, CrmError> {
        self.state
            .lock()
            .map_err(|e| CrmError::Request(format!("mock state lock poisoned: {e}")))
    }

    fn inspect(&self) -> MutexGuard<'_, MockState> {
        self.state
            .lock()
            .expect("mock state lock poisoned, a prior test panicked")
    }

    /// Arm a failure for subsequent calls.
    pub fn fail(&self, failure: MockFailure) {
        self.inspect().failures.push(failure);
    }

    pub fn clear_failures(&self) {
        self.inspect().failures.clear();
    }

    /// Replace the pipelines returned for `kind`.
    pub fn set_pipelines(&self, kind: ObjectKind, pipelines: Vec<Pipeline>) {
        self.inspect().pipelines.insert(kind, pipelines);
    }

    /// Seed an object directly, bypassing call recording. Returns its id.
    pub fn insert_object(&self, kind: ObjectKind, properties: PropertyMap) -> String {
        self.inspect().insert(kind, properties).to_string()
    }

    /// Every call received so far
    pub fn recorded_calls(&self) -> Vec<MockCall> {
        self.inspect().calls.clone()
    }

    /// Number of refresh-token exchanges performed
    pub fn token_exchanges(&self) -> usize {
        self.inspect()
            .calls
            .iter()
            .filter(|c| matches!(c, MockCall::TokenExchange))
            .count()
    }

    /// Number of recorded calls matching `predicate`
    pub fn count(&self, predicate: impl Fn(&MockCall) -> bool) -> usize {
        self.inspect().calls.iter().filter(|c| predicate(c)).count()
    }

    /// All stored objects of `kind`, in id order
    pub fn objects(&self, kind: ObjectKind) -> Vec<CrmObject> {
        let state = self.inspect();
        let objects = state
            .objects
            .get(&kind)
            .map(|objects| {
                objects
                    .iter()
                    .map(|(id, properties)| CrmObject::new(id.to_string(), properties.clone()))
                    .collect()
            })
            .unwrap_or_default();
        objects
    }

    pub fn object(&self, kind: ObjectKind, id: &str) -> Option<CrmObject> {
        let state = self.inspect();
        let found = state
            .lookup(kind, id)
            .ok()
            .map(|(_, properties)| CrmObject::new(id, properties.clone()));
        found
    }

    /// Ids of `other` objects linked to the given object
    pub fn associated_ids(&self, kind: ObjectKind, id: &str, other: ObjectKind) -> Vec<String> {
        let state = self.inspect();
        let ids = match state.lookup(kind, id) {
            Ok((n, _)) => state.linked(kind, n, other),
            Err(_) => Vec::new(),
        };
        ids
    }
}

impl Default for MockCrm {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl TokenExchange for MockCrm {
    async fn exchange_refresh_token(&self, _grant: &RefreshGrant) -> Result<TokenGrant, CrmError> {
        let mut state = self.state()?;
        state.calls.push(MockCall::TokenExchange);
        if state.failures.contains(&MockFailure::TokenExchange) {
            return Err(CrmError::TokenExchange(
                "BAD_REFRESH_TOKEN: missing or unknown refresh token".to_string(),
            ));
        }

        let access_token = format!("mock-token-{}", state.issued_tokens.len() + 1);
        state.issued_tokens.push(access_token.clone());
        tracing::debug!(token = %access_token, "Mock CRM: issued access token");

        Ok(TokenGrant {
            access_token,
            expires_in: self.token_ttl_secs,
        })
    }
}

#[async_trait::async_trait]
impl CrmApi for MockCrm {
    async fn create_object(
        &self,
        token: &str,
        kind: ObjectKind,
        properties: &PropertyMap,
        associations: &[AssociationSpec],
    ) -> Result<CrmObject, CrmError> {
        let mut state = self.state()?;
        state.calls.push(MockCall::Create {
            kind,
            properties: properties.clone(),
            associations: associations.to_vec(),
        });
        state.authorize(token)?;
        state.check_create(kind, properties)?;

        let mut targets = Vec::with_capacity(associations.len());
        for association in associations {
            let target_kind = association_target(kind, association.type_id).ok_or_else(|| {
                CrmError::Response {
                    status: 400,
                    message: format!(
                        "Invalid association type {} for {}",
                        association.type_id, kind
                    ),
                }
            })?;
            let (target_id, _) = state.lookup(target_kind, &association.to_id)?;
            targets.push((target_kind, target_id));
        }

        let id = state.insert(kind, properties.clone());
        for target in targets {
            state.link((kind, id), target);
        }

        tracing::debug!(kind = %kind, id = id, "Mock CRM: created object");
        Ok(CrmObject::new(id.to_string(), properties.clone()))
    }

    async fn update_object(
        &self,
        token: &str,
        kind: ObjectKind,
        id: &str,
        properties: &PropertyMap,
    ) -> Result<CrmObject, CrmError> {
        let mut state = self.state()?;
        state.calls.push(MockCall::Update {
            kind,
            id: id.to_string(),
            properties: properties.clone(),
        });
        state.authorize(token)?;
        state.check(&MockFailure::Update(kind))?;

        let (n, _) = state.lookup(kind, id)?;
        let stored = state
            .objects
            .get_mut(&kind)
            .and_then(|objects| objects.get_mut(&n))
            .ok_or_else(|| not_found(kind, id))?;
        for (key, value) in properties.iter() {
            stored.insert(key.clone(), value.clone());
        }

        Ok(CrmObject::new(id, stored.clone()))
    }

    async fn get_object(
        &self,
        token: &str,
        kind: ObjectKind,
        id: &str,
        properties: &[String],
        associations: &[ObjectKind],
    ) -> Result<CrmObject, CrmError> {
        let mut state = self.state()?;
        state.calls.push(MockCall::Get {
            kind,
            id: id.to_string(),
        });
        state.authorize(token)?;
        state.check(&MockFailure::Read(kind))?;

        let (n, stored) = state.lookup(kind, id)?;
        Ok(state.project(kind, n, stored, properties, associations))
    }

    async fn search_objects(
        &self,
        token: &str,
        kind: ObjectKind,
        search: &SearchRequest,
    ) -> Result<Vec<CrmObject>, CrmError> {
        let mut state = self.state()?;
        state.calls.push(MockCall::Search {
            kind,
            property: search.property.clone(),
            value: search.value.clone(),
        });
        state.authorize(token)?;
        state.check(&MockFailure::Search(kind))?;

        let results = state
            .objects
            .get(&kind)
            .map(|objects| {
                objects
                    .iter()
                    .filter(|(_, properties)| {
                        properties
                            .get_text(&search.property)
                            .map(|v| v == search.value.as_str())
                            .unwrap_or(false)
                    })
                    .take(search.limit as usize)
                    .map(|(id, _)| CrmObject::new(id.to_string(), PropertyMap::new()))
                    .collect()
            })
            .unwrap_or_default();

        Ok(results)
    }

    async fn get_page(
        &self,
        token: &str,
        kind: ObjectKind,
        page: &PageRequest,
    ) -> Result<ObjectPage, CrmError> {
        let mut state = self.state()?;
        state.calls.push(MockCall::Page {
            kind,
            limit: page.limit,
            after: page.after.clone(),
        });
        state.authorize(token)?;
        state.check(&MockFailure::Read(kind))?;

        let offset = match &page.after {
            Some(after) => after.parse::<usize>().map_err(|_| CrmError::Response {
                status: 400,
                message: format!("Invalid paging cursor: {}", after),
            })?,
            None => 0,
        };
        let limit = page.limit as usize;

        let Some(objects) = state.objects.get(&kind) else {
            return Ok(ObjectPage::default());
        };

        let results = objects
            .iter()
            .skip(offset)
            .take(limit)
            .map(|(id, stored)| {
                state.project(kind, *id, stored, &page.properties, &page.associations)
            })
            .collect();
        let next_after = (offset + limit < objects.len()).then(|| (offset + limit).to_string());

        Ok(ObjectPage {
            results,
            next_after,
        })
    }

    async fn list_pipelines(
        &self,
        token: &str,
        kind: ObjectKind,
    ) -> Result<Vec<Pipeline>, CrmError> {
        let mut state = self.state()?;
        state.calls.push(MockCall::Pipelines { kind });
        state.authorize(token)?;
        state.check(&MockFailure::Pipelines(kind))?;

        Ok(state.pipelines.get(&kind).cloned().unwrap_or_default())
    }
}
