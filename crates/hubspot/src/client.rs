//! HubSpot REST API Implementation
//!
//! Talks to the CRM v3 object, search and pipeline endpoints and to the
//! OAuth token endpoint using a shared reqwest client.

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::api::{CrmApi, CrmObject, ObjectPage, PageRequest, SearchRequest};
use crate::lease::{RefreshGrant, TokenExchange, TokenGrant};
use crate::model::{AssociationSpec, ObjectKind, Pipeline, PipelineStage, HUBSPOT_DEFINED};
use crate::properties::PropertyMap;
use crate::{CrmConfig, CrmError};

#[derive(Debug, Serialize)]
struct CreateObjectBody<'a> {
    properties: &'a PropertyMap,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    associations: Vec<AssociationBody>,
}

#[derive(Debug, Serialize)]
struct UpdateObjectBody<'a> {
    properties: &'a PropertyMap,
}

#[derive(Debug, Serialize)]
struct AssociationBody {
    to: AssociationTarget,
    types: Vec<AssociationTypeBody>,
}

#[derive(Debug, Serialize)]
struct AssociationTarget {
    id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AssociationTypeBody {
    association_category: &'static str,
    association_type_id: u32,
}

impl From<&AssociationSpec> for AssociationBody {
    fn from(spec: &AssociationSpec) -> Self {
        Self {
            to: AssociationTarget {
                id: spec.to_id.clone(),
            },
            types: vec![AssociationTypeBody {
                association_category: HUBSPOT_DEFINED,
                association_type_id: spec.type_id,
            }],
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchBody<'a> {
    filter_groups: Vec<FilterGroup<'a>>,
    properties: Vec<&'static str>,
    limit: u32,
}

#[derive(Debug, Serialize)]
struct FilterGroup<'a> {
    filters: Vec<Filter<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Filter<'a> {
    property_name: &'a str,
    operator: &'static str,
    value: &'a str,
}

/// Object as returned by single-object, search and page endpoints
#[derive(Debug, Deserialize)]
struct ObjectBody {
    id: String,
    #[serde(default)]
    properties: BTreeMap<String, Option<String>>,
    #[serde(default)]
    associations: BTreeMap<String, AssociationList>,
}

#[derive(Debug, Deserialize)]
struct AssociationList {
    #[serde(default)]
    results: Vec<AssociationRef>,
}

#[derive(Debug, Deserialize)]
struct AssociationRef {
    id: String,
}

impl From<ObjectBody> for CrmObject {
    fn from(body: ObjectBody) -> Self {
        let mut associations = BTreeMap::new();
        for (name, list) in body.associations {
            let Some(kind) = kind_from_association_key(&name) else {
                continue;
            };
            // One entry per association type, so the same id can appear twice.
            let mut ids: Vec<String> = Vec::with_capacity(list.results.len());
            for entry in list.results {
                if !ids.contains(&entry.id) {
                    ids.push(entry.id);
                }
            }
            associations.insert(kind, ids);
        }

        CrmObject {
            id: body.id,
            properties: PropertyMap::from_remote(body.properties),
            associations,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CollectionBody {
    #[serde(default)]
    results: Vec<ObjectBody>,
    paging: Option<PagingBody>,
}

#[derive(Debug, Deserialize)]
struct PagingBody {
    next: Option<NextPageBody>,
}

#[derive(Debug, Deserialize)]
struct NextPageBody {
    after: String,
}

#[derive(Debug, Deserialize)]
struct PipelinesBody {
    #[serde(default)]
    results: Vec<PipelineBody>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PipelineBody {
    id: String,
    label: String,
    #[serde(default)]
    display_order: i32,
    #[serde(default)]
    stages: Vec<StageBody>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StageBody {
    id: String,
    label: String,
    #[serde(default)]
    display_order: i32,
}

impl From<PipelineBody> for Pipeline {
    fn from(body: PipelineBody) -> Self {
        Pipeline {
            id: body.id,
            label: body.label,
            display_order: body.display_order,
            stages: body
                .stages
                .into_iter()
                .map(|stage| PipelineStage {
                    id: stage.id,
                    label: stage.label,
                    display_order: stage.display_order,
                })
                .collect(),
        }
    }
}

/// HubSpot API error response
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    message: String,
    #[serde(default)]
    category: Option<String>,
}

/// OAuth token endpoint error response
#[derive(Debug, Deserialize)]
struct OAuthErrorResponse {
    #[serde(default)]
    status: Option<String>,
    message: String,
}

fn kind_from_association_key(key: &str) -> Option<ObjectKind> {
    match key {
        "contacts" => Some(ObjectKind::Contacts),
        "deals" => Some(ObjectKind::Deals),
        "tickets" => Some(ObjectKind::Tickets),
        _ => None,
    }
}

fn join_kinds(kinds: &[ObjectKind]) -> String {
    kinds
        .iter()
        .map(ObjectKind::as_str)
        .collect::<Vec<_>>()
        .join(",")
}

/// HubSpot CRM client
pub struct HubSpotClient {
    http: Client,
    base_url: String,
}

impl HubSpotClient {
    /// Create a new HubSpot client from configuration
    pub fn new(config: &CrmConfig) -> Result<Self, CrmError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| CrmError::Configuration(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn objects_url(&self, kind: ObjectKind) -> String {
        format!("{}/crm/v3/objects/{}", self.base_url, kind.as_str())
    }

    fn object_url(&self, kind: ObjectKind, id: &str) -> String {
        format!("{}/{}", self.objects_url(kind), id)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        operation: &str,
    ) -> Result<T, CrmError> {
        let response = request
            .send()
            .await
            .map_err(|e| CrmError::Request(format!("{} failed: {}", operation, e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());

            let message = match serde_json::from_str::<ErrorResponse>(&error_body) {
                Ok(ErrorResponse {
                    message,
                    category: Some(category),
                }) => format!("{}: {}", category, message),
                Ok(ErrorResponse { message, .. }) => message,
                Err(_) => error_body,
            };

            return Err(CrmError::Response {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| CrmError::Decode(format!("{} response: {}", operation, e)))
    }
}

#[async_trait::async_trait]
impl CrmApi for HubSpotClient {
    async fn create_object(
        &self,
        token: &str,
        kind: ObjectKind,
        properties: &PropertyMap,
        associations: &[AssociationSpec],
    ) -> Result<CrmObject, CrmError> {
        let body = CreateObjectBody {
            properties,
            associations: associations.iter().map(AssociationBody::from).collect(),
        };

        tracing::debug!(kind = %kind, associations = associations.len(), "Creating HubSpot object");

        let request = self.http.post(self.objects_url(kind)).bearer_auth(token).json(&body);
        let object: ObjectBody = self.send_json(request, "create").await?;
        Ok(object.into())
    }

    async fn update_object(
        &self,
        token: &str,
        kind: ObjectKind,
        id: &str,
        properties: &PropertyMap,
    ) -> Result<CrmObject, CrmError> {
        tracing::debug!(kind = %kind, id = %id, "Updating HubSpot object");

        let request = self
            .http
            .patch(self.object_url(kind, id))
            .bearer_auth(token)
            .json(&UpdateObjectBody { properties });
        let object: ObjectBody = self.send_json(request, "update").await?;
        Ok(object.into())
    }

    async fn get_object(
        &self,
        token: &str,
        kind: ObjectKind,
        id: &str,
        properties: &[String],
        associations: &[ObjectKind],
    ) -> Result<CrmObject, CrmError> {
        let mut query: Vec<(&str, String)> = Vec::new();
        if !properties.is_empty() {
            query.push(("properties", properties.join(",")));
        }
        if !associations.is_empty() {
            query.push(("associations", join_kinds(associations)));
        }

        tracing::debug!(kind = %kind, id = %id, "Fetching HubSpot object");

        let request = self
            .http
            .get(self.object_url(kind, id))
            .bearer_auth(token)
            .query(&query);
        let object: ObjectBody = self.send_json(request, "get").await?;
        Ok(object.into())
    }

    async fn search_objects(
        &self,
        token: &str,
        kind: ObjectKind,
        search: &SearchRequest,
    ) -> Result<Vec<CrmObject>, CrmError> {
        let body = SearchBody {
            filter_groups: vec![FilterGroup {
                filters: vec![Filter {
                    property_name: &search.property,
                    operator: "EQ",
                    value: &search.value,
                }],
            }],
            properties: vec!["id"],
            limit: search.limit,
        };

        tracing::debug!(kind = %kind, property = %search.property, "Searching HubSpot objects");

        let request = self
            .http
            .post(format!("{}/search", self.objects_url(kind)))
            .bearer_auth(token)
            .json(&body);
        let collection: CollectionBody = self.send_json(request, "search").await?;
        Ok(collection.results.into_iter().map(CrmObject::from).collect())
    }

    async fn get_page(
        &self,
        token: &str,
        kind: ObjectKind,
        page: &PageRequest,
    ) -> Result<ObjectPage, CrmError> {
        let mut query: Vec<(&str, String)> = vec![("limit", page.limit.to_string())];
        if let Some(after) = &page.after {
            query.push(("after", after.clone()));
        }
        if !page.properties.is_empty() {
            query.push(("properties", page.properties.join(",")));
        }
        if !page.associations.is_empty() {
            query.push(("associations", join_kinds(&page.associations)));
        }

        tracing::debug!(kind = %kind, limit = page.limit, "Fetching HubSpot object page");

        let request = self
            .http
            .get(self.objects_url(kind))
            .bearer_auth(token)
            .query(&query);
        let collection: CollectionBody = self.send_json(request, "get page").await?;

        Ok(ObjectPage {
            results: collection.results.into_iter().map(CrmObject::from).collect(),
            next_after: collection.paging.and_then(|p| p.next).map(|n| n.after),
        })
    }

    async fn list_pipelines(
        &self,
        token: &str,
        kind: ObjectKind,
    ) -> Result<Vec<Pipeline>, CrmError> {
        let request = self
            .http
            .get(format!("{}/crm/v3/pipelines/{}", self.base_url, kind.as_str()))
            .bearer_auth(token);
        let pipelines: PipelinesBody = self.send_json(request, "list pipelines").await?;
        Ok(pipelines.results.into_iter().map(Pipeline::from).collect())
    }
}

#[async_trait::async_trait]
impl TokenExchange for HubSpotClient {
    async fn exchange_refresh_token(&self, grant: &RefreshGrant) -> Result<TokenGrant, CrmError> {
        let form = [
            ("grant_type", "refresh_token"),
            ("client_id", grant.client_id.as_str()),
            ("client_secret", grant.client_secret.as_str()),
            ("refresh_token", grant.refresh_token.as_str()),
        ];

        let response = self
            .http
            .post(format!("{}/oauth/v1/token", self.base_url))
            .form(&form)
            .send()
            .await
            .map_err(|e| CrmError::TokenExchange(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());

            if let Ok(error) = serde_json::from_str::<OAuthErrorResponse>(&error_body) {
                return Err(CrmError::TokenExchange(format!(
                    "{} ({}): {}",
                    status,
                    error.status.unwrap_or_else(|| "error".to_string()),
                    error.message
                )));
            }

            return Err(CrmError::TokenExchange(format!(
                "token endpoint returned {}: {}",
                status, error_body
            )));
        }

        response
            .json::<TokenGrant>()
            .await
            .map_err(|e| CrmError::TokenExchange(format!("Failed to parse token response: {}", e)))
    }
}
