//! Low-level CRM object API
//!
//! One method per remote operation. Every call takes the access token
//! explicitly; the token lease lives a layer above in [`crate::CrmSync`].

use std::collections::BTreeMap;

use crate::model::{AssociationSpec, ObjectKind, Pipeline};
use crate::properties::PropertyMap;
use crate::CrmError;

/// A CRM object as returned by the API
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CrmObject {
    pub id: String,
    pub properties: PropertyMap,
    /// Associated object ids, keyed by the kind requested
    pub associations: BTreeMap<ObjectKind, Vec<String>>,
}

impl CrmObject {
    pub fn new(id: impl Into<String>, properties: PropertyMap) -> Self {
        Self {
            id: id.into(),
            properties,
            associations: BTreeMap::new(),
        }
    }

    /// Ids of associated objects of `kind`, empty if none were returned
    pub fn associated(&self, kind: ObjectKind) -> &[String] {
        self.associations
            .get(&kind)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

/// Exact-match search on a single property
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub property: String,
    pub value: String,
    pub limit: u32,
}

impl SearchRequest {
    /// `property == value`, first match only
    pub fn eq(property: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            value: value.into(),
            limit: 1,
        }
    }
}

/// One page request against an object collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub limit: u32,
    pub after: Option<String>,
    pub properties: Vec<String>,
    pub associations: Vec<ObjectKind>,
}

/// One page of objects plus the cursor for the next page, if any
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ObjectPage {
    pub results: Vec<CrmObject>,
    pub next_after: Option<String>,
}

/// CRM object API trait for the real HubSpot client and the in-memory mock.
#[async_trait::async_trait]
pub trait CrmApi: Send + Sync {
    /// Create an object, wiring the given associations.
    async fn create_object(
        &self,
        token: &str,
        kind: ObjectKind,
        properties: &PropertyMap,
        associations: &[AssociationSpec],
    ) -> Result<CrmObject, CrmError>;

    /// Overwrite the given properties on an existing object.
    async fn update_object(
        &self,
        token: &str,
        kind: ObjectKind,
        id: &str,
        properties: &PropertyMap,
    ) -> Result<CrmObject, CrmError>;

    /// Fetch one object with the named properties and associated ids.
    async fn get_object(
        &self,
        token: &str,
        kind: ObjectKind,
        id: &str,
        properties: &[String],
        associations: &[ObjectKind],
    ) -> Result<CrmObject, CrmError>;

    async fn search_objects(
        &self,
        token: &str,
        kind: ObjectKind,
        search: &SearchRequest,
    ) -> Result<Vec<CrmObject>, CrmError>;

    async fn get_page(
        &self,
        token: &str,
        kind: ObjectKind,
        page: &PageRequest,
    ) -> Result<ObjectPage, CrmError>;

    async fn list_pipelines(&self, token: &str, kind: ObjectKind)
        -> Result<Vec<Pipeline>, CrmError>;
}
