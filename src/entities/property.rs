use serde::{Deserialize, Serialize};

use crate::diagnostics::Diagnostic;
use crate::entities::{DEFAULT_MAX_RESULTS, degrade, required_text};
use crate::error::BioPortalError;
use crate::sources::bioportal::{BioPortalClient, DEFAULT_PAGE_SIZE, PropertySearchParams};
use crate::transform;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OntologyProperty {
    pub id: String,
    pub label: String,
    pub ontology: String,
    pub ontology_url: String,
}

#[derive(Debug, Clone)]
pub struct PropertySearchRequest {
    pub query: String,
    pub ontologies: Vec<String>,
    pub max_results: usize,
    pub require_exact_match: bool,
    pub require_definitions: bool,
    pub also_search_views: bool,
    /// `object`, `annotation`, `datatype`.
    pub property_types: Vec<String>,
    pub ontology_types: Vec<String>,
    pub api_key: Option<String>,
}

impl PropertySearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ontologies: Vec::new(),
            max_results: DEFAULT_MAX_RESULTS,
            require_exact_match: false,
            require_definitions: false,
            also_search_views: false,
            property_types: Vec::new(),
            ontology_types: Vec::new(),
            api_key: None,
        }
    }
}

/// Searches ontology properties (relations, annotation properties, ...).
pub async fn search_ontology_properties(
    client: &BioPortalClient,
    request: &PropertySearchRequest,
) -> Result<Vec<OntologyProperty>, BioPortalError> {
    let api_key = client.resolve_api_key(request.api_key.as_deref())?;
    let result = search_with_key(client, &api_key, request).await;
    degrade(client, "search_ontology_properties", result)
}

async fn search_with_key(
    client: &BioPortalClient,
    api_key: &str,
    request: &PropertySearchRequest,
) -> Result<Vec<OntologyProperty>, BioPortalError> {
    let query = required_text(&request.query, "Query")?;
    if request.max_results == 0 {
        return Ok(Vec::new());
    }

    let params = PropertySearchParams {
        query: query.to_string(),
        ontologies: request.ontologies.clone(),
        ontology_types: request.ontology_types.clone(),
        property_types: request.property_types.clone(),
        require_exact_match: request.require_exact_match,
        also_search_views: request.also_search_views,
        require_definitions: request.require_definitions,
        page_size: DEFAULT_PAGE_SIZE,
    };
    let fetched = client
        .property_search(api_key, &params, Some(request.max_results))
        .await;

    let mut out: Vec<OntologyProperty> = fetched
        .records
        .into_iter()
        .filter_map(|record| {
            let property = transform::ontology::normalize_property(record);
            if property.is_none() {
                client
                    .diagnostics()
                    .record(Diagnostic::RecordSkipped { kind: "property" });
            }
            property
        })
        .collect();
    out.truncate(request.max_results);
    Ok(out)
}
