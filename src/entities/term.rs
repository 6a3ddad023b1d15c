use serde::{Deserialize, Serialize};

use crate::diagnostics::Diagnostic;
use crate::entities::{DEFAULT_MAX_RESULTS, degrade, required_text};
use crate::error::BioPortalError;
use crate::sources::bioportal::{BioPortalClient, DEFAULT_PAGE_SIZE, SearchParams};
use crate::transform;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OntologyTerm {
    pub id: String,
    pub label: String,
    pub ontology: String,
    pub ontology_url: String,
}

#[derive(Debug, Clone)]
pub struct TermSearchRequest {
    pub query: String,
    pub ontologies: Vec<String>,
    pub max_results: usize,
    pub require_exact_match: bool,
    pub also_search_properties: bool,
    pub also_search_obsolete: bool,
    pub api_key: Option<String>,
}

impl TermSearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ontologies: Vec::new(),
            max_results: DEFAULT_MAX_RESULTS,
            require_exact_match: false,
            also_search_properties: false,
            also_search_obsolete: false,
            api_key: None,
        }
    }
}

/// Searches ontology classes, returning at most `max_results` terms in the
/// service's ranking order.
pub async fn search_ontology_terms(
    client: &BioPortalClient,
    request: &TermSearchRequest,
) -> Result<Vec<OntologyTerm>, BioPortalError> {
    let api_key = client.resolve_api_key(request.api_key.as_deref())?;
    let result = search_with_key(client, &api_key, request).await;
    degrade(client, "search_ontology_terms", result)
}

async fn search_with_key(
    client: &BioPortalClient,
    api_key: &str,
    request: &TermSearchRequest,
) -> Result<Vec<OntologyTerm>, BioPortalError> {
    let query = required_text(&request.query, "Query")?;
    if request.max_results == 0 {
        return Ok(Vec::new());
    }

    let params = SearchParams {
        query: query.to_string(),
        ontologies: request.ontologies.clone(),
        require_exact_match: request.require_exact_match,
        also_search_properties: request.also_search_properties,
        also_search_obsolete: request.also_search_obsolete,
        page_size: DEFAULT_PAGE_SIZE,
    };
    let fetched = client
        .search(api_key, &params, Some(request.max_results))
        .await;

    let mut out = Vec::with_capacity(fetched.records.len());
    for record in fetched.records {
        match transform::ontology::normalize_term(record) {
            Some(term) => out.push(term),
            None => client
                .diagnostics()
                .record(Diagnostic::RecordSkipped { kind: "term" }),
        }
    }
    out.truncate(request.max_results);
    Ok(out)
}
