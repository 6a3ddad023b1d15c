use serde::{Deserialize, Serialize};

use crate::diagnostics::Diagnostic;
use crate::entities::{degrade, required_text};
use crate::error::BioPortalError;
use crate::sources::bioportal::{AnnotatorParams, BioPortalClient};
use crate::transform;

/// One place in the input text where an ontology class matched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextAnnotation {
    pub text: String,
    pub class_id: String,
    pub label: String,
    pub ontology: String,
    pub from: i64,
    pub to: i64,
}

#[derive(Debug, Clone)]
pub struct AnnotateRequest {
    pub text: String,
    pub ontologies: Vec<String>,
    pub longest_only: bool,
    pub exclude_numbers: bool,
    pub whole_word_only: bool,
    pub exclude_synonyms: bool,
    pub semantic_types: Vec<String>,
    pub expand_semantic_types_hierarchy: bool,
    pub expand_class_hierarchy: bool,
    pub class_hierarchy_max_level: u32,
    pub expand_mappings: bool,
    pub stop_words: Vec<String>,
    pub minimum_match_length: Option<u32>,
    pub api_key: Option<String>,
}

impl AnnotateRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ontologies: Vec::new(),
            longest_only: false,
            exclude_numbers: false,
            whole_word_only: true,
            exclude_synonyms: false,
            semantic_types: Vec::new(),
            expand_semantic_types_hierarchy: false,
            expand_class_hierarchy: false,
            class_hierarchy_max_level: 0,
            expand_mappings: false,
            stop_words: Vec::new(),
            minimum_match_length: None,
            api_key: None,
        }
    }
}

/// Finds ontology classes mentioned in `text`. One request per call.
pub async fn annotate_text(
    client: &BioPortalClient,
    request: &AnnotateRequest,
) -> Result<Vec<TextAnnotation>, BioPortalError> {
    let api_key = client.resolve_api_key(request.api_key.as_deref())?;
    let result = annotate_with_key(client, &api_key, request).await;
    degrade(client, "annotate_text", result)
}

async fn annotate_with_key(
    client: &BioPortalClient,
    api_key: &str,
    request: &AnnotateRequest,
) -> Result<Vec<TextAnnotation>, BioPortalError> {
    required_text(&request.text, "Text")?;

    let params = AnnotatorParams {
        text: request.text.clone(),
        ontologies: request.ontologies.clone(),
        semantic_types: request.semantic_types.clone(),
        stop_words: request.stop_words.clone(),
        expand_semantic_types_hierarchy: request.expand_semantic_types_hierarchy,
        expand_class_hierarchy: request.expand_class_hierarchy,
        class_hierarchy_max_level: request.class_hierarchy_max_level,
        expand_mappings: request.expand_mappings,
        minimum_match_length: request.minimum_match_length,
        exclude_numbers: request.exclude_numbers,
        whole_word_only: request.whole_word_only,
        exclude_synonyms: request.exclude_synonyms,
        longest_only: request.longest_only,
    };
    let records = client.annotate(api_key, &params).await;

    let mut out = Vec::new();
    for record in records {
        let rows = transform::ontology::normalize_annotation(record);
        if rows.is_empty() {
            client
                .diagnostics()
                .record(Diagnostic::RecordSkipped { kind: "annotation" });
        }
        out.extend(rows);
    }
    Ok(out)
}
