use std::borrow::Cow;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::config::ApiKeyResolver;
use crate::diagnostics::{Diagnostic, DiagnosticSink, TracingSink};
use crate::error::BioPortalError;
use crate::sources::pagination::{self, PageFetch, json_kind};
use crate::sources::{HttpTransport, JsonTransport, QueryParams};

const BIOPORTAL_BASE: &str = "https://data.bioontology.org";
const BIOPORTAL_API: &str = "bioportal";
const BIOPORTAL_BASE_ENV: &str = "BIOPORTAL_API_BASE";

pub const DEFAULT_PAGE_SIZE: usize = 50;

#[derive(Clone)]
pub struct BioPortalClient {
    transport: Arc<dyn JsonTransport>,
    base: Cow<'static, str>,
    keys: ApiKeyResolver,
    sink: Arc<dyn DiagnosticSink>,
}

#[derive(Debug, Clone)]
pub struct SearchParams {
    pub query: String,
    pub ontologies: Vec<String>,
    pub require_exact_match: bool,
    pub also_search_properties: bool,
    pub also_search_obsolete: bool,
    pub page_size: usize,
}

#[derive(Debug, Clone)]
pub struct PropertySearchParams {
    pub query: String,
    pub ontologies: Vec<String>,
    pub ontology_types: Vec<String>,
    pub property_types: Vec<String>,
    pub require_exact_match: bool,
    pub also_search_views: bool,
    pub require_definitions: bool,
    pub page_size: usize,
}

#[derive(Debug, Clone, Default)]
pub struct AnalyticsParams {
    /// Per-ontology view when set; month and year are ignored then.
    pub ontology: Option<String>,
    pub month: Option<u32>,
    pub year: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct AnnotatorParams {
    pub text: String,
    pub ontologies: Vec<String>,
    pub semantic_types: Vec<String>,
    pub stop_words: Vec<String>,
    pub expand_semantic_types_hierarchy: bool,
    pub expand_class_hierarchy: bool,
    pub class_hierarchy_max_level: u32,
    pub expand_mappings: bool,
    pub minimum_match_length: Option<u32>,
    pub exclude_numbers: bool,
    pub whole_word_only: bool,
    pub exclude_synonyms: bool,
    pub longest_only: bool,
}

impl Default for AnnotatorParams {
    fn default() -> Self {
        Self {
            text: String::new(),
            ontologies: Vec::new(),
            semantic_types: Vec::new(),
            stop_words: Vec::new(),
            expand_semantic_types_hierarchy: false,
            expand_class_hierarchy: false,
            class_hierarchy_max_level: 0,
            expand_mappings: false,
            minimum_match_length: None,
            exclude_numbers: false,
            whole_word_only: true,
            exclude_synonyms: false,
            longest_only: false,
        }
    }
}

fn flag(value: bool) -> String {
    let value = if value { "true" } else { "false" };
    value.to_string()
}

fn push_csv(params: &mut QueryParams, key: &'static str, values: &[String]) {
    let joined = values
        .iter()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .collect::<Vec<_>>()
        .join(",");
    if !joined.is_empty() {
        params.push((key, joined));
    }
}

impl SearchParams {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ontologies: Vec::new(),
            require_exact_match: false,
            also_search_properties: false,
            also_search_obsolete: false,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    fn to_query(&self, api_key: &str) -> QueryParams {
        let mut params = vec![
            ("q", self.query.trim().to_string()),
            ("apikey", api_key.to_string()),
            ("require_exact_match", flag(self.require_exact_match)),
            ("also_search_properties", flag(self.also_search_properties)),
            ("also_search_obsolete", flag(self.also_search_obsolete)),
        ];
        push_csv(&mut params, "ontologies", &self.ontologies);
        params
    }
}

impl PropertySearchParams {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ontologies: Vec::new(),
            ontology_types: Vec::new(),
            property_types: Vec::new(),
            require_exact_match: false,
            also_search_views: false,
            require_definitions: false,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    fn to_query(&self, api_key: &str) -> QueryParams {
        let mut params = vec![
            ("q", self.query.trim().to_string()),
            ("apikey", api_key.to_string()),
            ("require_exact_match", flag(self.require_exact_match)),
            ("also_search_views", flag(self.also_search_views)),
            ("require_definitions", flag(self.require_definitions)),
        ];
        push_csv(&mut params, "ontologies", &self.ontologies);
        push_csv(&mut params, "ontology_types", &self.ontology_types);
        push_csv(&mut params, "property_types", &self.property_types);
        params
    }
}

impl AnalyticsParams {
    fn ontology(&self) -> Option<&str> {
        self.ontology
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }

    fn path(&self) -> String {
        match self.ontology() {
            Some(acronym) => format!("ontologies/{acronym}/analytics"),
            None => "analytics".to_string(),
        }
    }

    fn to_query(&self, api_key: &str) -> QueryParams {
        let mut params = vec![("apikey", api_key.to_string())];
        if self.ontology().is_none() {
            if let Some(month) = self.month {
                params.push(("month", month.to_string()));
            }
            if let Some(year) = self.year {
                params.push(("year", year.to_string()));
            }
        }
        params
    }
}

impl AnnotatorParams {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    fn to_query(&self, api_key: &str) -> QueryParams {
        let mut params = vec![
            ("text", self.text.clone()),
            ("apikey", api_key.to_string()),
            (
                "expand_semantic_types_hierarchy",
                flag(self.expand_semantic_types_hierarchy),
            ),
            ("expand_class_hierarchy", flag(self.expand_class_hierarchy)),
            (
                "class_hierarchy_max_level",
                self.class_hierarchy_max_level.to_string(),
            ),
            ("expand_mappings", flag(self.expand_mappings)),
            ("exclude_numbers", flag(self.exclude_numbers)),
            ("whole_word_only", flag(self.whole_word_only)),
            ("exclude_synonyms", flag(self.exclude_synonyms)),
            ("longest_only", flag(self.longest_only)),
        ];
        push_csv(&mut params, "ontologies", &self.ontologies);
        push_csv(&mut params, "semantic_types", &self.semantic_types);
        push_csv(&mut params, "stop_words", &self.stop_words);
        if let Some(min) = self.minimum_match_length {
            params.push(("minimum_match_length", min.to_string()));
        }
        params
    }
}

impl BioPortalClient {
    pub fn new() -> Result<Self, BioPortalError> {
        Ok(Self {
            transport: Arc::new(HttpTransport::new(BIOPORTAL_API)?),
            base: crate::sources::env_base(BIOPORTAL_BASE, BIOPORTAL_BASE_ENV),
            keys: ApiKeyResolver::default(),
            sink: Arc::new(TracingSink),
        })
    }

    pub fn with_transport(
        base: impl Into<Cow<'static, str>>,
        transport: Arc<dyn JsonTransport>,
    ) -> Self {
        Self {
            transport,
            base: base.into(),
            keys: ApiKeyResolver::default(),
            sink: Arc::new(TracingSink),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sink = sink;
        self
    }

    #[cfg(test)]
    pub(crate) fn new_for_test(base: String) -> Result<Self, BioPortalError> {
        Ok(Self {
            transport: Arc::new(HttpTransport::new(BIOPORTAL_API)?),
            base: Cow::Owned(base),
            keys: ApiKeyResolver::with_env_var("BIOPORTAL_CLI_TEST_KEY_NEVER_SET_9d21"),
            sink: Arc::new(TracingSink),
        })
    }

    pub fn resolve_api_key(&self, explicit: Option<&str>) -> Result<String, BioPortalError> {
        self.keys.resolve(explicit)
    }

    pub fn diagnostics(&self) -> &dyn DiagnosticSink {
        self.sink.as_ref()
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base.as_ref().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    async fn paged(
        &self,
        path: &str,
        params: QueryParams,
        page_size: usize,
        max_records: Option<usize>,
    ) -> PageFetch {
        let url = self.endpoint(path);
        pagination::fetch_pages(
            self.transport.as_ref(),
            self.sink.as_ref(),
            &url,
            &params,
            page_size,
            max_records,
        )
        .await
    }

    /// One GET, degraded to `None` on transport or decode failure.
    async fn fetch_one(&self, path: &str, params: QueryParams) -> Option<Value> {
        let url = self.endpoint(path);
        match self.transport.get_json(&url, &params).await {
            Ok(body) => Some(body),
            Err(err) => {
                self.sink.record(Diagnostic::TransportFailed {
                    endpoint: url,
                    page: None,
                    message: err.to_string(),
                });
                None
            }
        }
    }

    fn unexpected_shape(&self, path: &str, body: &Value) {
        self.sink.record(Diagnostic::UnexpectedShape {
            endpoint: self.endpoint(path),
            page: None,
            found: json_kind(body),
        });
    }

    pub async fn search(
        &self,
        api_key: &str,
        params: &SearchParams,
        max_records: Option<usize>,
    ) -> PageFetch {
        self.paged(
            "search",
            params.to_query(api_key),
            params.page_size,
            max_records,
        )
        .await
    }

    pub async fn property_search(
        &self,
        api_key: &str,
        params: &PropertySearchParams,
        max_records: Option<usize>,
    ) -> PageFetch {
        self.paged(
            "property_search",
            params.to_query(api_key),
            params.page_size,
            max_records,
        )
        .await
    }

    /// Usage analytics as returned by the service; empty on any failure.
    pub async fn analytics(&self, api_key: &str, params: &AnalyticsParams) -> Map<String, Value> {
        let path = params.path();
        match self.fetch_one(&path, params.to_query(api_key)).await {
            Some(Value::Object(map)) => map,
            Some(other) => {
                self.unexpected_shape(&path, &other);
                Map::new()
            }
            None => Map::new(),
        }
    }

    /// Raw annotator records; empty on any failure.
    pub async fn annotate(&self, api_key: &str, params: &AnnotatorParams) -> Vec<Value> {
        match self.fetch_one("annotator", params.to_query(api_key)).await {
            Some(Value::Array(records)) => records,
            Some(other) => {
                self.unexpected_shape("annotator", &other);
                Vec::new()
            }
            None => Vec::new(),
        }
    }
}

/// Optional field that decodes to `None` when the payload has the wrong type.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

/// List whose entries are decoded one at a time; entries that do not fit are
/// dropped without affecting their neighbours.
fn lenient_entries<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    match Value::deserialize(deserializer)? {
        Value::Array(items) => Ok(items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect()),
        _ => Ok(Vec::new()),
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct BioPortalLinks {
    #[serde(default, deserialize_with = "lenient")]
    pub ontology: Option<String>,
}

/// A search hit from `/search`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BioPortalTerm {
    #[serde(rename = "@id")]
    pub id: Option<String>,
    pub pref_label: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub links: Option<BioPortalLinks>,
}

/// Property labels come back either as a string or as a list of strings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum LabelValue {
    One(String),
    Many(Vec<String>),
}

impl LabelValue {
    /// First entry that is not blank, returned as sent.
    pub fn first_non_empty(&self) -> Option<&str> {
        match self {
            Self::One(v) => Some(v.as_str()).filter(|v| !v.trim().is_empty()),
            Self::Many(values) => values
                .iter()
                .map(String::as_str)
                .find(|v| !v.trim().is_empty()),
        }
    }
}

/// A hit from `/property_search`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BioPortalProperty {
    #[serde(rename = "@id")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub label: Option<LabelValue>,
    #[serde(default, deserialize_with = "lenient")]
    pub label_generated: Option<LabelValue>,
    #[serde(default, deserialize_with = "lenient")]
    pub links: Option<BioPortalLinks>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BioPortalAnnotatedClass {
    #[serde(rename = "@id")]
    pub id: Option<String>,
    pub pref_label: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub links: Option<BioPortalLinks>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct BioPortalAnnotationSpan {
    pub text: Option<String>,
    pub from: Option<i64>,
    pub to: Option<i64>,
}

/// One record from `/annotator`: a class plus every place it matched.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BioPortalAnnotation {
    pub annotated_class: Option<BioPortalAnnotatedClass>,
    #[serde(default, deserialize_with = "lenient_entries")]
    pub annotations: Vec<BioPortalAnnotationSpan>,
}
