//! Top-level CLI parsing and command execution.

use clap::{Parser, Subcommand};
use tracing::debug;

use crate::entities::analytics::{AnalyticsRequest, get_ontology_analytics};
use crate::entities::annotation::{AnnotateRequest, annotate_text};
use crate::entities::property::{PropertySearchRequest, search_ontology_properties};
use crate::entities::split_csv;
use crate::entities::term::{TermSearchRequest, search_ontology_terms};
use crate::render;
use crate::sources::bioportal::BioPortalClient;

#[derive(Parser, Debug)]
#[command(
    name = "bioportal",
    about = "Search BioPortal ontologies, annotate text with ontology classes, and read usage analytics",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as JSON instead of Markdown
    #[arg(short, long, global = true)]
    pub json: bool,

    /// BioPortal API key (defaults to the BIOPORTAL_API_KEY environment variable)
    #[arg(long, global = true)]
    pub api_key: Option<String>,

    /// Log pagination and request progress to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Search ontology terms (classes)
    #[command(after_help = "\
EXAMPLES:
  bioportal search melanoma
  bioportal search neuron -o CL --limit 5
  bioportal search \"breast cancer\" -o NCIT,DOID --exact")]
    Search {
        /// Search text (e.g., melanoma, \"breast cancer\")
        query: String,
        /// Comma-separated ontology acronyms (e.g., NCIT,GO,HP)
        #[arg(short, long)]
        ontologies: Option<String>,
        /// Maximum results (default: 10)
        #[arg(short = 'n', long, default_value = "10")]
        limit: usize,
        /// Only exact label matches
        #[arg(long)]
        exact: bool,
        /// Also match on ontology properties
        #[arg(long)]
        properties: bool,
        /// Include obsolete terms
        #[arg(long)]
        obsolete: bool,
    },
    /// Search ontology properties (relations, annotation properties)
    #[command(after_help = "\
EXAMPLES:
  bioportal properties \"has part\"
  bioportal properties \"part of\" -o RO,BFO --property-types object")]
    Properties {
        /// Search text
        query: String,
        /// Comma-separated ontology acronyms
        #[arg(short, long)]
        ontologies: Option<String>,
        /// Maximum results (default: 10)
        #[arg(short = 'n', long, default_value = "10")]
        limit: usize,
        /// Only exact label matches
        #[arg(long)]
        exact: bool,
        /// Only properties that carry a definition
        #[arg(long)]
        definitions: bool,
        /// Comma-separated property types (object, annotation, datatype)
        #[arg(long)]
        property_types: Option<String>,
        /// Comma-separated ontology types (e.g., ONTOLOGY, VALUE_SET_COLLECTION)
        #[arg(long)]
        ontology_types: Option<String>,
        /// Also search ontology views
        #[arg(long)]
        views: bool,
    },
    /// Ontology visit analytics (one ontology, or all of them for a month)
    #[command(after_help = "\
EXAMPLES:
  bioportal analytics NCIT
  bioportal analytics --month 3 --year 2024")]
    Analytics {
        /// Ontology acronym; omit for the aggregate view
        ontology: Option<String>,
        /// Month (1-12), aggregate view only
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=12))]
        month: Option<u32>,
        /// Year, aggregate view only
        #[arg(long)]
        year: Option<u32>,
    },
    /// Annotate free text with ontology classes
    #[command(after_help = "\
EXAMPLES:
  bioportal annotate \"Melanoma is a malignant tumor of melanocytes\"
  bioportal annotate \"breast cancer\" -o NCIT,DOID --longest-only")]
    Annotate {
        /// Text to annotate
        text: String,
        /// Comma-separated ontology acronyms
        #[arg(short, long)]
        ontologies: Option<String>,
        /// Keep only the longest match for overlapping spans
        #[arg(long)]
        longest_only: bool,
        /// Drop purely numeric matches
        #[arg(long)]
        exclude_numbers: bool,
        /// Allow matches inside words
        #[arg(long)]
        partial_words: bool,
        /// Ignore synonym matches
        #[arg(long)]
        exclude_synonyms: bool,
        /// Comma-separated UMLS semantic types (e.g., T047,T191)
        #[arg(long)]
        semantic_types: Option<String>,
        /// Expand semantic types to their direct children
        #[arg(long)]
        expand_semantic_types: bool,
        /// Comma-separated stop words
        #[arg(long)]
        stop_words: Option<String>,
        /// Minimum matched text length
        #[arg(long = "min-length")]
        minimum_match_length: Option<u32>,
        /// Include ancestors of matched classes
        #[arg(long)]
        expand_hierarchy: bool,
        /// Ancestor depth when --expand-hierarchy is set
        #[arg(long, default_value = "0")]
        hierarchy_level: u32,
        /// Follow manual mappings (UMLS, REST, CUI, OBOXREF)
        #[arg(long)]
        expand_mappings: bool,
    },
}

fn csv_list(value: Option<String>) -> Vec<String> {
    value.as_deref().map(split_csv).unwrap_or_default()
}

pub async fn run(cli: Cli) -> anyhow::Result<String> {
    let client = BioPortalClient::new()?;
    run_with_client(&client, cli).await
}

pub async fn run_with_client(client: &BioPortalClient, cli: Cli) -> anyhow::Result<String> {
    let json_output = cli.json;
    let api_key = cli.api_key;
    debug!(command = ?cli.command, json_output, "running command");

    match cli.command {
        Commands::Search {
            query,
            ontologies,
            limit,
            exact,
            properties,
            obsolete,
        } => {
            let request = TermSearchRequest {
                ontologies: csv_list(ontologies),
                max_results: limit,
                require_exact_match: exact,
                also_search_properties: properties,
                also_search_obsolete: obsolete,
                api_key,
                ..TermSearchRequest::new(query.clone())
            };
            let rows = search_ontology_terms(client, &request).await?;
            if json_output {
                Ok(render::json::to_pretty(&rows)?)
            } else {
                Ok(render::markdown::terms_markdown(&query, &rows)?)
            }
        }
        Commands::Properties {
            query,
            ontologies,
            limit,
            exact,
            definitions,
            property_types,
            ontology_types,
            views,
        } => {
            let request = PropertySearchRequest {
                ontologies: csv_list(ontologies),
                max_results: limit,
                require_exact_match: exact,
                require_definitions: definitions,
                also_search_views: views,
                property_types: csv_list(property_types),
                ontology_types: csv_list(ontology_types),
                api_key,
                ..PropertySearchRequest::new(query.clone())
            };
            let rows = search_ontology_properties(client, &request).await?;
            if json_output {
                Ok(render::json::to_pretty(&rows)?)
            } else {
                Ok(render::markdown::properties_markdown(&query, &rows)?)
            }
        }
        Commands::Analytics {
            ontology,
            month,
            year,
        } => {
            let request = AnalyticsRequest {
                ontology: ontology.clone(),
                month,
                year,
                api_key,
            };
            let analytics = get_ontology_analytics(client, &request).await?;
            if json_output {
                Ok(render::json::to_pretty(&analytics)?)
            } else {
                Ok(render::markdown::analytics_markdown(
                    ontology.as_deref(),
                    &analytics,
                )?)
            }
        }
        Commands::Annotate {
            text,
            ontologies,
            longest_only,
            exclude_numbers,
            partial_words,
            exclude_synonyms,
            semantic_types,
            expand_semantic_types,
            stop_words,
            minimum_match_length,
            expand_hierarchy,
            hierarchy_level,
            expand_mappings,
        } => {
            let request = AnnotateRequest {
                ontologies: csv_list(ontologies),
                longest_only,
                exclude_numbers,
                whole_word_only: !partial_words,
                exclude_synonyms,
                semantic_types: csv_list(semantic_types),
                expand_semantic_types_hierarchy: expand_semantic_types,
                expand_class_hierarchy: expand_hierarchy,
                class_hierarchy_max_level: hierarchy_level,
                expand_mappings,
                stop_words: csv_list(stop_words),
                minimum_match_length,
                api_key,
                ..AnnotateRequest::new(text)
            };
            let rows = annotate_text(client, &request).await?;
            if json_output {
                Ok(render::json::to_pretty(&rows)?)
            } else {
                Ok(render::markdown::annotations_markdown(&rows)?)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Cli, Commands, run_with_client};
    use crate::sources::bioportal::BioPortalClient;
    use clap::Parser;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn search_parses_ontology_list_and_limit() {
        let cli = Cli::try_parse_from([
            "bioportal", "search", "breast cancer", "-o", "NCIT,DOID", "-n", "5", "--exact",
        ])
        .unwrap();
        match cli.command {
            Commands::Search {
                query,
                ontologies,
                limit,
                exact,
                properties,
                obsolete,
            } => {
                assert_eq!(query, "breast cancer");
                assert_eq!(ontologies.as_deref(), Some("NCIT,DOID"));
                assert_eq!(limit, 5);
                assert!(exact);
                assert!(!properties);
                assert!(!obsolete);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn search_limit_defaults_to_ten() {
        let cli = Cli::try_parse_from(["bioportal", "search", "melanoma"]).unwrap();
        assert!(matches!(cli.command, Commands::Search { limit: 10, .. }));
    }

    #[test]
    fn global_flags_work_after_subcommand() {
        let cli = Cli::try_parse_from([
            "bioportal", "analytics", "NCIT", "--json", "--api-key", "abc",
        ])
        .unwrap();
        assert!(cli.json);
        assert_eq!(cli.api_key.as_deref(), Some("abc"));
    }

    #[test]
    fn analytics_rejects_out_of_range_month() {
        assert!(Cli::try_parse_from(["bioportal", "analytics", "--month", "13"]).is_err());
        assert!(Cli::try_parse_from(["bioportal", "analytics", "--month", "12"]).is_ok());
    }

    #[test]
    fn annotate_defaults_to_whole_words() {
        let cli = Cli::try_parse_from(["bioportal", "annotate", "melanoma"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Annotate {
                partial_words: false,
                hierarchy_level: 0,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn search_command_renders_json() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("apikey", "abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "collection": [{
                    "@id": "http://purl.obolibrary.org/obo/NCIT_C3224",
                    "prefLabel": "Melanoma",
                    "links": {"ontology": "https://data.bioontology.org/ontologies/NCIT"}
                }]
            })))
            .mount(&server)
            .await;

        let client = BioPortalClient::new_for_test(server.uri()).unwrap();
        let cli = Cli::try_parse_from([
            "bioportal", "search", "melanoma", "--json", "--api-key", "abc",
        ])
        .unwrap();
        let out = run_with_client(&client, cli).await.unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed[0]["id"], "http://purl.obolibrary.org/obo/NCIT_C3224");
        assert_eq!(parsed[0]["ontology"], "NCIT");
    }

    #[tokio::test]
    async fn annotate_command_splits_comma_separated_filters() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/annotator"))
            .and(query_param("ontologies", "NCIT,GO"))
            .and(query_param("stop_words", "the,of"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "annotatedClass": {
                    "@id": "http://purl.obolibrary.org/obo/NCIT_C3224",
                    "prefLabel": "Melanoma",
                    "links": {"ontology": "https://data.bioontology.org/ontologies/NCIT"}
                },
                "annotations": [{"from": 1, "to": 8, "text": "MELANOMA"}]
            }])))
            .expect(1)
            .mount(&server)
            .await;

        let client = BioPortalClient::new_for_test(server.uri()).unwrap();
        let cli = Cli::try_parse_from([
            "bioportal",
            "annotate",
            "melanoma of the skin",
            "-o",
            " NCIT, GO,",
            "--stop-words",
            "the, ,of",
            "--json",
            "--api-key",
            "abc",
        ])
        .unwrap();
        let out = run_with_client(&client, cli).await.unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed[0]["text"], "MELANOMA");
    }

    #[tokio::test]
    async fn missing_key_fails_the_command() {
        let client = BioPortalClient::new_for_test("http://127.0.0.1:9".into()).unwrap();
        let cli = Cli::try_parse_from(["bioportal", "analytics"]).unwrap();
        let err = run_with_client(&client, cli).await.unwrap_err();
        assert!(err.to_string().contains("API key is required"));
    }
}
