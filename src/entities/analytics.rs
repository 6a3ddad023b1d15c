use serde_json::{Map, Value};

use crate::entities::degrade;
use crate::error::BioPortalError;
use crate::sources::bioportal::{AnalyticsParams, BioPortalClient};

/// Visit counts as returned by the service; the layout differs between the
/// per-ontology and the aggregate view and is passed through untouched.
pub type OntologyAnalytics = Map<String, Value>;

#[derive(Debug, Clone, Default)]
pub struct AnalyticsRequest {
    pub ontology: Option<String>,
    /// Only used for the aggregate view.
    pub month: Option<u32>,
    /// Only used for the aggregate view.
    pub year: Option<u32>,
    pub api_key: Option<String>,
}

fn validate_acronym(acronym: &str) -> Result<(), BioPortalError> {
    let valid = acronym
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !valid {
        return Err(BioPortalError::InvalidArgument(format!(
            "Invalid ontology acronym \"{acronym}\". Expected letters, digits, '-' or '_' (e.g. NCIT)"
        )));
    }
    Ok(())
}

pub async fn get_ontology_analytics(
    client: &BioPortalClient,
    request: &AnalyticsRequest,
) -> Result<OntologyAnalytics, BioPortalError> {
    let api_key = client.resolve_api_key(request.api_key.as_deref())?;
    let result = analytics_with_key(client, &api_key, request).await;
    degrade(client, "get_ontology_analytics", result)
}

async fn analytics_with_key(
    client: &BioPortalClient,
    api_key: &str,
    request: &AnalyticsRequest,
) -> Result<OntologyAnalytics, BioPortalError> {
    let ontology = request
        .ontology
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty());
    if let Some(acronym) = ontology {
        validate_acronym(acronym)?;
    }

    let params = AnalyticsParams {
        ontology: ontology.map(str::to_string),
        month: request.month,
        year: request.year,
    };
    Ok(client.analytics(api_key, &params).await)
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[tokio::test]
    async fn aggregate_view_passes_month_and_year() {
        let server = MockServer::start().await;
        let body = json!({"NCIT": {"2024": {"3": 5120}}, "GO": {"2024": {"3": 4200}}});
        Mock::given(method("GET"))
            .and(path("/analytics"))
            .and(query_param("apikey", "k"))
            .and(query_param("month", "3"))
            .and(query_param("year", "2024"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body.clone()))
            .expect(1)
            .mount(&server)
            .await;

        let client = BioPortalClient::new_for_test(server.uri()).unwrap();
        let out = get_ontology_analytics(
            &client,
            &AnalyticsRequest {
                month: Some(3),
                year: Some(2024),
                api_key: Some("k".into()),
                ..AnalyticsRequest::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(Value::Object(out), body);
    }

    #[tokio::test]
    async fn single_ontology_view_is_passed_through() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ontologies/NCIT/analytics"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"NCIT": {"2023": {"12": 9}}})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = BioPortalClient::new_for_test(server.uri()).unwrap();
        let out = get_ontology_analytics(
            &client,
            &AnalyticsRequest {
                ontology: Some(" NCIT ".into()),
                month: Some(1),
                api_key: Some("k".into()),
                ..AnalyticsRequest::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(out["NCIT"]["2023"]["12"], 9);
    }

    #[tokio::test]
    async fn bad_acronym_degrades_without_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(0)
            .mount(&server)
            .await;

        let client = BioPortalClient::new_for_test(server.uri()).unwrap();
        let out = get_ontology_analytics(
            &client,
            &AnalyticsRequest {
                ontology: Some("../admin".into()),
                api_key: Some("k".into()),
                ..AnalyticsRequest::default()
            },
        )
        .await
        .unwrap();
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn missing_key_raises_configuration_error() {
        let client = BioPortalClient::new_for_test("http://127.0.0.1:9".into()).unwrap();
        let err = get_ontology_analytics(&client, &AnalyticsRequest::default())
            .await
            .unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn validate_acronym_accepts_common_forms() {
        assert!(validate_acronym("NCIT").is_ok());
        assert!(validate_acronym("SNOMEDCT_US").is_ok());
        assert!(validate_acronym("ICD-10").is_ok());
        assert!(validate_acronym("GO/evil").is_err());
    }
}
