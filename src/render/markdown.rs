use minijinja::{Environment, context};

use crate::entities::analytics::OntologyAnalytics;
use crate::entities::annotation::TextAnnotation;
use crate::entities::property::OntologyProperty;
use crate::entities::term::OntologyTerm;

const TERMS_TEMPLATE: &str = r#"# Ontology terms: {{ query }}
{% if rows %}
| Term ID | Label | Ontology | Page |
|---------|-------|----------|------|
{% for row in rows %}| {{ row.id|cell }} | {{ row.label|cell }} | {{ row.ontology|cell }} | {{ row.ontology_url|cell }} |
{% endfor %}
Returned {{ rows|length }} result{% if rows|length != 1 %}s{% endif %}.
{% else %}
No matching terms found.
{% endif %}"#;

const PROPERTIES_TEMPLATE: &str = r#"# Ontology properties: {{ query }}
{% if rows %}
| Property ID | Label | Ontology | Page |
|-------------|-------|----------|------|
{% for row in rows %}| {{ row.id|cell }} | {{ row.label|cell }} | {{ row.ontology|cell }} | {{ row.ontology_url|cell }} |
{% endfor %}
Returned {{ rows|length }} result{% if rows|length != 1 %}s{% endif %}.
{% else %}
No matching properties found.
{% endif %}"#;

const ANNOTATIONS_TEMPLATE: &str = r#"# Annotations
{% if rows %}
| Text | Class ID | Label | Ontology | From | To |
|------|----------|-------|----------|------|----|
{% for row in rows %}| {{ row.text|cell }} | {{ row.class_id|cell }} | {{ row.label|cell }} | {{ row.ontology|cell }} | {{ row.from }} | {{ row.to }} |
{% endfor %}
Returned {{ rows|length }} annotation{% if rows|length != 1 %}s{% endif %}.
{% else %}
No annotations found.
{% endif %}"#;

const ANALYTICS_TEMPLATE: &str = r#"# Ontology analytics: {{ scope }}
{% if body %}
```json
{{ body }}
```
{% else %}
No analytics available.
{% endif %}"#;

fn cell(value: String) -> String {
    value.replace('|', "\\|").replace(['\r', '\n'], " ")
}

fn environment() -> Result<Environment<'static>, minijinja::Error> {
    let mut env = Environment::new();
    env.add_filter("cell", cell);
    env.add_template("terms", TERMS_TEMPLATE)?;
    env.add_template("properties", PROPERTIES_TEMPLATE)?;
    env.add_template("annotations", ANNOTATIONS_TEMPLATE)?;
    env.add_template("analytics", ANALYTICS_TEMPLATE)?;
    Ok(env)
}

pub fn terms_markdown(query: &str, rows: &[OntologyTerm]) -> Result<String, minijinja::Error> {
    environment()?
        .get_template("terms")?
        .render(context! { query => query, rows => rows })
}

pub fn properties_markdown(
    query: &str,
    rows: &[OntologyProperty],
) -> Result<String, minijinja::Error> {
    environment()?
        .get_template("properties")?
        .render(context! { query => query, rows => rows })
}

pub fn annotations_markdown(rows: &[TextAnnotation]) -> Result<String, minijinja::Error> {
    environment()?
        .get_template("annotations")?
        .render(context! { rows => rows })
}

pub fn analytics_markdown(
    ontology: Option<&str>,
    analytics: &OntologyAnalytics,
) -> Result<String, minijinja::Error> {
    let scope = ontology.unwrap_or("all ontologies");
    let body = if analytics.is_empty() {
        String::new()
    } else {
        serde_json::to_string_pretty(analytics).unwrap_or_default()
    };
    environment()?
        .get_template("analytics")?
        .render(context! { scope => scope, body => body })
}
