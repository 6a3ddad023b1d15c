use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::entities::annotation::TextAnnotation;
use crate::entities::property::OntologyProperty;
use crate::entities::term::OntologyTerm;
use crate::sources::bioportal::{
    BioPortalAnnotation, BioPortalLinks, BioPortalProperty, BioPortalTerm,
};

pub const BIOPORTAL_UI_ONTOLOGIES: &str = "https://bioportal.bioontology.org/ontologies";

/// Which ontology a record belongs to: its acronym and BioPortal page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OntologyProvenance {
    pub acronym: String,
    pub page_url: String,
}

/// Blank values count as missing; everything else is kept as sent.
fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .filter(|v| !v.trim().is_empty())
        .map(str::to_string)
}

/// Typed view of a raw record; `None` when the payload does not fit.
pub fn decode<T: DeserializeOwned>(record: Value) -> Option<T> {
    serde_json::from_value(record).ok()
}

/// Acronym is the last path segment of `links.ontology`
/// (e.g. `https://data.bioontology.org/ontologies/NCIT` -> `NCIT`).
/// Missing or unusable links yield empty strings.
pub fn ontology_provenance(links: Option<&BioPortalLinks>) -> OntologyProvenance {
    let Some(url) = links
        .and_then(|l| l.ontology.as_deref())
        .map(str::trim)
        .filter(|v| !v.is_empty())
    else {
        return OntologyProvenance::default();
    };

    let acronym = url
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .trim();
    if acronym.is_empty() || acronym.contains(':') {
        return OntologyProvenance::default();
    }

    OntologyProvenance {
        acronym: acronym.to_string(),
        page_url: format!("{BIOPORTAL_UI_ONTOLOGIES}/{acronym}"),
    }
}

pub fn from_term_record(record: BioPortalTerm) -> Option<OntologyTerm> {
    let id = non_empty(record.id.as_deref())?;
    let label = non_empty(record.pref_label.as_deref())?;
    let provenance = ontology_provenance(record.links.as_ref());
    Some(OntologyTerm {
        id,
        label,
        ontology: provenance.acronym,
        ontology_url: provenance.page_url,
    })
}

pub fn from_property_record(record: BioPortalProperty) -> Option<OntologyProperty> {
    let id = non_empty(record.id.as_deref())?;
    let label = record
        .label
        .as_ref()
        .and_then(|l| l.first_non_empty())
        .or_else(|| {
            record
                .label_generated
                .as_ref()
                .and_then(|l| l.first_non_empty())
        })?
        .to_string();
    let provenance = ontology_provenance(record.links.as_ref());
    Some(OntologyProperty {
        id,
        label,
        ontology: provenance.acronym,
        ontology_url: provenance.page_url,
    })
}

/// Expands one annotator record into one row per matched span.
/// Spans without text, and records whose class lacks an id or label,
/// produce nothing.
pub fn from_annotation_record(record: BioPortalAnnotation) -> Vec<TextAnnotation> {
    let Some(class) = record.annotated_class else {
        return Vec::new();
    };
    let (Some(class_id), Some(label)) = (
        non_empty(class.id.as_deref()),
        non_empty(class.pref_label.as_deref()),
    ) else {
        return Vec::new();
    };
    let ontology = ontology_provenance(class.links.as_ref()).acronym;

    record
        .annotations
        .into_iter()
        .filter_map(|span| {
            let text = span.text.filter(|t| !t.trim().is_empty())?;
            Some(TextAnnotation {
                text,
                class_id: class_id.clone(),
                label: label.clone(),
                ontology: ontology.clone(),
                from: span.from.unwrap_or(0),
                to: span.to.unwrap_or(0),
            })
        })
        .collect()
}

pub fn normalize_term(record: Value) -> Option<OntologyTerm> {
    decode::<BioPortalTerm>(record).and_then(from_term_record)
}

pub fn normalize_property(record: Value) -> Option<OntologyProperty> {
    decode::<BioPortalProperty>(record).and_then(from_property_record)
}

pub fn normalize_annotation(record: Value) -> Vec<TextAnnotation> {
    decode::<BioPortalAnnotation>(record)
        .map(from_annotation_record)
        .unwrap_or_default()
}
