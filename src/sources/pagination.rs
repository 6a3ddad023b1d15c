//! Page-walking engine shared by the paged BioPortal endpoints.

use serde::Serialize;
use serde_json::Value;

use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::sources::JsonTransport;

/// Why a paginated fetch stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// A page came back empty.
    Exhausted,
    /// The accumulator reached `max_records` and was truncated to it.
    Capped,
    /// A page held fewer records than the requested page size.
    ShortPage,
    TransportError,
    ShapeError,
}

#[derive(Debug, Clone)]
pub struct PageFetch {
    pub records: Vec<Value>,
    /// Number of HTTP round trips made.
    pub pages: usize,
    pub stop: StopReason,
}

/// Extracts the record list from a page body: either a bare array or an
/// object carrying the array under `collection`.
pub(crate) fn page_records(body: Value) -> Result<Vec<Value>, &'static str> {
    match body {
        Value::Array(records) => Ok(records),
        Value::Object(mut map) => match map.remove("collection") {
            Some(Value::Array(records)) => Ok(records),
            Some(other) => Err(json_kind(&other)),
            None => Err("object without collection"),
        },
        other => Err(json_kind(&other)),
    }
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Walks `endpoint` page by page starting at 1, appending each page's
/// records in order.
///
/// After each page the checks run in this order: empty page, record cap,
/// short page. Transport failures and unexpected payloads end the walk and
/// keep whatever was already accumulated. `max_records`, when set, bounds
/// the result exactly.
pub async fn fetch_pages(
    transport: &dyn JsonTransport,
    sink: &dyn DiagnosticSink,
    endpoint: &str,
    base_params: &[(&'static str, String)],
    page_size: usize,
    max_records: Option<usize>,
) -> PageFetch {
    let page_size = page_size.max(1);
    let mut records: Vec<Value> = Vec::new();
    let mut page = 1usize;
    let mut pages = 0usize;

    let stop = if max_records == Some(0) {
        StopReason::Capped
    } else {
        loop {
            let mut params = base_params.to_vec();
            params.push(("page", page.to_string()));
            params.push(("pagesize", page_size.to_string()));

            pages += 1;
            let body = match transport.get_json(endpoint, &params).await {
                Ok(body) => body,
                Err(err) => {
                    sink.record(Diagnostic::TransportFailed {
                        endpoint: endpoint.to_string(),
                        page: Some(page),
                        message: err.to_string(),
                    });
                    break StopReason::TransportError;
                }
            };

            let batch = match page_records(body) {
                Ok(batch) => batch,
                Err(found) => {
                    sink.record(Diagnostic::UnexpectedShape {
                        endpoint: endpoint.to_string(),
                        page: Some(page),
                        found,
                    });
                    break StopReason::ShapeError;
                }
            };

            let count = batch.len();
            if count == 0 {
                break StopReason::Exhausted;
            }

            records.extend(batch);
            sink.record(Diagnostic::PageFetched {
                endpoint: endpoint.to_string(),
                page,
                count,
                total: records.len(),
            });

            if let Some(max) = max_records
                && records.len() >= max
            {
                records.truncate(max);
                break StopReason::Capped;
            }

            if count < page_size {
                break StopReason::ShortPage;
            }

            page += 1;
        }
    };

    sink.record(Diagnostic::FetchStopped {
        endpoint: endpoint.to_string(),
        reason: stop,
        pages,
        total: records.len(),
    });

    PageFetch {
        records,
        pages,
        stop,
    }
}
