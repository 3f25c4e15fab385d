//! OpenSearch request bodies and response parsing.

use std::collections::BTreeMap;

use serde_json::{json, Value};

use crate::errors::BackendError;
use roster_shared::{Alias, IndexDocument, SearchHit, SearchQuery, SearchResponse};

/// Build a search body from a SearchQuery.
///
/// Free text goes through `simple_query_string`; no text matches everything.
pub fn build_search_query(query: &SearchQuery) -> Value {
    let clause = match &query.text {
        Some(text) => json!({
            "simple_query_string": {
                "query": text
            }
        }),
        None => json!({
            "match_all": {}
        }),
    };

    json!({
        "query": clause,
        "from": query.from,
        "size": query.size
    })
}

/// Build the newline-delimited bulk body: an action line then a source line
/// per document, keyed by the document id.
pub(crate) fn build_bulk_body(alias: Alias, documents: &[IndexDocument]) -> Vec<Value> {
    let mut body = Vec::with_capacity(documents.len() * 2);
    for doc in documents {
        body.push(json!({"index": {"_index": alias.as_str(), "_id": doc.id}}));
        body.push(json!(doc.body));
    }
    body
}

/// Inspect a bulk response for item failures.
///
/// Throttled or server-side item failures are retryable; anything else is a
/// rejection.
pub(crate) fn bulk_failure(response: &Value) -> Option<BackendError> {
    if !response.get("errors").and_then(Value::as_bool).unwrap_or(false) {
        return None;
    }

    let items = response.get("items").and_then(Value::as_array)?;
    let failed: Vec<&Value> = items
        .iter()
        .filter_map(|item| item.get("index"))
        .filter(|item| item.get("error").is_some())
        .collect();

    if failed.is_empty() {
        return None;
    }

    let transient = failed.iter().all(|item| {
        let status = item.get("status").and_then(Value::as_u64).unwrap_or(0);
        status == 429 || status >= 500
    });
    let first_reason = failed[0]
        .pointer("/error/reason")
        .and_then(Value::as_str)
        .unwrap_or("unknown");
    let message = format!(
        "Bulk index: {} of {} documents failed (first: {})",
        failed.len(),
        items.len(),
        first_reason
    );

    Some(if transient {
        BackendError::request(message)
    } else {
        BackendError::rejected(message)
    })
}

/// Parse a single hit. Hits without an `_id` are skipped.
pub(crate) fn parse_hit(hit: &Value) -> Option<SearchHit> {
    let id = hit.get("_id")?.as_str()?.to_string();
    let score = hit.get("_score").and_then(Value::as_f64);
    let source: BTreeMap<String, String> = hit
        .get("_source")
        .and_then(Value::as_object)
        .map(|fields| {
            fields
                .iter()
                .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                .collect()
        })
        .unwrap_or_default();

    Some(SearchHit { id, score, source })
}

/// Parse a search response into hits and a total.
pub(crate) fn parse_search_response(response: &Value) -> Result<SearchResponse, BackendError> {
    let hits = response
        .get("hits")
        .ok_or_else(|| BackendError::decode("search response has no hits"))?;

    // `total` is an object on current engines and a bare number on old ones.
    let total = match hits.get("total") {
        Some(Value::Number(n)) => n.as_u64(),
        Some(total) => total.get("value").and_then(Value::as_u64),
        None => None,
    }
    .ok_or_else(|| BackendError::decode("search response has no total"))?;

    let hits = hits
        .get("hits")
        .and_then(Value::as_array)
        .map(|hits| hits.iter().filter_map(parse_hit).collect())
        .unwrap_or_default();

    Ok(SearchResponse { total, hits })
}
