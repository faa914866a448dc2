use serde_json::Value as JsonValue;

use super::error::ResolveError;
use super::faults::{FaultInjector, paginate_with_faults};
use super::pagination::{PageLink, paginate};
use super::pattern::{PathPattern, classify};
use crate::models::PageResponse;
use crate::store::RouteStore;

/// Outcome of resolving a public request path
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// Stored response, unmodified
    Plain(JsonValue),
    Page(PageResponse),
}

/// Resolve a request path against every user's routes.
///
/// When several owners registered the same path the earliest-created route wins.
pub async fn resolve(
    store: &dyn RouteStore,
    faults: &FaultInjector,
    request_path: &str,
    origin: &str,
) -> Result<Resolution, ResolveError> {
    let pattern = classify(request_path)?;
    let lookup_path = pattern.lookup_path();

    let route = store
        .find_by_path(lookup_path)
        .await?
        .ok_or_else(|| ResolveError::RouteNotFound {
            path: lookup_path.to_string(),
        })?;

    tracing::debug!(
        "Resolved {} to route {} (owner {})",
        request_path,
        route.id,
        route.owner_id
    );

    let (records, index, error_index) = match pattern {
        PathPattern::Plain(_) => return Ok(Resolution::Plain(route.response)),
        PathPattern::PageForm { records, index, .. } => (records, index, None),
        PathPattern::ErrorForm {
            records,
            index,
            error_index,
            ..
        } => (records, index, Some(error_index)),
    };

    let sequence = match route.response {
        JsonValue::Array(sequence) => sequence,
        other => {
            return Err(ResolveError::UnsupportedResponseType {
                path: lookup_path.to_string(),
                found: json_kind(&other),
            });
        }
    };

    let link = PageLink {
        origin,
        base_path: lookup_path,
    };

    let page = match error_index {
        None => paginate(&sequence, records, index, &link)?,
        Some(error_index) => {
            paginate_with_faults(&sequence, records, index, error_index, &link, || faults.sample())?
        }
    };

    Ok(Resolution::Page(page))
}

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "an array",
        JsonValue::Object(_) => "an object",
    }
}
