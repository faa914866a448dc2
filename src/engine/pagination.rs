use chrono::Utc;
use serde_json::Value as JsonValue;

use super::error::ResolveError;
use super::pattern::{ERROR_SEGMENT, PAGE_SEGMENT, validate_cursor};
use crate::models::{PageResponse, PaginationMeta};

/// Where follow-up cursor URLs point: `{origin}{base_path}/page/...`
#[derive(Debug, Clone, Copy)]
pub struct PageLink<'a> {
    /// `{scheme}://{host}` of the inbound request
    pub origin: &'a str,
    pub base_path: &'a str,
}

impl PageLink<'_> {
    pub fn next_url(&self, records: u64, next_index: u64, error_index: Option<u64>) -> String {
        match error_index {
            Some(error_index) => format!(
                "{}{}/{}/{}/{}/{}",
                self.origin, self.base_path, ERROR_SEGMENT, records, next_index, error_index
            ),
            None => format!(
                "{}{}/{}/{}/{}",
                self.origin, self.base_path, PAGE_SEGMENT, records, next_index
            ),
        }
    }
}

/// Slice `sequence[index .. index + records)` and describe the next cursor.
///
/// `nextUrl` is emitted even on the last page; `hasMore` is what signals the end.
pub fn paginate(
    sequence: &[JsonValue],
    records: u64,
    index: u64,
    link: &PageLink<'_>,
) -> Result<PageResponse, ResolveError> {
    validate_cursor(records, index, None)?;
    slice_page(sequence, records, index, None, link)
}

pub(super) fn slice_page(
    sequence: &[JsonValue],
    records: u64,
    index: u64,
    error_index: Option<u64>,
    link: &PageLink<'_>,
) -> Result<PageResponse, ResolveError> {
    let total = sequence.len();
    let start = usize::try_from(index)
        .ok()
        .filter(|&start| start < total)
        .ok_or(ResolveError::IndexOutOfBounds {
            records,
            index,
            total,
        })?;

    let end = start
        .saturating_add(usize::try_from(records).unwrap_or(usize::MAX))
        .min(total);
    let data = sequence[start..end].to_vec();

    Ok(PageResponse {
        id: Utc::now().timestamp_millis().to_string(),
        pagination: PaginationMeta {
            records,
            index,
            returned: data.len(),
            total,
            has_more: end < total,
            error_index,
        },
        next_url: link.next_url(records, end as u64, error_index),
        data,
    })
}
