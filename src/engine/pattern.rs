use super::error::ResolveError;

/// Literal segment introducing a page cursor: `{base}/page/{records}/{index}`
pub const PAGE_SEGMENT: &str = "page";
/// Literal segment introducing a faulty page cursor: `{base}/perror/{records}/{index}/{errorIndex}`
pub const ERROR_SEGMENT: &str = "perror";

/// Classified request path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathPattern<'a> {
    /// No recognised suffix, the path is looked up verbatim
    Plain(&'a str),
    PageForm {
        base_path: &'a str,
        records: u64,
        index: u64,
    },
    ErrorForm {
        base_path: &'a str,
        records: u64,
        index: u64,
        error_index: u64,
    },
}

impl<'a> PathPattern<'a> {
    /// Path of the stored route this request resolves against
    pub fn lookup_path(&self) -> &'a str {
        match *self {
            PathPattern::Plain(path) => path,
            PathPattern::PageForm { base_path, .. } => base_path,
            PathPattern::ErrorForm { base_path, .. } => base_path,
        }
    }

    pub fn is_plain(&self) -> bool {
        matches!(self, PathPattern::Plain(_))
    }
}

/// Classify a request path, trying the error form before the page form.
///
/// Trailing segments that are not all ASCII digits make the suffix
/// unrecognised, so the path falls through to [`PathPattern::Plain`].
/// Digit segments that are recognised but violate the cursor constraints
/// (zero `records`, values beyond `u64`) are rejected with
/// [`ResolveError::InvalidPaginationParameters`].
pub fn classify(path: &str) -> Result<PathPattern<'_>, ResolveError> {
    if let Some((base_path, [records, index, error_index])) = split_suffix::<3>(path, ERROR_SEGMENT) {
        let records = parse_param("records", records)?;
        let index = parse_param("index", index)?;
        let error_index = parse_param("errorIndex", error_index)?;
        validate_cursor(records, index, Some(error_index))?;
        return Ok(PathPattern::ErrorForm {
            base_path,
            records,
            index,
            error_index,
        });
    }

    if let Some((base_path, [records, index])) = split_suffix::<2>(path, PAGE_SEGMENT) {
        let records = parse_param("records", records)?;
        let index = parse_param("index", index)?;
        validate_cursor(records, index, None)?;
        return Ok(PathPattern::PageForm {
            base_path,
            records,
            index,
        });
    }

    Ok(PathPattern::Plain(path))
}

/// Cursor constraints shared by both paginated forms.
///
/// `index` and `errorIndex` are unsigned, so only `records` can be out of range.
pub fn validate_cursor(records: u64, index: u64, error_index: Option<u64>) -> Result<(), ResolveError> {
    if records == 0 {
        return Err(ResolveError::InvalidPaginationParameters {
            reason: "records must be a positive integer".to_string(),
            records: Some(records),
            index: Some(index),
            error_index,
        });
    }
    Ok(())
}

/// Split `{base}/{marker}/{n1}/.../{nN}` into the base and the N digit segments.
fn split_suffix<'a, const N: usize>(path: &'a str, marker: &str) -> Option<(&'a str, [&'a str; N])> {
    let mut rest = path;
    let mut numbers = [""; N];

    for slot in numbers.iter_mut().rev() {
        let (head, segment) = rest.rsplit_once('/')?;
        if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        *slot = segment;
        rest = head;
    }

    let (base_path, literal) = rest.rsplit_once('/')?;
    (literal == marker && !base_path.is_empty()).then_some((base_path, numbers))
}

fn parse_param(name: &str, segment: &str) -> Result<u64, ResolveError> {
    segment
        .parse::<u64>()
        .map_err(|_| ResolveError::InvalidPaginationParameters {
            reason: format!("{} must be a non-negative integer no larger than {}", name, u64::MAX),
            records: None,
            index: None,
            error_index: None,
        })
}
