use std::sync::{Mutex, PoisonError};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::Value as JsonValue;

use super::error::ResolveError;
use super::pagination::{PageLink, slice_page};
use super::pattern::validate_cursor;
use crate::models::PageResponse;

/// Seconds advertised to clients hit by a simulated rate limit
pub const RETRY_AFTER_SECS: u64 = 60;

/// Kinds of failure the error-pagination form can simulate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    /// Deterministic: pagination reached the configured error index
    PerrorSimulation,
    RateLimitExceeded,
    ServiceUnavailable,
    RequestTimeout,
    BadGateway,
    ForbiddenAccess,
}

impl FaultKind {
    pub fn error_type(self) -> &'static str {
        match self {
            FaultKind::PerrorSimulation => "PERROR_SIMULATION",
            FaultKind::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            FaultKind::ServiceUnavailable => "SERVICE_UNAVAILABLE",
            FaultKind::RequestTimeout => "REQUEST_TIMEOUT",
            FaultKind::BadGateway => "BAD_GATEWAY",
            FaultKind::ForbiddenAccess => "FORBIDDEN_ACCESS",
        }
    }

    /// Whether a well-behaved client should retry after this fault
    pub fn retryable(self) -> bool {
        !matches!(self, FaultKind::PerrorSimulation | FaultKind::ForbiddenAccess)
    }

    pub fn retry_after_secs(self) -> Option<u64> {
        match self {
            FaultKind::RateLimitExceeded => Some(RETRY_AFTER_SECS),
            _ => None,
        }
    }
}

/// A failure produced on purpose for an error-pagination request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulatedFault {
    pub kind: FaultKind,
    pub records: u64,
    pub index: u64,
    pub error_index: u64,
}

impl SimulatedFault {
    /// Exclusive end of the requested range
    pub fn range_end(&self) -> u64 {
        self.index.saturating_add(self.records)
    }

    pub fn message(&self) -> String {
        match self.kind {
            FaultKind::PerrorSimulation => format!(
                "Simulated error: requested items {}..{} reach error index {}",
                self.index,
                self.range_end(),
                self.error_index
            ),
            FaultKind::RateLimitExceeded => format!(
                "Rate limit exceeded. Please retry after {} seconds",
                RETRY_AFTER_SECS
            ),
            FaultKind::ServiceUnavailable => "Service temporarily unavailable".to_string(),
            FaultKind::RequestTimeout => "Request timed out".to_string(),
            FaultKind::BadGateway => "Bad gateway: upstream service returned an invalid response".to_string(),
            FaultKind::ForbiddenAccess => "Access to this resource is forbidden".to_string(),
        }
    }
}

/// Map one uniform sample from `[0, 100)` to a randomized fault, if any.
///
/// | sample    | outcome            |
/// |-----------|--------------------|
/// | `[0,2)`   | rate limit         |
/// | `[2,4)`   | service unavailable|
/// | `[4,6)`   | request timeout    |
/// | `[6,8)`   | bad gateway        |
/// | `[8,10)`  | forbidden          |
/// | `[10,100)`| no fault           |
pub fn fault_for_sample(sample: f64) -> Option<FaultKind> {
    match sample {
        s if s < 2.0 => Some(FaultKind::RateLimitExceeded),
        s if s < 4.0 => Some(FaultKind::ServiceUnavailable),
        s if s < 6.0 => Some(FaultKind::RequestTimeout),
        s if s < 8.0 => Some(FaultKind::BadGateway),
        s if s < 10.0 => Some(FaultKind::ForbiddenAccess),
        _ => None,
    }
}

/// Paginate with simulated failures.
///
/// The error-index threshold is checked before the bounds check and before
/// `sample` is drawn, so reaching it fails the same way on every call.
pub fn paginate_with_faults(
    sequence: &[JsonValue],
    records: u64,
    index: u64,
    error_index: u64,
    link: &PageLink<'_>,
    sample: impl FnOnce() -> f64,
) -> Result<PageResponse, ResolveError> {
    validate_cursor(records, index, Some(error_index))?;

    let fault = |kind| {
        ResolveError::Simulated(SimulatedFault {
            kind,
            records,
            index,
            error_index,
        })
    };

    if index.saturating_add(records) >= error_index {
        return Err(fault(FaultKind::PerrorSimulation));
    }

    if index >= sequence.len() as u64 {
        return Err(ResolveError::IndexOutOfBounds {
            records,
            index,
            total: sequence.len(),
        });
    }

    if let Some(kind) = fault_for_sample(sample()) {
        return Err(fault(kind));
    }

    slice_page(sequence, records, index, Some(error_index), link)
}

/// Source of fault samples shared across requests
pub struct FaultInjector {
    rng: Mutex<StdRng>,
}

impl FaultInjector {
    /// Seeded injectors replay the same fault sequence; unseeded ones use OS entropy
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            rng: Mutex::new(rng),
        }
    }

    /// Draw one sample from `[0, 100)`
    pub fn sample(&self) -> f64 {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        rng.random_range(0.0..100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn items(n: usize) -> Vec<JsonValue> {
        (0..n).map(|i| json!(i)).collect()
    }

    fn link() -> PageLink<'static> {
        PageLink {
            origin: "http://localhost:3000",
            base_path: "/items",
        }
    }

    #[test]
    fn test_sample_table_boundaries() {
        assert_eq!(fault_for_sample(0.0), Some(FaultKind::RateLimitExceeded));
        assert_eq!(fault_for_sample(1.99), Some(FaultKind::RateLimitExceeded));
        assert_eq!(fault_for_sample(2.0), Some(FaultKind::ServiceUnavailable));
        assert_eq!(fault_for_sample(4.0), Some(FaultKind::RequestTimeout));
        assert_eq!(fault_for_sample(6.0), Some(FaultKind::BadGateway));
        assert_eq!(fault_for_sample(8.0), Some(FaultKind::ForbiddenAccess));
        assert_eq!(fault_for_sample(9.999), Some(FaultKind::ForbiddenAccess));
        assert_eq!(fault_for_sample(10.0), None);
        assert_eq!(fault_for_sample(99.99), None);
    }

    #[test]
    fn test_fault_kind_properties() {
        assert!(FaultKind::RateLimitExceeded.retryable());
        assert!(FaultKind::BadGateway.retryable());
        assert!(!FaultKind::ForbiddenAccess.retryable());
        assert!(!FaultKind::PerrorSimulation.retryable());
        assert_eq!(FaultKind::RateLimitExceeded.retry_after_secs(), Some(60));
        assert_eq!(FaultKind::ServiceUnavailable.retry_after_secs(), None);
    }

    #[test]
    fn test_threshold_wins_over_sampling() {
        let sequence = items(10);
        for _ in 0..100 {
            let err = paginate_with_faults(&sequence, 3, 5, 8, &link(), || {
                panic!("sampler must not be consulted once the threshold is reached")
            })
            .unwrap_err();

            match err {
                ResolveError::Simulated(fault) => {
                    assert_eq!(fault.kind, FaultKind::PerrorSimulation);
                    assert_eq!((fault.records, fault.index, fault.error_index), (3, 5, 8));
                    assert_eq!(fault.range_end(), 8);
                }
                other => panic!("unexpected error: {:?}", other),
            }
        }
    }

    #[test]
    fn test_threshold_checked_before_bounds() {
        let err = paginate_with_faults(&items(2), 5, 50, 10, &link(), || 50.0).unwrap_err();
        assert!(matches!(
            err,
            ResolveError::Simulated(SimulatedFault { kind: FaultKind::PerrorSimulation, .. })
        ));
    }

    #[test]
    fn test_out_of_bounds_below_threshold() {
        let err = paginate_with_faults(&items(2), 1, 5, 100, &link(), || 50.0).unwrap_err();
        assert!(matches!(err, ResolveError::IndexOutOfBounds { index: 5, total: 2, .. }));
    }

    #[test]
    fn test_random_fault_surfaces() {
        let err = paginate_with_faults(&items(10), 2, 0, 100, &link(), || 8.5).unwrap_err();
        match err {
            ResolveError::Simulated(fault) => assert_eq!(fault.kind, FaultKind::ForbiddenAccess),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_no_fault_carries_error_index() {
        let page = paginate_with_faults(&items(10), 3, 3, 9, &link(), || 42.0).unwrap();

        assert_eq!(page.data, vec![json!(3), json!(4), json!(5)]);
        assert_eq!(page.pagination.error_index, Some(9));
        assert!(page.pagination.has_more);
        assert_eq!(page.next_url, "http://localhost:3000/items/perror/3/6/9");
    }

    #[test]
    fn test_zero_records_is_invalid() {
        let err = paginate_with_faults(&items(3), 0, 0, 5, &link(), || 50.0).unwrap_err();
        assert!(matches!(err, ResolveError::InvalidPaginationParameters { .. }));
    }

    #[test]
    fn test_seeded_injectors_agree() {
        let a = FaultInjector::new(Some(7));
        let b = FaultInjector::new(Some(7));
        for _ in 0..50 {
            let sample = a.sample();
            assert!((0.0..100.0).contains(&sample));
            assert_eq!(sample, b.sample());
        }
    }
}
