use crate::engine::faults::SimulatedFault;
use crate::store::StoreError;

/// Failures of dynamic route resolution
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("Invalid pagination parameters: {reason}")]
    InvalidPaginationParameters {
        reason: String,
        records: Option<u64>,
        index: Option<u64>,
        error_index: Option<u64>,
    },

    #[error("Route not found")]
    RouteNotFound { path: String },

    #[error("Pagination requires an array response, but the route at {path} stores {found}")]
    UnsupportedResponseType { path: String, found: &'static str },

    #[error("Index {index} is out of bounds for a response of {total} items")]
    IndexOutOfBounds { records: u64, index: u64, total: usize },

    #[error("{}", .0.message())]
    Simulated(SimulatedFault),

    #[error("Storage failure: {0}")]
    Storage(#[from] StoreError),
}
