//! Dynamic route resolution: path classification, pagination and fault simulation

pub mod error;
pub mod faults;
pub mod pagination;
pub mod pattern;
pub mod resolver;

pub use error::ResolveError;
pub use faults::{FaultInjector, FaultKind, SimulatedFault};
pub use resolver::{Resolution, resolve};
