//! Shared types used throughout the memory-system simulator.
//!
//! Provides address decomposition and the error taxonomy that the
//! configuration layer and the timing core both depend on.

/// Physical address decomposition into channel/rank/bank/row/column.
pub mod addr;

/// Configuration errors and fatal model faults.
pub mod error;

pub use addr::{AddressMapping, DecodedAddress, MappingScheme};
pub use error::{ConfigError, ModelFault};
