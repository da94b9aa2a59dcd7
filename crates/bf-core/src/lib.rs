//! bf-core: shared foundation for biofront.
//!
//! Contains:
//! - value (typed scalars parsed from CSV-in-XML text)
//! - numeric (Real, finiteness checks, mean/std)
//! - units (uom lengths in micrometres)
//! - error (shared error types)

pub mod error;
pub mod numeric;
pub mod units;
pub mod value;

pub use error::{BfError, BfResult};
pub use numeric::*;
pub use units::*;
pub use value::{Value, typecast};
