//! Bill charge collection
//!
//! Cursor-driven pagination over `fetchBillCharges` with progress reporting.

pub mod paginator;
pub mod progress;
pub mod query;

pub use paginator::*;
pub use progress::*;
pub use query::*;
