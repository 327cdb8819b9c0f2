//! Database module for PostgreSQL connection and operations
//!
//! Persists flattened bill charges into the `bill_charges` table.

pub mod bill_charge_repo;
pub mod connection;

pub use bill_charge_repo::{BillChargeRepository, DEFAULT_BATCH_SIZE};
pub use connection::init_pool;
