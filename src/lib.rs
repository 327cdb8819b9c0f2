pub mod analysis;
pub mod collector;
pub mod config;
pub mod error;
pub mod graphql;
pub mod report;
pub mod time;
pub mod transform;

// Database module for PostgreSQL
pub mod db;
