//! Request middleware.

pub mod database;

pub use database::require_database;
