//! Bookkeeping tables of the SQL-backed target document store.
pub mod counter;
pub mod document;
pub mod migration_status;
