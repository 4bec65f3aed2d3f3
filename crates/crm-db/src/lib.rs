//! CRM Database Layer
//!
//! Key-value persistence for CRM records: the backend abstraction, its
//! in-memory and PostgreSQL implementations, and the tenant-scoped entity store
//! every service builds on.

pub mod db;

pub use db::*;
