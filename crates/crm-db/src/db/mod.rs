//! Key-value store for tenant-partitioned records
//!
//! Records live in named collections and are addressed by
//! `(partition_key, id)`. Backends only understand JSON documents; the typed,
//! tenant-scoped view lives in [`store`].
//
// Backend contract, equality filters and the backend factory
pub mod backend;
//
// Backend implementations
pub mod memory;
pub mod postgres;
//
// Typed store over any backend
pub mod store;

pub use backend::{create_backend, Document, Filter, KeyValueBackend, RecordKey};
pub use memory::InMemoryBackend;
pub use postgres::PostgresBackend;
pub use store::TenantScopedStore;
