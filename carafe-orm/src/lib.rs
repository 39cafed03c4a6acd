//! # Carafe ORM
//!
//! A dynamic record mapper built on top of sqlx. One [`Record`] pairs one row
//! of a named relation with an in-memory object: attributes are tracked
//! field-by-field against their last-persisted values, queries are composed
//! through a fluent builder that compiles to a backend-agnostic description,
//! relationships resolve lazily from declarative descriptors, and lifecycle
//! hooks fire at fixed points of every operation.
//!
//! Tables are described at runtime by a [`TableSchema`] instead of derived
//! struct metadata, so the same mapper serves any relation the schema names.

pub mod database;
pub mod errors;
pub mod hooks;
pub mod migration;
pub mod pagination;
pub mod query_builder;
pub mod record;
pub mod schema;
pub mod temporal;
pub mod transaction;
pub mod value;

pub use database::{Connection, Database, DatabaseBuilder, Drivers};
pub use errors::Error;
pub use hooks::{Hooks, NoHooks, RecordConfig};
pub use migration::Migrator;
pub use pagination::{Paginated, Pagination};
pub use query_builder::{ExecResult, Op, Query, QueryBuilder};
pub use record::{Record, RelationValue};
pub use schema::{ColumnDef, ColumnType, Relation, RelationKind, TableSchema};
pub use transaction::Transaction;
pub use value::Value;
