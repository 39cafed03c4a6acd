//! # Error Handling Module
//!
//! This module defines the error types used throughout Carafe ORM.
//! It provides a centralized error handling system that wraps the various
//! failure scenarios of a record mapper: storage failures, conversion
//! failures, and caller misuse of the record lifecycle.
//!
//! ## Error Types
//!
//! - **InvalidData**: Data validation errors (e.g., persisting a record with no attributes)
//! - **Conversion**: Type conversion failures between `Value` and SQL types
//! - **DatabaseError**: Wrapped sqlx errors (connection issues, query failures, etc.)
//! - **InvalidArgument**: Invalid arguments passed to mapper methods
//! - **NotPersisted**: An operation that requires a stored row was called on a new record
//! - **Stale**: The record was deleted and can no longer be used
//! - **UnknownRelation**: A relation name that is not declared on the schema
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use carafe_orm::{Database, Error, TableSchema};
//!
//! async fn rename(db: &Database, schema: &TableSchema, id: i64, name: &str) -> Result<(), Error> {
//!     let mut record = db.record(schema);
//!     if !record.find_by_id(id).await? {
//!         return Err(Error::invalid_data("no such row"));
//!     }
//!     record.set("name", name)?;
//!     record.update().await?;
//!     Ok(())
//! }
//! ```

// ============================================================================
// External Crate Imports
// ============================================================================

use thiserror::Error;

// ============================================================================
// Error Enum Definition
// ============================================================================

/// The main error type for Carafe ORM operations.
///
/// Storage errors are wrapped unchanged via `#[from]`; the mapper never
/// swallows or retries them. Misuse of the record lifecycle (updating a
/// record that was never persisted, touching a deleted record) surfaces as
/// dedicated variants so callers can distinguish programming errors from
/// runtime storage failures.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid data error.
    ///
    /// Raised when data validation fails before a statement is built, for
    /// example calling `insert()` on a record with no attributes set.
    #[error("Invalid Data: {0}")]
    InvalidData(String),

    /// Type conversion error.
    ///
    /// Raised when converting between `Value` and SQL types fails, typically
    /// during argument binding or row decoding.
    #[error("Type conversion error: {0}")]
    Conversion(String),

    /// Database operation error.
    ///
    /// Wraps errors from the underlying sqlx library. Automatically converted
    /// from `sqlx::Error` via the `#[from]` attribute, so `?` propagation is
    /// seamless. Not-found is never reported through this variant: `find`
    /// returns `false` on a miss instead.
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    /// Invalid argument error.
    ///
    /// Indicates programmer error (passing invalid parameters) rather than
    /// runtime data issues, e.g. a pagination limit of zero or building a
    /// record without injecting a connection.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The record has no persisted primary key value.
    ///
    /// `update()`, `delete()` and relation loading are scoped by the primary
    /// key of a stored row; calling them on a record that was never inserted
    /// (or never found) is a misuse.
    #[error("Record of \"{0}\" has not been persisted")]
    NotPersisted(String),

    /// The record was deleted.
    ///
    /// After a successful `delete()` the instance is stale; any further
    /// mutation or terminal operation is a misuse.
    #[error("Record of \"{0}\" was deleted and is stale")]
    Stale(String),

    /// The relation name is not declared on the table schema.
    #[error("Unknown relation: {0}")]
    UnknownRelation(String),
}

// ============================================================================
// Helper Functions
// ============================================================================

impl Error {
    /// Creates an `InvalidData` error from a string slice.
    pub fn invalid_data(msg: &str) -> Self {
        Error::InvalidData(msg.to_string())
    }

    /// Creates an `InvalidArgument` error from a string slice.
    pub fn invalid_argument(msg: &str) -> Self {
        Error::InvalidArgument(msg.to_string())
    }

    /// Creates a `Conversion` error from a string slice.
    pub fn conversion(msg: &str) -> Self {
        Error::Conversion(msg.to_string())
    }
}
