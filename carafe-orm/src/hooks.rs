//! # Lifecycle Hooks Module
//!
//! This module defines the hook-set interface a record mapper dispatches
//! into at fixed points of its lifecycle. Instead of subclassing a base
//! record type, callers compose: a [`crate::record::Record`] is built from a
//! schema plus an optional hook-set object, and every terminal operation
//! calls the matching methods.
//!
//! ## Dispatch Points
//!
//! | Operation  | Before                          | After                          |
//! |------------|---------------------------------|--------------------------------|
//! | construct  | `on_construct` (sync, mutable config) |                          |
//! | find       | `before_find`                   | `after_find` (on a hit only)   |
//! | find_all   | `before_find_all`               | `after_find_all` (full list)   |
//! | insert     | `before_insert`, `before_save`  | `after_insert`, `after_save`   |
//! | update     | `before_update`, `before_save`  | `after_update`, `after_save`   |
//! | delete     | `before_delete`                 | `after_delete`                 |
//!
//! Every async hook is fallible. An error from a `before_*` hook aborts the
//! pending operation before any statement reaches the storage connection;
//! errors from `after_*` hooks propagate to the caller after the statement
//! has already run.
//!
//! ## Example
//!
//! ```rust,ignore
//! use carafe_orm::{Hooks, Record, RecordConfig};
//!
//! struct Timestamps;
//!
//! #[async_trait::async_trait]
//! impl Hooks for Timestamps {
//!     async fn before_insert(&self, record: &mut Record) -> Result<(), Error> {
//!         record.set("created_at", chrono::Utc::now())?;
//!         Ok(())
//!     }
//! }
//! ```

use async_trait::async_trait;

use crate::database::Database;
use crate::errors::Error;
use crate::record::Record;

// ============================================================================
// Construction Config
// ============================================================================

/// Mutable configuration handed to [`Hooks::on_construct`].
///
/// The hook may inject the storage connection or override the table name and
/// primary key before construction completes. Anything left untouched keeps
/// the values the caller supplied.
#[derive(Debug, Default)]
pub struct RecordConfig {
    /// The storage handle the record will execute through.
    pub connection: Option<Database>,
    /// Relation name override.
    pub table: Option<String>,
    /// Primary key override.
    pub primary_key: Option<String>,
}

// ============================================================================
// Hooks Trait
// ============================================================================

/// Overridable lifecycle extension points.
///
/// Every method has a no-op default, so implementors only write the hooks
/// they care about. Hook-set objects are shared (`Arc`) between a record and
/// the records it produces through `find_all`, so implementations hold their
/// mutable state behind interior mutability if they need any.
#[async_trait]
pub trait Hooks: Send + Sync {
    /// Called once while the record is being assembled.
    fn on_construct(&self, _config: &mut RecordConfig) {}

    /// Called before a single-row find executes.
    async fn before_find(&self, _record: &mut Record) -> Result<(), Error> {
        Ok(())
    }

    /// Called after a single-row find populated the record. Not called on a
    /// miss.
    async fn after_find(&self, _record: &mut Record) -> Result<(), Error> {
        Ok(())
    }

    /// Called before a multi-row find executes.
    async fn before_find_all(&self, _record: &mut Record) -> Result<(), Error> {
        Ok(())
    }

    /// Called once with the complete result list of a multi-row find.
    async fn after_find_all(&self, _records: &mut [Record]) -> Result<(), Error> {
        Ok(())
    }

    /// Called before an insert statement is built.
    async fn before_insert(&self, _record: &mut Record) -> Result<(), Error> {
        Ok(())
    }

    /// Called after a successful insert, with generated keys captured.
    async fn after_insert(&self, _record: &mut Record) -> Result<(), Error> {
        Ok(())
    }

    /// Called before an update statement is built.
    async fn before_update(&self, _record: &mut Record) -> Result<(), Error> {
        Ok(())
    }

    /// Called after an update completes, including the no-op case where the
    /// dirty set was empty.
    async fn after_update(&self, _record: &mut Record) -> Result<(), Error> {
        Ok(())
    }

    /// Called before either kind of persist, after the specific hook.
    async fn before_save(&self, _record: &mut Record) -> Result<(), Error> {
        Ok(())
    }

    /// Called after either kind of persist, after the specific hook.
    async fn after_save(&self, _record: &mut Record) -> Result<(), Error> {
        Ok(())
    }

    /// Called before a delete statement is built.
    async fn before_delete(&self, _record: &mut Record) -> Result<(), Error> {
        Ok(())
    }

    /// Called after a successful delete, before the record is marked stale.
    async fn after_delete(&self, _record: &mut Record) -> Result<(), Error> {
        Ok(())
    }
}

/// The default hook-set: every dispatch point is a no-op.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHooks;

#[async_trait]
impl Hooks for NoHooks {}
