//! # Migration Module
//!
//! Schema provisioning for registered table schemas. The migrator collects
//! [`TableSchema`] values and creates their tables in registration order, so
//! referenced tables can simply be registered first.
//!
//! All generated statements are idempotent (`IF NOT EXISTS`), so running the
//! migrator repeatedly is safe.
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! db.migrator()
//!     .register(&users)
//!     .register(&contacts)
//!     .run()
//!     .await?;
//! ```

use crate::database::Database;
use crate::errors::Error;
use crate::schema::TableSchema;

/// Schema provisioning manager.
#[derive(Debug)]
pub struct Migrator<'a> {
    db: &'a Database,
    schemas: Vec<TableSchema>,
}

impl<'a> Migrator<'a> {
    /// Creates a migrator bound to a database. Usually called via
    /// [`Database::migrator`].
    pub fn new(db: &'a Database) -> Self {
        Self { db, schemas: Vec::new() }
    }

    /// Registers a schema for provisioning.
    #[must_use]
    pub fn register(mut self, schema: &TableSchema) -> Self {
        self.schemas.push(schema.clone());
        self
    }

    /// Creates every registered table, in registration order.
    pub async fn run(self) -> Result<(), Error> {
        for schema in &self.schemas {
            self.db.create_table(schema).await?;
        }
        Ok(())
    }
}
