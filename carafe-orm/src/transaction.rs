//! # Transaction Module
//!
//! Atomic units of work over the pooled connection. A [`Transaction`]
//! implements [`Connection`], so compiled query descriptions execute inside
//! it exactly the way they execute on the pool, and nothing is visible to
//! other connections until `commit`.
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use carafe_orm::query_builder::{execute, Query};
//!
//! let mut tx = db.begin().await?;
//! execute(&mut tx, &first_statement).await?;
//! execute(&mut tx, &second_statement).await?;
//! tx.commit().await?;
//! ```

use crate::database::{Connection, Drivers};
use crate::errors::Error;

/// A wrapper around a SQLx transaction.
///
/// Dropped without `commit`, the transaction rolls back automatically.
#[derive(Debug)]
pub struct Transaction {
    pub(crate) tx: sqlx::Transaction<'static, sqlx::Any>,
    pub(crate) driver: Drivers,
}

impl Connection for Transaction {
    type Exec<'c>
        = &'c mut sqlx::AnyConnection
    where
        Self: 'c;

    fn driver(&self) -> Drivers {
        self.driver
    }

    fn executor<'c>(&'c mut self) -> Self::Exec<'c> {
        &mut *self.tx
    }
}

impl Transaction {
    /// Commits the transaction, persisting every statement executed through
    /// it. Consumes the instance.
    pub async fn commit(self) -> Result<(), Error> {
        self.tx.commit().await?;
        Ok(())
    }

    /// Rolls the transaction back explicitly. This also happens when the
    /// instance is dropped uncommitted.
    pub async fn rollback(self) -> Result<(), Error> {
        self.tx.rollback().await?;
        Ok(())
    }
}
