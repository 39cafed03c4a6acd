//! # Pagination Module
//!
//! A standard `Pagination` struct compatible with web frameworks and `serde`:
//! it deserializes straight from query parameters (`?page=1&limit=20`) and
//! applies an offset/count pair to a record's pending chain.
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use carafe_orm::Pagination;
//!
//! let mut users = db.record(&users_schema);
//! users.greater_or_equal("age", 18).order_by("name ASC");
//!
//! let page = Pagination::new(0, 10).paginate(&mut users).await?;
//! println!("{} of {} users", page.data.len(), page.total);
//! ```

use serde::{Deserialize, Serialize};

use crate::errors::Error;
use crate::record::Record;

/// A standard pagination structure.
///
/// Can be deserialized from query parameters (e.g., `?page=1&limit=20`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Pagination {
    /// The page number (0-indexed). Default: 0.
    #[serde(default)]
    pub page: usize,

    /// The number of items per page. Default: 10.
    #[serde(default = "default_limit")]
    pub limit: usize,
}

/// A wrapper for paginated results.
///
/// Contains the page of records and metadata about the pagination state.
#[derive(Debug, Clone, Serialize)]
pub struct Paginated<T> {
    /// The list of items for the current page.
    pub data: Vec<T>,
    /// The total number of items matching the query.
    pub total: i64,
    /// The current page number (0-indexed).
    pub page: usize,
    /// The number of items per page.
    pub limit: usize,
    /// The total number of pages.
    pub total_pages: i64,
}

fn default_limit() -> usize {
    10
}

impl Default for Pagination {
    fn default() -> Self {
        Self { page: 0, limit: 10 }
    }
}

impl Pagination {
    /// Creates a new Pagination instance.
    pub fn new(page: usize, limit: usize) -> Self {
        Self { page, limit }
    }

    /// Applies the offset/count pair to a record's pending chain.
    pub fn apply<'r>(&self, record: &'r mut Record) -> &'r mut Record {
        record.limit(self.page * self.limit, self.limit)
    }

    /// Executes the record's pending chain as one counted page.
    ///
    /// Performs two queries: a `COUNT(*)` over the accumulated clauses, then
    /// the data fetch with the offset/count applied. The pending chain is
    /// consumed, as with any terminal operation.
    pub async fn paginate(&self, record: &mut Record) -> Result<Paginated<Record>, Error> {
        if self.limit == 0 {
            return Err(Error::invalid_argument("pagination limit cannot be zero"));
        }

        // count() consumes the chain, so save it for the data fetch.
        let chain = record.builder().clone();
        let total = record.count().await?;
        *record.builder_mut() = chain;

        self.apply(record);
        let data = record.find_all().await?;

        let total_pages = (total as f64 / self.limit as f64).ceil() as i64;

        Ok(Paginated { data, total, page: self.page, limit: self.limit, total_pages })
    }
}
