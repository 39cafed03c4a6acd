//! # Query Builder Module
//!
//! A fluent builder for constructing SQL queries. Predicate methods append
//! one clause each and return the builder for chaining; compilation turns the
//! accumulated state into a [`Query`], a backend-agnostic description holding
//! the SQL text (with driver-appropriate placeholders) and the ordered
//! argument values. Execution is a separate step through any
//! [`Connection`], so the same description can run on a pool or inside a
//! transaction.
//!
//! ## Example
//!
//! ```rust,ignore
//! use carafe_orm::{Drivers, Op, QueryBuilder};
//!
//! let mut builder = QueryBuilder::new();
//! builder.equals("age", 30).order_by("id DESC").limit(0, 10);
//! let query = builder.compile_select("users", Drivers::SQLite);
//! // SELECT * FROM "users" WHERE 1=1 AND "age" = ? ORDER BY id DESC LIMIT ? OFFSET ?
//! ```

use std::collections::HashMap;

use sqlx::any::AnyArguments;

use crate::database::{Connection, Drivers};
use crate::errors::Error;
use crate::value::{row_to_map, Value};

// ============================================================================
// Operators
// ============================================================================

/// A comparison operator for predicate clauses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Eq,
    NotEq,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
    NotLike,
}

impl Op {
    /// The SQL spelling of this operator.
    pub fn as_sql(self) -> &'static str {
        match self {
            Op::Eq => "=",
            Op::NotEq => "<>",
            Op::Gt => ">",
            Op::Gte => ">=",
            Op::Lt => "<",
            Op::Lte => "<=",
            Op::Like => "LIKE",
            Op::NotLike => "NOT LIKE",
        }
    }
}

// ============================================================================
// Clauses
// ============================================================================

#[derive(Debug, Clone)]
enum Clause {
    Cmp { field: String, op: Op, value: Value },
    InList { field: String, negated: bool, values: Vec<Value> },
    Null { field: String, negated: bool },
    Between { field: String, low: Value, high: Value },
    Raw(String),
}

impl Clause {
    fn compile(&self, sql: &mut String, args: &mut Vec<Value>, driver: Drivers, counter: &mut usize) {
        match self {
            Clause::Cmp { field, op, value } => {
                sql.push_str(" AND ");
                sql.push_str(&quote_ident(field));
                sql.push(' ');
                sql.push_str(op.as_sql());
                sql.push(' ');
                push_placeholder(sql, driver, counter);
                args.push(value.clone());
            }
            Clause::InList { field, negated, values } => {
                // Empty lists have no valid SQL spelling; fold to a constant.
                if values.is_empty() {
                    sql.push_str(if *negated { " AND 1=1" } else { " AND 1=0" });
                    return;
                }
                sql.push_str(" AND ");
                sql.push_str(&quote_ident(field));
                sql.push_str(if *negated { " NOT IN (" } else { " IN (" });
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        sql.push_str(", ");
                    }
                    push_placeholder(sql, driver, counter);
                    args.push(value.clone());
                }
                sql.push(')');
            }
            Clause::Null { field, negated } => {
                sql.push_str(" AND ");
                sql.push_str(&quote_ident(field));
                sql.push_str(if *negated { " IS NOT NULL" } else { " IS NULL" });
            }
            Clause::Between { field, low, high } => {
                sql.push_str(" AND ");
                sql.push_str(&quote_ident(field));
                sql.push_str(" BETWEEN ");
                push_placeholder(sql, driver, counter);
                sql.push_str(" AND ");
                push_placeholder(sql, driver, counter);
                args.push(low.clone());
                args.push(high.clone());
            }
            Clause::Raw(text) => {
                sql.push_str(" AND (");
                sql.push_str(text);
                sql.push(')');
            }
        }
    }
}

// ============================================================================
// Query Builder
// ============================================================================

/// Accumulated, not-yet-executed query state.
///
/// All mutators return `&mut Self` for chaining. The builder itself never
/// talks to the database; a terminal operation compiles it into a [`Query`]
/// and resets it.
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    select_columns: Vec<String>,
    clauses: Vec<Clause>,
    joins: Vec<(String, String)>,
    group_clause: Option<String>,
    order_clauses: Vec<String>,
    limit: Option<(usize, usize)>,
}

impl QueryBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether no state has accumulated since the last terminal operation.
    pub fn is_empty(&self) -> bool {
        self.select_columns.is_empty()
            && self.clauses.is_empty()
            && self.joins.is_empty()
            && self.group_clause.is_none()
            && self.order_clauses.is_empty()
            && self.limit.is_none()
    }

    // ========================================================================
    // Predicates
    // ========================================================================

    /// Adds a comparison clause.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// builder.filter("age", Op::Gt, 18);
    /// ```
    pub fn filter(&mut self, field: &str, op: Op, value: impl Into<Value>) -> &mut Self {
        self.clauses.push(Clause::Cmp { field: field.to_string(), op, value: value.into() });
        self
    }

    /// `field = value`
    pub fn equals(&mut self, field: &str, value: impl Into<Value>) -> &mut Self {
        self.filter(field, Op::Eq, value)
    }

    /// `field <> value`
    pub fn not_equals(&mut self, field: &str, value: impl Into<Value>) -> &mut Self {
        self.filter(field, Op::NotEq, value)
    }

    /// `field > value`
    pub fn greater_than(&mut self, field: &str, value: impl Into<Value>) -> &mut Self {
        self.filter(field, Op::Gt, value)
    }

    /// `field >= value`
    pub fn greater_or_equal(&mut self, field: &str, value: impl Into<Value>) -> &mut Self {
        self.filter(field, Op::Gte, value)
    }

    /// `field < value`
    pub fn less_than(&mut self, field: &str, value: impl Into<Value>) -> &mut Self {
        self.filter(field, Op::Lt, value)
    }

    /// `field <= value`
    pub fn less_or_equal(&mut self, field: &str, value: impl Into<Value>) -> &mut Self {
        self.filter(field, Op::Lte, value)
    }

    /// `field LIKE value`
    pub fn like(&mut self, field: &str, value: impl Into<Value>) -> &mut Self {
        self.filter(field, Op::Like, value)
    }

    /// `field NOT LIKE value`
    pub fn not_like(&mut self, field: &str, value: impl Into<Value>) -> &mut Self {
        self.filter(field, Op::NotLike, value)
    }

    /// `field IN (values...)`
    pub fn in_list<I, V>(&mut self, field: &str, values: I) -> &mut Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.clauses.push(Clause::InList {
            field: field.to_string(),
            negated: false,
            values: values.into_iter().map(Into::into).collect(),
        });
        self
    }

    /// `field NOT IN (values...)`
    pub fn not_in<I, V>(&mut self, field: &str, values: I) -> &mut Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.clauses.push(Clause::InList {
            field: field.to_string(),
            negated: true,
            values: values.into_iter().map(Into::into).collect(),
        });
        self
    }

    /// `field IS NULL`
    pub fn is_null(&mut self, field: &str) -> &mut Self {
        self.clauses.push(Clause::Null { field: field.to_string(), negated: false });
        self
    }

    /// `field IS NOT NULL`
    pub fn is_not_null(&mut self, field: &str) -> &mut Self {
        self.clauses.push(Clause::Null { field: field.to_string(), negated: true });
        self
    }

    /// `field BETWEEN low AND high`
    pub fn between(&mut self, field: &str, low: impl Into<Value>, high: impl Into<Value>) -> &mut Self {
        self.clauses.push(Clause::Between {
            field: field.to_string(),
            low: low.into(),
            high: high.into(),
        });
        self
    }

    /// Appends a raw WHERE fragment, AND-combined with the other clauses.
    ///
    /// The text is embedded into the statement as-is. Interpolating untrusted
    /// input here is an injection risk; every other predicate method binds
    /// its value as a statement parameter instead.
    pub fn where_raw(&mut self, condition: &str) -> &mut Self {
        self.clauses.push(Clause::Raw(condition.to_string()));
        self
    }

    // ========================================================================
    // Modifiers
    // ========================================================================

    /// Selects specific columns to return. By default all columns (`*`) are
    /// selected.
    pub fn select(&mut self, columns: &str) -> &mut Self {
        self.select_columns.push(columns.to_string());
        self
    }

    /// Adds a JOIN clause.
    pub fn join(&mut self, table: &str, on: &str) -> &mut Self {
        self.joins.push((table.to_string(), on.to_string()));
        self
    }

    /// Sets the GROUP BY field.
    pub fn group_by(&mut self, field: &str) -> &mut Self {
        self.group_clause = Some(field.to_string());
        self
    }

    /// Adds an ORDER BY clause (e.g. `"id DESC"`).
    pub fn order_by(&mut self, clause: &str) -> &mut Self {
        self.order_clauses.push(clause.to_string());
        self
    }

    /// Sets the offset/count pair for pagination.
    pub fn limit(&mut self, offset: usize, count: usize) -> &mut Self {
        self.limit = Some((offset, count));
        self
    }

    /// Caps the result at a single row, preserving any configured offset.
    pub(crate) fn single_row(&mut self) {
        let offset = self.limit.map_or(0, |(offset, _)| offset);
        self.limit = Some((offset, 1));
    }

    // ========================================================================
    // Compilation
    // ========================================================================

    /// Compiles the accumulated state into one SELECT description.
    pub fn compile_select(&self, table: &str, driver: Drivers) -> Query {
        let mut sql = String::from("SELECT ");
        if self.select_columns.is_empty() {
            sql.push('*');
        } else {
            sql.push_str(&self.select_columns.join(", "));
        }
        sql.push_str(" FROM ");
        sql.push_str(&quote_ident(table));

        let mut args = Vec::new();
        let mut counter = 1;
        self.compile_filters(&mut sql, &mut args, driver, &mut counter);

        if let Some(group) = &self.group_clause {
            sql.push_str(" GROUP BY ");
            sql.push_str(&quote_ident(group));
        }

        if !self.order_clauses.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&self.order_clauses.join(", "));
        }

        if let Some((offset, count)) = self.limit {
            sql.push_str(" LIMIT ");
            push_placeholder(&mut sql, driver, &mut counter);
            args.push(Value::Int(count as i64));
            sql.push_str(" OFFSET ");
            push_placeholder(&mut sql, driver, &mut counter);
            args.push(Value::Int(offset as i64));
        }

        Query { sql, args }
    }

    /// Compiles the accumulated clauses into one COUNT description.
    ///
    /// Ordering and limits do not change the count and are left out.
    pub fn compile_count(&self, table: &str, driver: Drivers) -> Query {
        let mut sql = String::from("SELECT COUNT(*) AS count FROM ");
        sql.push_str(&quote_ident(table));

        let mut args = Vec::new();
        let mut counter = 1;
        self.compile_filters(&mut sql, &mut args, driver, &mut counter);

        Query { sql, args }
    }

    fn compile_filters(
        &self,
        sql: &mut String,
        args: &mut Vec<Value>,
        driver: Drivers,
        counter: &mut usize,
    ) {
        for (join_table, on) in &self.joins {
            sql.push_str(" JOIN ");
            sql.push_str(&quote_ident(join_table));
            sql.push_str(" ON ");
            sql.push_str(on);
        }

        sql.push_str(" WHERE 1=1");
        for clause in &self.clauses {
            clause.compile(sql, args, driver, counter);
        }
    }
}

// ============================================================================
// Compiled Query
// ============================================================================

/// A compiled, backend-agnostic statement description: SQL text plus the
/// ordered argument values. Values stay typed until execution, when they are
/// bound with driver-specific formatting.
#[derive(Debug, Clone)]
pub struct Query {
    /// The SQL text with driver-appropriate placeholders.
    pub sql: String,
    /// The arguments, in placeholder order.
    pub args: Vec<Value>,
}

impl Query {
    /// Builds an INSERT description from field/value pairs.
    pub fn insert(table: &str, fields: &[(String, Value)], driver: Drivers) -> Self {
        let mut sql = String::from("INSERT INTO ");
        sql.push_str(&quote_ident(table));
        sql.push_str(" (");
        for (i, (field, _)) in fields.iter().enumerate() {
            if i > 0 {
                sql.push_str(", ");
            }
            sql.push_str(&quote_ident(field));
        }
        sql.push_str(") VALUES (");
        let mut counter = 1;
        for i in 0..fields.len() {
            if i > 0 {
                sql.push_str(", ");
            }
            push_placeholder(&mut sql, driver, &mut counter);
        }
        sql.push(')');

        Query { sql, args: fields.iter().map(|(_, value)| value.clone()).collect() }
    }

    /// Builds an UPDATE description scoped by primary key.
    pub fn update(
        table: &str,
        assignments: &[(String, Value)],
        pk: &str,
        pk_value: Value,
        driver: Drivers,
    ) -> Self {
        let mut sql = String::from("UPDATE ");
        sql.push_str(&quote_ident(table));
        sql.push_str(" SET ");
        let mut counter = 1;
        for (i, (field, _)) in assignments.iter().enumerate() {
            if i > 0 {
                sql.push_str(", ");
            }
            sql.push_str(&quote_ident(field));
            sql.push_str(" = ");
            push_placeholder(&mut sql, driver, &mut counter);
        }
        sql.push_str(" WHERE ");
        sql.push_str(&quote_ident(pk));
        sql.push_str(" = ");
        push_placeholder(&mut sql, driver, &mut counter);

        let mut args: Vec<Value> = assignments.iter().map(|(_, value)| value.clone()).collect();
        args.push(pk_value);
        Query { sql, args }
    }

    /// Builds a DELETE description scoped by primary key.
    pub fn delete(table: &str, pk: &str, pk_value: Value, driver: Drivers) -> Self {
        let mut sql = String::from("DELETE FROM ");
        sql.push_str(&quote_ident(table));
        sql.push_str(" WHERE ");
        sql.push_str(&quote_ident(pk));
        sql.push_str(" = ");
        let mut counter = 1;
        push_placeholder(&mut sql, driver, &mut counter);

        Query { sql, args: vec![pk_value] }
    }
}

// ============================================================================
// Execution
// ============================================================================

/// The outcome of a data-modifying statement.
#[derive(Debug, Clone, Copy)]
pub struct ExecResult {
    rows_affected: u64,
    last_insert_id: Option<i64>,
}

impl ExecResult {
    /// Number of rows the statement touched.
    pub fn rows_affected(&self) -> u64 {
        self.rows_affected
    }

    /// The storage-generated row id, where the driver reports one
    /// (SQLite and MySQL; PostgreSQL does not).
    pub fn last_insert_id(&self) -> Option<i64> {
        self.last_insert_id
    }
}

/// Runs a query description and decodes every row into a field → value map.
pub async fn fetch_all<C: Connection>(
    conn: &mut C,
    query: &Query,
) -> Result<Vec<HashMap<String, Value>>, Error> {
    let driver = conn.driver();
    let mut args = AnyArguments::default();
    for value in &query.args {
        value.bind(&mut args, driver)?;
    }

    log::debug!("fetch: {}", query.sql);
    let rows = sqlx::query_with::<sqlx::Any, _>(&query.sql, args).fetch_all(conn.executor()).await?;
    rows.iter().map(row_to_map).collect()
}

/// Runs a data-modifying query description.
pub async fn execute<C: Connection>(conn: &mut C, query: &Query) -> Result<ExecResult, Error> {
    let driver = conn.driver();
    let mut args = AnyArguments::default();
    for value in &query.args {
        value.bind(&mut args, driver)?;
    }

    log::debug!("execute: {}", query.sql);
    let result = sqlx::query_with::<sqlx::Any, _>(&query.sql, args).execute(conn.executor()).await?;
    Ok(ExecResult { rows_affected: result.rows_affected(), last_insert_id: result.last_insert_id() })
}

// ============================================================================
// Identifier Helpers
// ============================================================================

fn push_placeholder(sql: &mut String, driver: Drivers, counter: &mut usize) {
    match driver {
        Drivers::Postgres => {
            sql.push('$');
            sql.push_str(&counter.to_string());
            *counter += 1;
        }
        _ => sql.push('?'),
    }
}

/// Quotes an identifier, leaving expressions (`COUNT(*)`, already-quoted or
/// aliased text) untouched. Dotted paths are quoted per segment.
fn quote_ident(ident: &str) -> String {
    if ident.contains(['(', ')', '"', '*', ' ']) {
        return ident.to_string();
    }
    ident
        .split('.')
        .map(|part| format!("\"{part}\""))
        .collect::<Vec<_>>()
        .join(".")
}
