//! # Schema Module
//!
//! This module defines the schema descriptors the record mapper is
//! parameterized by. Where a statically typed ORM derives table metadata from
//! struct definitions, Carafe describes tables at runtime: a [`TableSchema`]
//! names the relation, its primary key, the declared columns (used for DDL),
//! and the relationships to other tables.
//!
//! ## Overview
//!
//! - [`TableSchema`]: relation name, primary key (default `"id"`), columns,
//!   relation descriptors
//! - [`ColumnDef`] / [`ColumnType`]: column metadata for table provisioning
//! - [`Relation`] / [`RelationKind`]: declarative metadata describing how
//!   one record type relates to another
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use carafe_orm::{ColumnDef, ColumnType, Op, Relation, TableSchema};
//!
//! let contacts = TableSchema::new("contacts")
//!     .column(ColumnDef::new("id", ColumnType::Integer))
//!     .column(ColumnDef::new("user_id", ColumnType::Integer).index())
//!     .column(ColumnDef::new("email", ColumnType::Varchar(100)).unique());
//!
//! let users = TableSchema::new("users")
//!     .column(ColumnDef::new("id", ColumnType::Integer))
//!     .column(ColumnDef::new("name", ColumnType::Text))
//!     .relation("contacts", Relation::has_many(contacts.clone(), "user_id").backref("user"));
//! ```

use std::collections::HashMap;

use crate::query_builder::Op;
use crate::value::Value;

// ============================================================================
// Column Metadata
// ============================================================================

/// The storage type of a declared column.
///
/// Only used when provisioning tables; attribute values themselves are
/// dynamically typed (see [`crate::value::Value`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    /// 32-bit integer storage.
    Integer,
    /// 64-bit integer storage.
    BigInt,
    /// Boolean storage.
    Boolean,
    /// Double-precision floating point storage.
    Double,
    /// Unbounded text storage.
    Text,
    /// Bounded text storage.
    Varchar(u16),
    /// UUID storage, textual on drivers without a native type.
    Uuid,
    /// Timestamp-with-zone storage.
    Timestamp,
    /// Date storage.
    Date,
    /// Time storage.
    Time,
    /// Binary storage.
    Blob,
}

impl ColumnType {
    /// The SQL type string for a driver.
    pub fn sql_type(self, driver: crate::database::Drivers) -> String {
        use crate::database::Drivers;
        match self {
            ColumnType::Integer => "INTEGER".to_string(),
            ColumnType::BigInt => "BIGINT".to_string(),
            ColumnType::Boolean => "BOOLEAN".to_string(),
            ColumnType::Double => "DOUBLE PRECISION".to_string(),
            ColumnType::Text => "TEXT".to_string(),
            ColumnType::Varchar(size) => format!("VARCHAR({size})"),
            ColumnType::Uuid => match driver {
                Drivers::Postgres => "UUID",
                Drivers::MySQL => "CHAR(36)",
                Drivers::SQLite => "TEXT",
            }
            .to_string(),
            ColumnType::Timestamp => match driver {
                Drivers::Postgres => "TIMESTAMPTZ",
                Drivers::MySQL => "DATETIME(6)",
                Drivers::SQLite => "TEXT",
            }
            .to_string(),
            ColumnType::Date => "DATE".to_string(),
            ColumnType::Time => "TIME".to_string(),
            ColumnType::Blob => match driver {
                Drivers::Postgres => "BYTEA",
                _ => "BLOB",
            }
            .to_string(),
        }
    }
}

/// Metadata about one declared column.
///
/// Carries what table provisioning needs: the name, storage type, and the
/// NOT NULL / UNIQUE / index flags.
#[derive(Debug, Clone)]
pub struct ColumnDef {
    name: String,
    column_type: ColumnType,
    nullable: bool,
    unique: bool,
    index: bool,
}

impl ColumnDef {
    /// Creates a non-nullable column with no constraints.
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self { name: name.into(), column_type, nullable: false, unique: false, index: false }
    }

    /// Allows NULL values in this column.
    #[must_use]
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Adds a UNIQUE constraint.
    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Creates an index on this column.
    #[must_use]
    pub fn index(mut self) -> Self {
        self.index = true;
        self
    }

    /// The column name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The storage type.
    pub fn column_type(&self) -> ColumnType {
        self.column_type
    }

    /// Whether NULL values are allowed.
    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// Whether a UNIQUE constraint applies.
    pub fn is_unique(&self) -> bool {
        self.unique
    }

    /// Whether an index should be created.
    pub fn has_index(&self) -> bool {
        self.index
    }
}

// ============================================================================
// Relation Descriptors
// ============================================================================

/// The kind of relationship between two record types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    /// One related row on the target table, keyed by a column on the target.
    HasOne,
    /// Many related rows on the target table, keyed by a column on the target.
    HasMany,
    /// The owning row on the target table, keyed by a column on this table.
    BelongsTo,
}

/// Declarative metadata describing how one record type relates to another.
///
/// For `HasOne`/`HasMany` the key names the foreign-key column **on the
/// target** table; for `BelongsTo` it names the foreign-key field **on the
/// owning** record. Extra constraints are applied to the target query before
/// the join filter. A back-reference name makes the resolver plant the
/// originating record in the relation cache of every resolved record, so the
/// inverse direction never issues a second query.
#[derive(Debug, Clone)]
pub struct Relation {
    kind: RelationKind,
    target: TableSchema,
    key: String,
    constraints: Vec<(String, Op, Value)>,
    backref: Option<String>,
}

impl Relation {
    fn new(kind: RelationKind, target: TableSchema, key: impl Into<String>) -> Self {
        Self { kind, target, key: key.into(), constraints: Vec::new(), backref: None }
    }

    /// A single related row, keyed by `key` on `target`.
    pub fn has_one(target: TableSchema, key: impl Into<String>) -> Self {
        Self::new(RelationKind::HasOne, target, key)
    }

    /// All related rows, keyed by `key` on `target`.
    pub fn has_many(target: TableSchema, key: impl Into<String>) -> Self {
        Self::new(RelationKind::HasMany, target, key)
    }

    /// The owning row on `target`, referenced by the local field `key`.
    pub fn belongs_to(target: TableSchema, key: impl Into<String>) -> Self {
        Self::new(RelationKind::BelongsTo, target, key)
    }

    /// Adds an extra constraint applied before the join filter.
    #[must_use]
    pub fn constraint(mut self, field: impl Into<String>, op: Op, value: impl Into<Value>) -> Self {
        self.constraints.push((field.into(), op, value.into()));
        self
    }

    /// Sets the back-reference name planted on resolved records.
    #[must_use]
    pub fn backref(mut self, name: impl Into<String>) -> Self {
        self.backref = Some(name.into());
        self
    }

    /// The relationship kind.
    pub fn kind(&self) -> RelationKind {
        self.kind
    }

    /// The target table schema.
    pub fn target(&self) -> &TableSchema {
        &self.target
    }

    /// The join key column.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The extra constraints.
    pub fn constraints(&self) -> &[(String, Op, Value)] {
        &self.constraints
    }

    /// The configured back-reference name, if any.
    pub fn backref_name(&self) -> Option<&str> {
        self.backref.as_deref()
    }
}

// ============================================================================
// Table Schema
// ============================================================================

/// Describes one mapped relation: its name, primary key, declared columns,
/// and relationships.
///
/// Schemas are plain values; clone them freely. A [`crate::record::Record`]
/// owns a copy so that per-instance overrides (from the `on_construct` hook)
/// never leak into other mappers.
#[derive(Debug, Clone)]
pub struct TableSchema {
    table: String,
    primary_key: String,
    columns: Vec<ColumnDef>,
    relations: HashMap<String, Relation>,
}

impl TableSchema {
    /// Creates a schema for `table` with the default primary key `"id"`.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            primary_key: "id".to_string(),
            columns: Vec::new(),
            relations: HashMap::new(),
        }
    }

    /// Overrides the primary key column name.
    #[must_use]
    pub fn primary_key(mut self, key: impl Into<String>) -> Self {
        self.primary_key = key.into();
        self
    }

    /// Declares a column (used for table provisioning).
    #[must_use]
    pub fn column(mut self, column: ColumnDef) -> Self {
        self.columns.push(column);
        self
    }

    /// Declares a named relation.
    #[must_use]
    pub fn relation(mut self, name: impl Into<String>, relation: Relation) -> Self {
        self.relations.insert(name.into(), relation);
        self
    }

    /// The relation (table) name.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// The primary key column name.
    pub fn pk(&self) -> &str {
        &self.primary_key
    }

    /// The declared columns.
    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    /// Looks up a relation descriptor by name.
    pub fn find_relation(&self, name: &str) -> Option<&Relation> {
        self.relations.get(name)
    }

    pub(crate) fn set_table(&mut self, table: String) {
        self.table = table;
    }

    pub(crate) fn set_primary_key(&mut self, key: String) {
        self.primary_key = key;
    }
}

// ============================================================================
// Tests
// ============================================================================
