//! # Record Module
//!
//! This module defines the record mapper itself: one [`Record`] pairs one row
//! of a named relation with an in-memory object. It owns the attribute maps
//! (current and last-persisted values), the explicit dirty set, the relation
//! cache, the pending query-builder state, and the hook-set to dispatch into.
//!
//! ## Lifecycle
//!
//! A record is created transient, becomes persisted through `insert()` or a
//! `find` hit, is mutated through `set()` (which maintains the dirty set),
//! and is destroyed through `delete()`, after which the instance is stale.
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use carafe_orm::{Database, TableSchema};
//!
//! let mut user = db.record(&users_schema);
//! user.set("name", "Alice")?;
//! user.insert().await?;                       // key captured, dirty set empty
//!
//! user.set("name", "Alicia")?;
//! user.update().await?;                       // only the dirty field is written
//!
//! let adults = db
//!     .record(&users_schema)
//!     .greater_or_equal("age", 18)
//!     .order_by("name ASC")
//!     .limit(0, 20)
//!     .find_all()
//!     .await?;
//! ```
//!
//! ## Dirty Tracking
//!
//! The dirty set is exactly the fields whose current value differs from the
//! last-persisted value, maintained on every `set()`: assigning a field back
//! to its original value removes it from the set. `fill()` bulk-assigns and
//! force-marks its keys instead, and `clear_dirty()` discards the
//! bookkeeping without reverting any value. `update()` writes only dirty
//! fields; every successful persist resets the original map to the current
//! values.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::database::Database;
use crate::errors::Error;
use crate::hooks::{Hooks, NoHooks, RecordConfig};
use crate::query_builder::{self, Op, Query, QueryBuilder};
use crate::schema::{Relation, RelationKind, TableSchema};
use crate::value::Value;

// ============================================================================
// Relation Values
// ============================================================================

/// A resolved relationship: a single optional record or a list.
#[derive(Debug, Clone)]
pub enum RelationValue {
    /// `HasOne`/`BelongsTo` result.
    One(Option<Box<Record>>),
    /// `HasMany` result.
    Many(Vec<Record>),
}

impl RelationValue {
    /// The single related record, if resolved to one.
    pub fn one(&self) -> Option<&Record> {
        match self {
            RelationValue::One(Some(record)) => Some(record),
            _ => None,
        }
    }

    /// Consumes the value, yielding the single related record.
    pub fn into_one(self) -> Option<Record> {
        match self {
            RelationValue::One(Some(record)) => Some(*record),
            _ => None,
        }
    }

    /// The related records of a `HasMany` resolution.
    pub fn many(&self) -> &[Record] {
        match self {
            RelationValue::Many(records) => records,
            RelationValue::One(_) => &[],
        }
    }

    /// Consumes the value, yielding the related records as a list.
    pub fn into_many(self) -> Vec<Record> {
        match self {
            RelationValue::Many(records) => records,
            RelationValue::One(Some(record)) => vec![*record],
            RelationValue::One(None) => Vec::new(),
        }
    }
}

// ============================================================================
// Record
// ============================================================================

/// One mapped row/object pair.
///
/// Built from a [`TableSchema`] plus an injected [`Database`] connection and
/// an optional hook-set. A record is also its own query entry point: the
/// fluent predicate methods accumulate builder state that the next terminal
/// operation (`find`, `find_all`, `count`, `insert`, `update`, `delete`)
/// compiles, executes, and resets.
#[derive(Clone)]
pub struct Record {
    schema: TableSchema,
    db: Database,
    hooks: Arc<dyn Hooks>,
    attrs: HashMap<String, Value>,
    original: HashMap<String, Value>,
    custom: HashMap<String, Value>,
    dirty: HashSet<String>,
    relations: HashMap<String, RelationValue>,
    state: QueryBuilder,
    destroyed: bool,
}

impl Record {
    // ========================================================================
    // Construction
    // ========================================================================

    /// Creates a transient record with the default (no-op) hook-set.
    pub fn new(schema: TableSchema, db: Database) -> Self {
        Self::assemble(schema, db, Arc::new(NoHooks))
    }

    /// Creates a transient record with a hook-set.
    ///
    /// The hook-set's `on_construct` runs against a mutable [`RecordConfig`]
    /// before assembly completes, so it may inject the connection (when the
    /// caller passed `None`) or override the table name and primary key.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let audited = Record::with_hooks(schema.clone(), Some(db.clone()), Arc::new(AuditHooks))?;
    /// ```
    pub fn with_hooks(
        schema: TableSchema,
        db: Option<Database>,
        hooks: Arc<dyn Hooks>,
    ) -> Result<Self, Error> {
        let mut config = RecordConfig { connection: db, table: None, primary_key: None };
        hooks.on_construct(&mut config);

        let db = config
            .connection
            .take()
            .ok_or_else(|| Error::invalid_argument("record assembled without a storage connection"))?;

        let mut schema = schema;
        if let Some(table) = config.table.take() {
            schema.set_table(table);
        }
        if let Some(key) = config.primary_key.take() {
            schema.set_primary_key(key);
        }

        Ok(Self::assemble(schema, db, hooks))
    }

    fn assemble(schema: TableSchema, db: Database, hooks: Arc<dyn Hooks>) -> Self {
        Self {
            schema,
            db,
            hooks,
            attrs: HashMap::new(),
            original: HashMap::new(),
            custom: HashMap::new(),
            dirty: HashSet::new(),
            relations: HashMap::new(),
            state: QueryBuilder::new(),
            destroyed: false,
        }
    }

    /// A fresh transient record sharing this record's schema, connection and
    /// hook-set. `find_all` builds its results this way.
    fn sibling(&self) -> Record {
        Self::assemble(self.schema.clone(), self.db.clone(), Arc::clone(&self.hooks))
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    /// The schema this record is bound to.
    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    /// The relation (table) name.
    pub fn table(&self) -> &str {
        self.schema.table()
    }

    /// Whether this record has no persisted primary key value yet.
    pub fn is_new(&self) -> bool {
        !matches!(self.original.get(self.schema.pk()), Some(value) if !value.is_null())
    }

    /// Whether `delete()` already ran on this instance.
    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// The current attribute map.
    pub fn attributes(&self) -> &HashMap<String, Value> {
        &self.attrs
    }

    /// The fields changed since the last persist, sorted by name.
    pub fn dirty_fields(&self) -> Vec<&str> {
        let mut fields: Vec<&str> = self.dirty.iter().map(String::as_str).collect();
        fields.sort_unstable();
        fields
    }

    /// Whether a specific field is marked dirty.
    pub fn is_dirty(&self, field: &str) -> bool {
        self.dirty.contains(field)
    }

    /// The pending (not yet executed) builder state.
    pub fn builder(&self) -> &QueryBuilder {
        &self.state
    }

    pub(crate) fn builder_mut(&mut self) -> &mut QueryBuilder {
        &mut self.state
    }

    fn ensure_live(&self) -> Result<(), Error> {
        if self.destroyed {
            return Err(Error::Stale(self.schema.table().to_string()));
        }
        Ok(())
    }

    // ========================================================================
    // Attribute Access
    // ========================================================================

    /// Reads a field: custom values take precedence, then raw attributes.
    ///
    /// Relations are read through [`Record::related`], which resolves lazily.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.custom.get(field).or_else(|| self.attrs.get(field))
    }

    /// Writes a field and maintains the dirty set: the field is dirty
    /// exactly while its value differs from the last-persisted one.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) -> Result<(), Error> {
        self.ensure_live()?;
        let field = field.into();
        let value = value.into();

        match self.original.get(&field) {
            Some(original) if *original == value => {
                self.dirty.remove(&field);
            }
            _ => {
                self.dirty.insert(field.clone());
            }
        }
        self.attrs.insert(field, value);
        Ok(())
    }

    /// Stores a non-persisted computed value. Custom values are never written
    /// to storage and never mark the record dirty.
    pub fn set_custom(&mut self, field: impl Into<String>, value: impl Into<Value>) -> Result<(), Error> {
        self.ensure_live()?;
        self.custom.insert(field.into(), value.into());
        Ok(())
    }

    /// Discards the dirty bookkeeping without reverting any value.
    pub fn clear_dirty(&mut self) {
        self.dirty.clear();
    }

    /// Bulk-assigns values and marks exactly those fields dirty, replacing
    /// whatever was dirty before. Supports assign-then-persist flows where
    /// the caller knows what must be written.
    pub fn fill<I, K, V>(&mut self, values: I) -> Result<(), Error>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.ensure_live()?;
        self.dirty.clear();
        for (field, value) in values {
            let field = field.into();
            self.attrs.insert(field.clone(), value.into());
            self.dirty.insert(field);
        }
        Ok(())
    }

    /// Replaces this record's content with a fetched row.
    fn load_row(&mut self, row: HashMap<String, Value>) {
        self.attrs = row;
        self.original = self.attrs.clone();
        self.dirty.clear();
        self.relations.clear();
    }

    fn persisted_pk(&self) -> Result<Value, Error> {
        match self.original.get(self.schema.pk()) {
            Some(value) if !value.is_null() => Ok(value.clone()),
            _ => Err(Error::NotPersisted(self.schema.table().to_string())),
        }
    }

    // ========================================================================
    // Fluent Builder Surface
    // ========================================================================

    /// Adds a comparison clause to the pending chain.
    pub fn filter(&mut self, field: &str, op: Op, value: impl Into<Value>) -> &mut Self {
        self.state.filter(field, op, value);
        self
    }

    /// `field = value`
    pub fn equals(&mut self, field: &str, value: impl Into<Value>) -> &mut Self {
        self.state.equals(field, value);
        self
    }

    /// `field <> value`
    pub fn not_equals(&mut self, field: &str, value: impl Into<Value>) -> &mut Self {
        self.state.not_equals(field, value);
        self
    }

    /// `field > value`
    pub fn greater_than(&mut self, field: &str, value: impl Into<Value>) -> &mut Self {
        self.state.greater_than(field, value);
        self
    }

    /// `field >= value`
    pub fn greater_or_equal(&mut self, field: &str, value: impl Into<Value>) -> &mut Self {
        self.state.greater_or_equal(field, value);
        self
    }

    /// `field < value`
    pub fn less_than(&mut self, field: &str, value: impl Into<Value>) -> &mut Self {
        self.state.less_than(field, value);
        self
    }

    /// `field <= value`
    pub fn less_or_equal(&mut self, field: &str, value: impl Into<Value>) -> &mut Self {
        self.state.less_or_equal(field, value);
        self
    }

    /// `field LIKE value`
    pub fn like(&mut self, field: &str, value: impl Into<Value>) -> &mut Self {
        self.state.like(field, value);
        self
    }

    /// `field NOT LIKE value`
    pub fn not_like(&mut self, field: &str, value: impl Into<Value>) -> &mut Self {
        self.state.not_like(field, value);
        self
    }

    /// `field IN (values...)`
    pub fn in_list<I, V>(&mut self, field: &str, values: I) -> &mut Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.state.in_list(field, values);
        self
    }

    /// `field NOT IN (values...)`
    pub fn not_in<I, V>(&mut self, field: &str, values: I) -> &mut Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.state.not_in(field, values);
        self
    }

    /// `field IS NULL`
    pub fn is_null(&mut self, field: &str) -> &mut Self {
        self.state.is_null(field);
        self
    }

    /// `field IS NOT NULL`
    pub fn is_not_null(&mut self, field: &str) -> &mut Self {
        self.state.is_not_null(field);
        self
    }

    /// `field BETWEEN low AND high`
    pub fn between(&mut self, field: &str, low: impl Into<Value>, high: impl Into<Value>) -> &mut Self {
        self.state.between(field, low, high);
        self
    }

    /// Appends a raw WHERE fragment. See [`QueryBuilder::where_raw`] for the
    /// injection caveat.
    pub fn where_raw(&mut self, condition: &str) -> &mut Self {
        self.state.where_raw(condition);
        self
    }

    /// Selects specific columns for the next find.
    pub fn select(&mut self, columns: &str) -> &mut Self {
        self.state.select(columns);
        self
    }

    /// Adds a JOIN clause to the next find.
    pub fn join(&mut self, table: &str, on: &str) -> &mut Self {
        self.state.join(table, on);
        self
    }

    /// Sets the GROUP BY field for the next find.
    pub fn group_by(&mut self, field: &str) -> &mut Self {
        self.state.group_by(field);
        self
    }

    /// Adds an ORDER BY clause for the next find.
    pub fn order_by(&mut self, clause: &str) -> &mut Self {
        self.state.order_by(clause);
        self
    }

    /// Sets the offset/count pair for the next find.
    pub fn limit(&mut self, offset: usize, count: usize) -> &mut Self {
        self.state.limit(offset, count);
        self
    }

    // ========================================================================
    // Terminal Operations
    // ========================================================================

    /// Fetches one row matching the pending chain into this record.
    ///
    /// Dispatches `before_find`, executes a single-row query, and on a hit
    /// populates the attribute maps, dispatches `after_find` and returns
    /// `true`. A miss leaves the record untouched and returns `false`; it is
    /// not an error. The pending chain is consumed either way.
    pub async fn find(&mut self) -> Result<bool, Error> {
        self.ensure_live()?;
        let mut state = std::mem::take(&mut self.state);
        state.single_row();

        let hooks = Arc::clone(&self.hooks);
        hooks.before_find(self).await?;

        let query = state.compile_select(self.schema.table(), self.db.driver());
        let mut conn = self.db.clone();
        let mut rows = query_builder::fetch_all(&mut conn, &query).await?;

        match rows.pop() {
            Some(row) => {
                self.load_row(row);
                hooks.after_find(self).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Fetches the row with the given primary key value.
    ///
    /// Adds an implicit primary-key equality clause and delegates to
    /// [`Record::find`].
    pub async fn find_by_id(&mut self, id: impl Into<Value>) -> Result<bool, Error> {
        self.ensure_live()?;
        let pk = self.schema.pk().to_string();
        self.state.equals(&pk, id.into());
        self.find().await
    }

    /// Fetches every row matching the pending chain.
    ///
    /// Dispatches `before_find_all`, builds one record per returned row
    /// (sharing this record's schema, connection and hook-set), dispatches
    /// `after_find_all` once with the whole list, and returns it. Row order
    /// is storage order unless an `order_by` was set.
    pub async fn find_all(&mut self) -> Result<Vec<Record>, Error> {
        self.ensure_live()?;
        let state = std::mem::take(&mut self.state);

        let hooks = Arc::clone(&self.hooks);
        hooks.before_find_all(self).await?;

        let query = state.compile_select(self.schema.table(), self.db.driver());
        let mut conn = self.db.clone();
        let rows = query_builder::fetch_all(&mut conn, &query).await?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let mut record = self.sibling();
            record.load_row(row);
            records.push(record);
        }

        hooks.after_find_all(&mut records).await?;
        Ok(records)
    }

    /// Counts the rows matching the pending chain.
    pub async fn count(&mut self) -> Result<i64, Error> {
        self.ensure_live()?;
        let state = std::mem::take(&mut self.state);

        let query = state.compile_count(self.schema.table(), self.db.driver());
        let mut conn = self.db.clone();
        let rows = query_builder::fetch_all(&mut conn, &query).await?;

        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| Error::invalid_data("count query returned no rows"))?;
        row.get("count")
            .and_then(|value| value.as_int())
            .or_else(|| row.values().find_map(|value| value.as_int()))
            .ok_or_else(|| Error::conversion("count column was not an integer"))
    }

    /// Inserts this record as a new row.
    ///
    /// Dispatches `before_insert` and `before_save`, builds an insert from
    /// all current non-null attributes (a validation error when none are
    /// set), executes it, captures a storage-generated primary key when the
    /// caller did not supply one, resets dirty tracking, and dispatches
    /// `after_insert` and `after_save`.
    ///
    /// Inserting the same instance twice replays all current attributes,
    /// including a captured key; the storage's duplicate-key error surfaces
    /// unchanged. Assign a fresh key first to create a second row.
    pub async fn insert(&mut self) -> Result<(), Error> {
        self.ensure_live()?;
        self.state = QueryBuilder::new();

        let hooks = Arc::clone(&self.hooks);
        hooks.before_insert(self).await?;
        hooks.before_save(self).await?;

        let mut fields: Vec<(String, Value)> = self
            .attrs
            .iter()
            .filter(|(_, value)| !value.is_null())
            .map(|(field, value)| (field.clone(), value.clone()))
            .collect();
        if fields.is_empty() {
            return Err(Error::invalid_data("insert with no attributes set"));
        }
        fields.sort_by(|a, b| a.0.cmp(&b.0));

        let query = Query::insert(self.schema.table(), &fields, self.db.driver());
        let mut conn = self.db.clone();
        let result = query_builder::execute(&mut conn, &query).await?;

        let pk = self.schema.pk().to_string();
        if self.attrs.get(&pk).map_or(true, Value::is_null) {
            if let Some(id) = result.last_insert_id() {
                self.attrs.insert(pk, Value::Int(id));
            }
        }

        self.original = self.attrs.clone();
        self.dirty.clear();

        hooks.after_insert(self).await?;
        hooks.after_save(self).await?;
        Ok(())
    }

    /// Writes the dirty fields of this record back to its row.
    ///
    /// A misuse error on a never-persisted record. Dispatches `before_update`
    /// and `before_save`; with an empty dirty set no statement runs but
    /// `after_update` and `after_save` still fire. Otherwise compiles an
    /// update scoped by the persisted primary key containing only the dirty
    /// fields, executes it, and resets dirty tracking. Returns the number of
    /// rows the statement touched.
    pub async fn update(&mut self) -> Result<u64, Error> {
        self.ensure_live()?;
        self.state = QueryBuilder::new();
        let pk_value = self.persisted_pk()?;

        let hooks = Arc::clone(&self.hooks);
        hooks.before_update(self).await?;
        hooks.before_save(self).await?;

        let affected = if self.dirty.is_empty() {
            0
        } else {
            let mut assignments: Vec<(String, Value)> = self
                .dirty
                .iter()
                .map(|field| (field.clone(), self.attrs.get(field).cloned().unwrap_or(Value::Null)))
                .collect();
            assignments.sort_by(|a, b| a.0.cmp(&b.0));

            let pk = self.schema.pk().to_string();
            let query =
                Query::update(self.schema.table(), &assignments, &pk, pk_value, self.db.driver());
            let mut conn = self.db.clone();
            let affected = query_builder::execute(&mut conn, &query).await?.rows_affected();

            self.original = self.attrs.clone();
            self.dirty.clear();
            affected
        };

        hooks.after_update(self).await?;
        hooks.after_save(self).await?;
        Ok(affected)
    }

    /// Removes this record's row and marks the instance stale.
    ///
    /// Dispatches `before_delete`, compiles a delete scoped by the persisted
    /// primary key, executes it, dispatches `after_delete`, then clears the
    /// attribute maps and flags the instance destroyed. Any later mutation or
    /// terminal call is a misuse error.
    pub async fn delete(&mut self) -> Result<u64, Error> {
        self.ensure_live()?;
        self.state = QueryBuilder::new();
        let pk_value = self.persisted_pk()?;

        let hooks = Arc::clone(&self.hooks);
        hooks.before_delete(self).await?;

        let pk = self.schema.pk().to_string();
        let query = Query::delete(self.schema.table(), &pk, pk_value, self.db.driver());
        let mut conn = self.db.clone();
        let affected = query_builder::execute(&mut conn, &query).await?.rows_affected();

        hooks.after_delete(self).await?;

        self.attrs.clear();
        self.original.clear();
        self.custom.clear();
        self.relations.clear();
        self.dirty.clear();
        self.destroyed = true;
        Ok(affected)
    }

    // ========================================================================
    // Relationship Resolution
    // ========================================================================

    /// Resolves a declared relation, lazily on first access.
    ///
    /// The result is cached on this instance; repeated access returns the
    /// cached resolution without touching storage. Back-references planted by
    /// an inverse resolution satisfy this cache as well, so configured
    /// round-trips (`contact.user.contact`) never re-query.
    pub async fn related(&mut self, name: &str) -> Result<RelationValue, Error> {
        self.ensure_live()?;
        if let Some(cached) = self.relations.get(name) {
            return Ok(cached.clone());
        }

        let relation = self
            .schema
            .find_relation(name)
            .ok_or_else(|| Error::UnknownRelation(name.to_string()))?
            .clone();
        let resolved = self.resolve_relation(&relation).await?;
        self.relations.insert(name.to_string(), resolved.clone());
        Ok(resolved)
    }

    /// The cached resolution of a relation, if any, without querying.
    pub fn relation_cached(&self, name: &str) -> Option<&RelationValue> {
        self.relations.get(name)
    }

    async fn resolve_relation(&mut self, relation: &Relation) -> Result<RelationValue, Error> {
        let mut target = Record::new(relation.target().clone(), self.db.clone());
        for (field, op, value) in relation.constraints() {
            target.filter(field, *op, value.clone());
        }

        match relation.kind() {
            RelationKind::HasMany => {
                target.equals(relation.key(), self.persisted_pk()?);
                let mut records = target.find_all().await?;
                if let Some(backref) = relation.backref_name() {
                    let origin = self.backref_clone();
                    for record in &mut records {
                        record.attach(backref, origin.clone());
                    }
                }
                Ok(RelationValue::Many(records))
            }
            RelationKind::HasOne => {
                target.equals(relation.key(), self.persisted_pk()?);
                if target.find().await? {
                    if let Some(backref) = relation.backref_name() {
                        target.attach(backref, self.backref_clone());
                    }
                    Ok(RelationValue::One(Some(Box::new(target))))
                } else {
                    Ok(RelationValue::One(None))
                }
            }
            RelationKind::BelongsTo => {
                let foreign = match self.attrs.get(relation.key()) {
                    Some(value) if !value.is_null() => value.clone(),
                    _ => return Ok(RelationValue::One(None)),
                };
                let target_pk = relation.target().pk().to_string();
                target.equals(&target_pk, foreign);
                if target.find().await? {
                    if let Some(backref) = relation.backref_name() {
                        target.attach(backref, self.backref_clone());
                    }
                    Ok(RelationValue::One(Some(Box::new(target))))
                } else {
                    Ok(RelationValue::One(None))
                }
            }
        }
    }

    /// A clone suitable for planting as a back-reference: same content, no
    /// relation cache (prevents reference cycles) and no pending chain.
    fn backref_clone(&self) -> Record {
        let mut clone = self.clone();
        clone.relations.clear();
        clone.state = QueryBuilder::new();
        clone
    }

    fn attach(&mut self, name: &str, origin: Record) {
        self.relations.insert(name.to_string(), RelationValue::One(Some(Box::new(origin))));
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("table", &self.schema.table())
            .field("attrs", &self.attrs)
            .field("dirty", &self.dirty)
            .field("new", &self.is_new())
            .field("destroyed", &self.destroyed)
            .finish_non_exhaustive()
    }
}

/// Serializes the current attributes (custom values included, attributes
/// first) as one JSON object, with keys in sorted order.
impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.attrs.len() + self.custom.len()))?;

        let mut keys: Vec<&String> = self.attrs.keys().collect();
        keys.sort_unstable();
        for key in keys {
            map.serialize_entry(key, &self.attrs[key])?;
        }

        let mut custom_keys: Vec<&String> = self.custom.keys().collect();
        custom_keys.sort_unstable();
        for key in custom_keys {
            map.serialize_entry(key, &self.custom[key])?;
        }

        map.end()
    }
}
