use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use carafe_orm::{
    ColumnDef, ColumnType, Database, Error, Hooks, Record, RecordConfig, TableSchema,
};

fn users_schema() -> TableSchema {
    TableSchema::new("users")
        .column(ColumnDef::new("id", ColumnType::Integer))
        .column(ColumnDef::new("name", ColumnType::Text))
}

async fn setup() -> Result<Database, Box<dyn std::error::Error>> {
    let db = Database::builder().max_connections(1).connect("sqlite::memory:").await?;
    db.migrator().register(&users_schema()).run().await?;
    Ok(db)
}

/// Records every dispatch so tests can assert ordering.
#[derive(Default)]
struct RecordingHooks {
    log: Arc<Mutex<Vec<String>>>,
}

impl RecordingHooks {
    fn push(&self, entry: impl Into<String>) {
        self.log.lock().unwrap().push(entry.into());
    }

    fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.log.lock().unwrap())
    }
}

#[async_trait]
impl Hooks for RecordingHooks {
    async fn before_find(&self, _record: &mut Record) -> Result<(), Error> {
        self.push("before_find");
        Ok(())
    }

    async fn after_find(&self, _record: &mut Record) -> Result<(), Error> {
        self.push("after_find");
        Ok(())
    }

    async fn before_find_all(&self, _record: &mut Record) -> Result<(), Error> {
        self.push("before_find_all");
        Ok(())
    }

    async fn after_find_all(&self, records: &mut [Record]) -> Result<(), Error> {
        self.push(format!("after_find_all:{}", records.len()));
        Ok(())
    }

    async fn before_insert(&self, _record: &mut Record) -> Result<(), Error> {
        self.push("before_insert");
        Ok(())
    }

    async fn after_insert(&self, record: &mut Record) -> Result<(), Error> {
        let id = record.get("id").and_then(|value| value.as_int()).unwrap_or(-1);
        self.push(format!("after_insert:{id}"));
        Ok(())
    }

    async fn before_update(&self, _record: &mut Record) -> Result<(), Error> {
        self.push("before_update");
        Ok(())
    }

    async fn after_update(&self, _record: &mut Record) -> Result<(), Error> {
        self.push("after_update");
        Ok(())
    }

    async fn before_save(&self, _record: &mut Record) -> Result<(), Error> {
        self.push("before_save");
        Ok(())
    }

    async fn after_save(&self, _record: &mut Record) -> Result<(), Error> {
        self.push("after_save");
        Ok(())
    }

    async fn before_delete(&self, _record: &mut Record) -> Result<(), Error> {
        self.push("before_delete");
        Ok(())
    }

    async fn after_delete(&self, _record: &mut Record) -> Result<(), Error> {
        self.push("after_delete");
        Ok(())
    }
}

fn recorded_record(db: &Database) -> (Record, Arc<RecordingHooks>) {
    let hooks = Arc::new(RecordingHooks::default());
    let record = Record::with_hooks(users_schema(), Some(db.clone()), hooks.clone())
        .expect("connection was supplied");
    (record, hooks)
}

#[tokio::test]
async fn test_insert_dispatch_order_and_populated_record() -> Result<(), Box<dyn std::error::Error>> {
    let db = setup().await?;
    let (mut user, hooks) = recorded_record(&db);

    user.set("name", "Bobby Tables")?;
    user.insert().await?;

    // Specific hook first, then the generic save hook. after_insert already
    // sees the captured key.
    assert_eq!(hooks.take(), vec!["before_insert", "before_save", "after_insert:1", "after_save"]);

    Ok(())
}

#[tokio::test]
async fn test_noop_update_still_dispatches() -> Result<(), Box<dyn std::error::Error>> {
    let db = setup().await?;
    let (mut user, hooks) = recorded_record(&db);

    user.set("name", "Alice")?;
    user.insert().await?;
    hooks.take();

    let affected = user.update().await?;
    assert_eq!(affected, 0);
    assert_eq!(hooks.take(), vec!["before_update", "before_save", "after_update", "after_save"]);

    Ok(())
}

#[tokio::test]
async fn test_find_dispatch_on_hit_and_miss() -> Result<(), Box<dyn std::error::Error>> {
    let db = setup().await?;
    let (mut user, hooks) = recorded_record(&db);

    user.set("name", "Alice")?;
    user.insert().await?;
    hooks.take();

    let (mut found, found_hooks) = recorded_record(&db);
    assert!(found.find_by_id(1).await?);
    assert_eq!(found_hooks.take(), vec!["before_find", "after_find"]);

    // A miss dispatches no after_find
    let (mut missing, missing_hooks) = recorded_record(&db);
    assert!(!missing.find_by_id(999).await?);
    assert_eq!(missing_hooks.take(), vec!["before_find"]);

    Ok(())
}

#[tokio::test]
async fn test_find_all_dispatches_once_with_the_list() -> Result<(), Box<dyn std::error::Error>> {
    let db = setup().await?;

    for name in ["Alice", "Bob"] {
        let mut user = db.record(&users_schema());
        user.set("name", name)?;
        user.insert().await?;
    }

    let (mut finder, hooks) = recorded_record(&db);
    let found = finder.find_all().await?;
    assert_eq!(found.len(), 2);
    assert_eq!(hooks.take(), vec!["before_find_all", "after_find_all:2"]);

    Ok(())
}

#[tokio::test]
async fn test_delete_dispatch_order() -> Result<(), Box<dyn std::error::Error>> {
    let db = setup().await?;
    let (mut user, hooks) = recorded_record(&db);

    user.set("name", "Alice")?;
    user.insert().await?;
    hooks.take();

    user.delete().await?;
    assert_eq!(hooks.take(), vec!["before_delete", "after_delete"]);

    Ok(())
}

/// Refuses every persist attempt.
struct RefusingHooks;

#[async_trait]
impl Hooks for RefusingHooks {
    async fn before_insert(&self, _record: &mut Record) -> Result<(), Error> {
        Err(Error::invalid_data("inserts are disabled"))
    }

    async fn before_delete(&self, _record: &mut Record) -> Result<(), Error> {
        Err(Error::invalid_data("deletes are disabled"))
    }
}

#[tokio::test]
async fn test_failing_before_hook_aborts_the_statement() -> Result<(), Box<dyn std::error::Error>> {
    let db = setup().await?;

    let mut user = Record::with_hooks(users_schema(), Some(db.clone()), Arc::new(RefusingHooks))?;
    user.set("name", "Blocked")?;
    assert!(matches!(user.insert().await, Err(Error::InvalidData(_))));

    // The abort happened before any statement executed
    let mut check = db.record(&users_schema());
    assert_eq!(check.count().await?, 0);

    // A delete abort leaves the row alone as well
    let mut kept = db.record(&users_schema());
    kept.set("name", "Kept")?;
    kept.insert().await?;

    let mut guarded = Record::with_hooks(users_schema(), Some(db.clone()), Arc::new(RefusingHooks))?;
    assert!(guarded.find_by_id(1).await?);
    assert!(matches!(guarded.delete().await, Err(Error::InvalidData(_))));
    assert!(!guarded.is_destroyed());

    let mut check = db.record(&users_schema());
    assert_eq!(check.count().await?, 1);

    Ok(())
}

/// Injects the connection and redirects the mapper to another table.
struct RedirectHooks {
    db: Database,
}

#[async_trait]
impl Hooks for RedirectHooks {
    fn on_construct(&self, config: &mut RecordConfig) {
        config.connection = Some(self.db.clone());
        config.table = Some("people".to_string());
        config.primary_key = Some("person_id".to_string());
    }
}

#[tokio::test]
async fn test_on_construct_injects_connection_and_overrides() -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::builder().max_connections(1).connect("sqlite::memory:").await?;

    let people = TableSchema::new("people")
        .primary_key("person_id")
        .column(ColumnDef::new("person_id", ColumnType::Integer))
        .column(ColumnDef::new("name", ColumnType::Text));
    db.migrator().register(&people).run().await?;

    // No connection passed by the caller: the hook provides everything.
    let hooks = Arc::new(RedirectHooks { db: db.clone() });
    let mut person = Record::with_hooks(users_schema(), None, hooks)?;
    assert_eq!(person.table(), "people");
    assert_eq!(person.schema().pk(), "person_id");

    person.set("name", "Redirected")?;
    person.insert().await?;
    assert!(!person.is_new());

    let mut check = db.record(&people);
    assert_eq!(check.count().await?, 1);

    Ok(())
}

#[tokio::test]
async fn test_construction_without_connection_is_an_error() -> Result<(), Box<dyn std::error::Error>> {
    let result = Record::with_hooks(users_schema(), None, Arc::new(carafe_orm::NoHooks));
    assert!(matches!(result, Err(Error::InvalidArgument(_))));
    Ok(())
}
