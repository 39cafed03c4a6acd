use carafe_orm::{ColumnDef, ColumnType, Database, Record, TableSchema, Value};

fn users_schema() -> TableSchema {
    TableSchema::new("users")
        .column(ColumnDef::new("id", ColumnType::Integer))
        .column(ColumnDef::new("name", ColumnType::Text))
        .column(ColumnDef::new("age", ColumnType::Integer).nullable())
}

async fn persisted_user(db: &Database) -> Result<Record, Box<dyn std::error::Error>> {
    let mut user = db.record(&users_schema());
    user.set("name", "Alice")?;
    user.set("age", 30)?;
    user.insert().await?;
    Ok(user)
}

#[tokio::test]
async fn test_assignments_track_dirty_exactly() -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::builder().max_connections(1).connect("sqlite::memory:").await?;
    db.migrator().register(&users_schema()).run().await?;

    let mut user = persisted_user(&db).await?;
    assert!(user.dirty_fields().is_empty());

    // 1. Changing a field marks it dirty
    user.set("name", "Alicia")?;
    assert_eq!(user.dirty_fields(), vec!["name"]);

    // 2. A second change accumulates
    user.set("age", 31)?;
    assert_eq!(user.dirty_fields(), vec!["age", "name"]);

    // 3. Assigning the original value back removes the field from the set
    user.set("name", "Alice")?;
    assert_eq!(user.dirty_fields(), vec!["age"]);
    user.set("age", 30)?;
    assert!(user.dirty_fields().is_empty());

    Ok(())
}

#[tokio::test]
async fn test_update_resets_dirty_and_original() -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::builder().max_connections(1).connect("sqlite::memory:").await?;
    db.migrator().register(&users_schema()).run().await?;

    let mut user = persisted_user(&db).await?;
    user.set("name", "Alicia")?;
    assert!(user.is_dirty("name"));

    let affected = user.update().await?;
    assert_eq!(affected, 1);
    assert!(user.dirty_fields().is_empty());

    // Setting the just-persisted value again must be a no-op for the set,
    // proving original was resynced to current.
    user.set("name", "Alicia")?;
    assert!(user.dirty_fields().is_empty());

    Ok(())
}

#[tokio::test]
async fn test_clear_dirty_keeps_values() -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::builder().max_connections(1).connect("sqlite::memory:").await?;
    db.migrator().register(&users_schema()).run().await?;

    let mut user = persisted_user(&db).await?;
    user.set("name", "Alicia")?;
    user.clear_dirty();

    assert!(user.dirty_fields().is_empty());
    assert_eq!(user.get("name"), Some(&Value::Text("Alicia".to_string())));

    // With the bookkeeping discarded, update writes nothing.
    let affected = user.update().await?;
    assert_eq!(affected, 0);

    Ok(())
}

#[tokio::test]
async fn test_fill_marks_exactly_given_fields() -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::builder().max_connections(1).connect("sqlite::memory:").await?;
    db.migrator().register(&users_schema()).run().await?;

    let mut user = persisted_user(&db).await?;
    user.set("name", "Alicia")?;
    assert_eq!(user.dirty_fields(), vec!["name"]);

    // fill replaces the prior dirty state entirely, and force-marks its
    // fields even when a value matches the original.
    user.fill([("age", Value::Int(30)), ("name", Value::Text("Alice".to_string()))])?;
    assert_eq!(user.dirty_fields(), vec!["age", "name"]);
    assert_eq!(user.get("age"), Some(&Value::Int(30)));
    assert_eq!(user.get("name"), Some(&Value::Text("Alice".to_string())));

    Ok(())
}

#[tokio::test]
async fn test_custom_values_shadow_attributes_and_stay_clean() -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::builder().max_connections(1).connect("sqlite::memory:").await?;
    db.migrator().register(&users_schema()).run().await?;

    let mut user = persisted_user(&db).await?;
    user.set_custom("name", "display override")?;

    assert_eq!(user.get("name"), Some(&Value::Text("display override".to_string())));
    assert!(user.dirty_fields().is_empty());

    Ok(())
}
