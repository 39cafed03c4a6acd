use carafe_orm::{ColumnDef, ColumnType, Database, Error, TableSchema, Value};

fn users_schema() -> TableSchema {
    TableSchema::new("users")
        .column(ColumnDef::new("id", ColumnType::Integer))
        .column(ColumnDef::new("name", ColumnType::Text))
        .column(ColumnDef::new("age", ColumnType::Integer).nullable())
}

async fn setup() -> Result<Database, Box<dyn std::error::Error>> {
    let db = Database::builder().max_connections(1).connect("sqlite::memory:").await?;
    db.migrator().register(&users_schema()).run().await?;
    Ok(db)
}

#[tokio::test]
async fn test_insert_captures_generated_key() -> Result<(), Box<dyn std::error::Error>> {
    let db = setup().await?;

    // 1. Insert into the empty table without supplying a key
    let mut user = db.record(&users_schema());
    user.set("name", "Bobby Tables")?;
    user.insert().await?;

    // 2. The generated key is captured and the record is clean and persisted
    assert_eq!(user.get("id"), Some(&Value::Int(1)));
    assert!(user.dirty_fields().is_empty());
    assert!(!user.is_new());

    // 3. The row is really there
    let mut fetched = db.record(&users_schema());
    assert!(fetched.find_by_id(1).await?);
    assert_eq!(fetched.get("name"), Some(&Value::Text("Bobby Tables".to_string())));

    Ok(())
}

#[tokio::test]
async fn test_insert_then_update_is_a_noop() -> Result<(), Box<dyn std::error::Error>> {
    let db = setup().await?;

    let mut user = db.record(&users_schema());
    user.set("name", "Alice")?;
    user.insert().await?;

    // No mutation in between: update must not touch the row
    let affected = user.update().await?;
    assert_eq!(affected, 0);

    Ok(())
}

#[tokio::test]
async fn test_find_miss_returns_false() -> Result<(), Box<dyn std::error::Error>> {
    let db = setup().await?;

    let mut user = db.record(&users_schema());
    let found = user.find_by_id(999).await?;

    assert!(!found);
    assert!(user.attributes().is_empty());
    assert!(user.is_new());

    Ok(())
}

#[tokio::test]
async fn test_update_writes_only_dirty_fields() -> Result<(), Box<dyn std::error::Error>> {
    let db = setup().await?;

    let mut alice = db.record(&users_schema());
    alice.set("name", "Alice")?;
    alice.set("age", 30)?;
    alice.insert().await?;

    let mut bob = db.record(&users_schema());
    bob.set("name", "Bob")?;
    bob.set("age", 40)?;
    bob.insert().await?;

    alice.set("age", 31)?;
    assert_eq!(alice.update().await?, 1);

    // Alice's name survived, Bob was never touched
    let mut check = db.record(&users_schema());
    assert!(check.find_by_id(1).await?);
    assert_eq!(check.get("name"), Some(&Value::Text("Alice".to_string())));
    assert_eq!(check.get("age"), Some(&Value::Int(31)));

    let mut other = db.record(&users_schema());
    assert!(other.find_by_id(2).await?);
    assert_eq!(other.get("age"), Some(&Value::Int(40)));

    Ok(())
}

#[tokio::test]
async fn test_update_on_new_record_is_a_misuse() -> Result<(), Box<dyn std::error::Error>> {
    let db = setup().await?;

    let mut user = db.record(&users_schema());
    user.set("name", "Ghost")?;

    match user.update().await {
        Err(Error::NotPersisted(table)) => assert_eq!(table, "users"),
        other => panic!("expected NotPersisted, got {other:?}"),
    }

    Ok(())
}

#[tokio::test]
async fn test_insert_requires_attributes() -> Result<(), Box<dyn std::error::Error>> {
    let db = setup().await?;

    let mut user = db.record(&users_schema());
    assert!(matches!(user.insert().await, Err(Error::InvalidData(_))));

    Ok(())
}

#[tokio::test]
async fn test_delete_marks_the_instance_stale() -> Result<(), Box<dyn std::error::Error>> {
    let db = setup().await?;

    let mut user = db.record(&users_schema());
    user.set("name", "Short Lived")?;
    user.insert().await?;

    let affected = user.delete().await?;
    assert_eq!(affected, 1);
    assert!(user.is_destroyed());
    assert_eq!(user.get("name"), None);

    // Any further use is a misuse
    assert!(matches!(user.set("name", "Zombie"), Err(Error::Stale(_))));
    assert!(matches!(user.find().await, Err(Error::Stale(_))));

    // And the row is really gone
    let mut count_check = db.record(&users_schema());
    assert_eq!(count_check.count().await?, 0);

    Ok(())
}

#[tokio::test]
async fn test_double_insert_surfaces_duplicate_key() -> Result<(), Box<dyn std::error::Error>> {
    let db = setup().await?;

    let mut user = db.record(&users_schema());
    user.set("name", "Once")?;
    user.insert().await?;

    // The captured key is replayed verbatim, so the storage rejects the
    // second row. A failed statement leaves the attribute state unchanged.
    assert!(matches!(user.insert().await, Err(Error::DatabaseError(_))));
    assert_eq!(user.get("id"), Some(&Value::Int(1)));
    assert_eq!(user.get("name"), Some(&Value::Text("Once".to_string())));

    // With a fresh key the same instance produces a second row
    user.set("id", 2)?;
    user.insert().await?;

    let mut all = db.record(&users_schema());
    assert_eq!(all.count().await?, 2);

    Ok(())
}

#[tokio::test]
async fn test_failed_terminal_still_clears_the_chain() -> Result<(), Box<dyn std::error::Error>> {
    let db = setup().await?;

    let mut user = db.record(&users_schema());
    user.equals("no_such_column", 1);
    assert!(!user.builder().is_empty());

    assert!(user.find().await.is_err());
    assert!(user.builder().is_empty());

    // The next chain starts from a clean slate
    assert!(!user.find_by_id(1).await?);

    Ok(())
}

#[tokio::test]
async fn test_record_serializes_attributes_as_json() -> Result<(), Box<dyn std::error::Error>> {
    let db = setup().await?;

    let mut user = db.record(&users_schema());
    user.set("name", "Alice")?;
    user.set("age", 30)?;
    user.insert().await?;
    user.set_custom("label", "admin")?;

    let json = serde_json::to_value(&user)?;
    assert_eq!(
        json,
        serde_json::json!({
            "id": 1,
            "name": "Alice",
            "age": 30,
            "label": "admin"
        })
    );

    Ok(())
}
