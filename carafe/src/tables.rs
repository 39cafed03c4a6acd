use async_trait::async_trait;
use carafe_orm::{ColumnDef, ColumnType, Error, Hooks, Record, Relation, TableSchema};
use chrono::Utc;

pub fn users_schema() -> TableSchema {
    users_table()
        .relation("contacts", Relation::has_many(contacts_table(), "user_id").backref("user"))
}

pub fn contacts_schema() -> TableSchema {
    contacts_table()
        .relation("user", Relation::belongs_to(users_table(), "user_id").backref("contact"))
}

fn users_table() -> TableSchema {
    TableSchema::new("users")
        .column(ColumnDef::new("id", ColumnType::Integer))
        .column(ColumnDef::new("name", ColumnType::Text))
        .column(ColumnDef::new("created_at", ColumnType::Timestamp).nullable())
}

fn contacts_table() -> TableSchema {
    TableSchema::new("contacts")
        .column(ColumnDef::new("id", ColumnType::Integer))
        .column(ColumnDef::new("user_id", ColumnType::Integer).index())
        .column(ColumnDef::new("email", ColumnType::Varchar(100)).unique())
}

/// Stamps `created_at` on every insert.
pub struct Timestamps;

#[async_trait]
impl Hooks for Timestamps {
    async fn before_insert(&self, record: &mut Record) -> Result<(), Error> {
        record.set("created_at", Utc::now())?;
        Ok(())
    }
}
