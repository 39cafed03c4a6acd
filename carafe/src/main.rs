use std::env;
use std::sync::Arc;

use carafe_orm::{Database, Pagination, Record, Value};
use dotenvy::dotenv;

mod tables;

use tables::{contacts_schema, users_schema, Timestamps};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    env_logger::init();

    let url = env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite::memory:".to_string());
    let db = Database::builder().max_connections(1).connect(&url).await?;

    db.migrator().register(&users_schema()).register(&contacts_schema()).run().await?;

    // Insert a user through a hook-set that stamps created_at
    let mut user = Record::with_hooks(users_schema(), Some(db.clone()), Arc::new(Timestamps))?;
    user.set("name", "Ada Lovelace")?;
    user.insert().await?;
    log::info!("inserted user {:?}", user.get("id"));

    let user_id = user.get("id").cloned().unwrap_or(Value::Null);
    for email in ["ada@analytical.example", "ada@lovelace.example"] {
        let mut contact = db.record(&contacts_schema());
        contact.set("user_id", user_id.clone())?;
        contact.set("email", email)?;
        contact.insert().await?;
    }

    // Lazy relationship resolution, cached on the instance
    let contacts = user.related("contacts").await?;
    println!("{} contacts:", contacts.many().len());
    for contact in contacts.many() {
        println!("  {}", serde_json::to_string(contact)?);
    }

    // Counted pagination over a filtered chain
    let mut browser = db.record(&users_schema());
    browser.order_by("name ASC");
    let page = Pagination::new(0, 10).paginate(&mut browser).await?;
    println!("page 0: {} of {} users", page.data.len(), page.total);

    Ok(())
}
