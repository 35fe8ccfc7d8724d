//! Database configuration module for the ledger.
//!
//! This module handles the `SQLite` connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with `Schema::create_table_from_entity`,
//! so the schema always matches the Rust models. Creation is idempotent and follows
//! foreign key order: users, expenses, expense participants, payments.

use crate::entities::{Expense, ExpenseParticipant, Payment, User};
use crate::errors::Result;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, EntityName, EntityTrait, Schema};
use std::path::Path;
use tracing::{debug, info};

/// Directory that must exist before `SQLite` can create the file behind `database_url`.
fn sqlite_parent_dir(database_url: &str) -> Option<&Path> {
    let path = database_url.strip_prefix("sqlite://")?;
    let path = path.split('?').next().unwrap_or(path);
    Path::new(path)
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
}

/// Establishes a connection to the database at `database_url`.
///
/// For file-backed `SQLite` URLs the parent directory is created first.
pub async fn create_connection(database_url: &str) -> Result<DatabaseConnection> {
    if let Some(dir) = sqlite_parent_dir(database_url) {
        std::fs::create_dir_all(dir)?;
    }
    let db = Database::connect(database_url).await?;
    info!(backend = ?db.get_database_backend(), "Connected to database");
    Ok(db)
}

async fn create_table_with_indexes<E>(
    db: &DatabaseConnection,
    schema: &Schema,
    entity: E,
) -> Result<()>
where
    E: EntityTrait,
{
    let builder = db.get_database_backend();

    let mut table = schema.create_table_from_entity(entity);
    table.if_not_exists();
    db.execute(builder.build(&table)).await?;

    for mut index in schema.create_index_from_entity(entity) {
        index.if_not_exists();
        db.execute(builder.build(&index)).await?;
    }

    debug!(table = entity.table_name(), "Table ready");
    Ok(())
}

/// Creates all tables and their indexes if they do not exist yet.
///
/// # Errors
/// Returns an error if any DDL statement fails.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let schema = Schema::new(db.get_database_backend());

    create_table_with_indexes(db, &schema, User).await?;
    create_table_with_indexes(db, &schema, Expense).await?;
    create_table_with_indexes(db, &schema, ExpenseParticipant).await?;
    create_table_with_indexes(db, &schema, Payment).await?;

    Ok(())
}
