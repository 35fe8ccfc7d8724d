//! Shared test utilities for the ledger.
//!
//! Helpers for an in-memory database and for seeding users, expenses and payments with
//! sensible defaults.

#![allow(clippy::unwrap_used)]

use crate::{
    core::{
        expense::{self, ExpenseDetails, NewExpense},
        payment::{self, NewPayment},
        user,
    },
    entities,
    errors::Result,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::DatabaseConnection;
use std::str::FromStr;

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// 2025-10-19, which falls in Mehr 1404 (period 1404/07).
pub fn test_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 10, 19).unwrap()
}

/// Registers `username` and approves it right away.
pub async fn create_approved_user(
    db: &DatabaseConnection,
    username: &str,
) -> Result<entities::user::Model> {
    let created = user::register_user(db, username, username).await?;
    user::set_user_approved(db, created.id, true).await
}

/// Fresh database with `count` approved users named `user0`, `user1`, ...
///
/// The first one is the admin.
pub async fn setup_with_users(
    count: usize,
) -> Result<(DatabaseConnection, Vec<entities::user::Model>)> {
    let db = setup_test_db().await?;
    let mut users = Vec::with_capacity(count);
    for i in 0..count {
        users.push(create_approved_user(&db, &format!("user{i}")).await?);
    }
    Ok((db, users))
}

/// Creates a pending expense dated [`test_date`].
///
/// # Arguments
/// * `amount` - Decimal string, e.g. `"30.00"`
/// * `participants` - User ids sharing the cost
pub async fn create_test_expense(
    db: &DatabaseConnection,
    payer_id: i64,
    amount: &str,
    participants: &[i64],
) -> Result<ExpenseDetails> {
    expense::create_expense(
        db,
        NewExpense {
            payer_id,
            amount: Decimal::from_str(amount).unwrap(),
            description: None,
            expense_date: test_date(),
            participant_ids: participants.to_vec(),
        },
    )
    .await
}

/// Creates an expense and has every participant approve it.
pub async fn create_approved_expense(
    db: &DatabaseConnection,
    payer_id: i64,
    amount: &str,
    participants: &[i64],
) -> Result<ExpenseDetails> {
    let created = create_test_expense(db, payer_id, amount, participants).await?;
    for participant in &created.participants {
        expense::approve_expense(db, created.expense.id, participant.user_id).await?;
    }
    expense::get_expense(db, created.expense.id).await
}

/// Records a payment dated [`test_date`].
pub async fn create_test_payment(
    db: &DatabaseConnection,
    sender_id: i64,
    receiver_id: i64,
    amount: &str,
) -> Result<entities::payment::Model> {
    payment::create_payment(
        db,
        NewPayment {
            sender_id,
            receiver_id,
            amount: Decimal::from_str(amount).unwrap(),
            description: None,
            payment_date: test_date(),
        },
    )
    .await
}
