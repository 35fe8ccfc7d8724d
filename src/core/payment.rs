//! Payment business logic - direct transfers between two users.
//!
//! Payments need no approval: they count towards balances as soon as they are recorded
//! and are never edited afterwards.

use crate::{
    core::{
        expense::{PeriodFilter, validate_amount, validate_description},
        period::to_period,
        user::lookup_user,
    },
    entities::{Payment, payment},
    errors::{Error, Result},
};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use tracing::{debug, instrument};

/// Arguments for [`create_payment`].
#[derive(Debug, Clone)]
pub struct NewPayment {
    /// User sending the money
    pub sender_id: i64,
    /// User receiving the money
    pub receiver_id: i64,
    /// Amount, rounded to cents on entry
    pub amount: Decimal,
    /// Optional note
    pub description: Option<String>,
    /// Civil date of the payment
    pub payment_date: NaiveDate,
}

/// Records a payment from `sender_id` to `receiver_id`.
///
/// # Errors
/// - `InvalidInput` on a self-payment, a non-positive amount, a too long description,
///   or a receiver who is unapproved or inactive
/// - `NotFound` if the sender or the receiver does not exist
/// - `Forbidden` if the sender is unapproved or inactive
#[instrument(skip(db, new_payment), fields(sender_id = new_payment.sender_id, receiver_id = new_payment.receiver_id))]
pub async fn create_payment(
    db: &DatabaseConnection,
    new_payment: NewPayment,
) -> Result<payment::Model> {
    let NewPayment {
        sender_id,
        receiver_id,
        amount,
        description,
        payment_date,
    } = new_payment;

    if sender_id == receiver_id {
        return Err(Error::invalid_input("cannot send a payment to yourself"));
    }
    let amount = validate_amount(amount)?;
    let description = validate_description(description)?;

    let txn = db.begin().await?;

    let sender = lookup_user(&txn, sender_id).await?;
    if !sender.exists {
        return Err(Error::NotFound {
            entity: "user",
            id: sender_id,
        });
    }
    if !sender.is_eligible() {
        return Err(Error::forbidden("sender is not an approved, active user"));
    }

    let receiver = lookup_user(&txn, receiver_id).await?;
    if !receiver.exists {
        return Err(Error::NotFound {
            entity: "user",
            id: receiver_id,
        });
    }
    if !receiver.is_eligible() {
        return Err(Error::invalid_input(
            "receiver is not an approved, active user",
        ));
    }

    let period = to_period(payment_date);
    let created = payment::ActiveModel {
        sender_id: Set(sender_id),
        receiver_id: Set(receiver_id),
        amount_cents: Set(amount.cents()),
        description: Set(description),
        payment_date: Set(payment_date),
        period_year: Set(period.year),
        period_month: Set(period.month),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;

    debug!(payment_id = created.id, %amount, %period, "Payment recorded");
    Ok(created)
}

/// Lists payments newest first, optionally narrowed to a period.
pub async fn list_payments(
    db: &DatabaseConnection,
    filter: PeriodFilter,
) -> Result<Vec<payment::Model>> {
    let mut query = Payment::find().order_by_desc(payment::Column::Id);
    if let Some(year) = filter.year {
        query = query.filter(payment::Column::PeriodYear.eq(year));
    }
    if let Some(month) = filter.month {
        query = query.filter(payment::Column::PeriodMonth.eq(month));
    }
    query.all(db).await.map_err(Into::into)
}
