//! Payment entity - money sent directly from one user to another.
//!
//! Payments are trusted on creation and never change afterwards.
use crate::core::{money::Money, period::Period};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Payment database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "payments")]
pub struct Model {
    /// Unique identifier for the payment
    #[sea_orm(primary_key)]
    pub id: i64,
    /// User who sent the money
    #[sea_orm(indexed)]
    pub sender_id: i64,
    /// User who received the money
    #[sea_orm(indexed)]
    pub receiver_id: i64,
    /// Amount in cents, serialized as `"amount": "12.50"`
    #[serde(rename = "amount", with = "crate::core::money::cents")]
    pub amount_cents: i64,
    /// Optional free-text note
    pub description: Option<String>,
    /// Civil date of the payment
    pub payment_date: Date,
    /// Jalali year of `payment_date`
    #[sea_orm(indexed)]
    pub period_year: i32,
    /// Jalali month of `payment_date` (1-12)
    #[sea_orm(indexed)]
    pub period_month: i32,
    /// When the payment was recorded
    pub created_at: DateTimeUtc,
}

impl Model {
    /// Amount as [`Money`].
    #[must_use]
    pub const fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }

    /// Period this payment is grouped under.
    #[must_use]
    pub const fn period(&self) -> Period {
        Period::from_parts(self.period_year, self.period_month)
    }
}

/// Defines relationships between Payment and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// The sending user
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::SenderId",
        to = "super::user::Column::Id",
        on_delete = "Restrict"
    )]
    Sender,
    /// The receiving user
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::ReceiverId",
        to = "super::user::Column::Id",
        on_delete = "Restrict"
    )]
    Receiver,
}

impl ActiveModelBehavior for ActiveModel {}
