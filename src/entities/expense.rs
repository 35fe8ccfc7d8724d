//! Expense entity - one shared purchase paid by a single payer.
//!
//! The total is stored in integer cents. `period_year`/`period_month` hold the
//! Jalali period derived from `expense_date` at creation time.

use crate::core::{money::Money, period::Period};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Lifecycle status of an expense. `Approved` is terminal.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "lowercase")]
pub enum ExpenseStatus {
    /// Waiting for at least one participant to approve
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Every participant approved; the expense is binding history
    #[sea_orm(string_value = "approved")]
    Approved,
}

/// Expense database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "expenses")]
pub struct Model {
    /// Unique identifier for the expense
    #[sea_orm(primary_key)]
    pub id: i64,
    /// User who paid the full amount
    pub payer_id: i64,
    /// Total amount in cents, serialized as `"amount": "12.50"`
    #[serde(rename = "amount", with = "crate::core::money::cents")]
    pub amount_cents: i64,
    /// Optional free-text note
    pub description: Option<String>,
    /// Civil date the expense happened on
    pub expense_date: Date,
    /// Jalali year of `expense_date`
    #[sea_orm(indexed)]
    pub period_year: i32,
    /// Jalali month of `expense_date` (1-12)
    #[sea_orm(indexed)]
    pub period_month: i32,
    /// Current lifecycle status
    pub status: ExpenseStatus,
    /// When the expense was recorded
    pub created_at: DateTimeUtc,
}

impl Model {
    /// Total amount as [`Money`].
    #[must_use]
    pub const fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }

    /// Period this expense is grouped under.
    #[must_use]
    pub const fn period(&self) -> Period {
        Period::from_parts(self.period_year, self.period_month)
    }
}

/// Defines relationships between Expense and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One expense owns many participant rows
    #[sea_orm(has_many = "super::expense_participant::Entity")]
    Participants,
    /// Each expense has one payer
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::PayerId",
        to = "super::user::Column::Id",
        on_delete = "Restrict"
    )]
    Payer,
}

impl Related<super::expense_participant::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Participants.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Payer.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
