//! Expense participant entity - one user's share of one expense.
//!
//! Keyed by `(expense_id, user_id)`, so a user appears at most once per expense.
//! Rows are removed together with their expense through `ON DELETE CASCADE`.

use crate::core::money::Money;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Expense participant database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "expense_participants")]
pub struct Model {
    /// Expense this share belongs to
    #[sea_orm(primary_key, auto_increment = false)]
    pub expense_id: i64,
    /// User who owes the share
    #[sea_orm(primary_key, auto_increment = false, indexed)]
    pub user_id: i64,
    /// Share in cents, serialized as `"share_amount": "3.33"`
    #[serde(rename = "share_amount", with = "crate::core::money::cents")]
    pub share_cents: i64,
    /// Whether this participant has accepted the expense
    pub approved: bool,
    /// When the participant approved, if they have
    pub approved_at: Option<DateTimeUtc>,
}

impl Model {
    /// Share as [`Money`].
    #[must_use]
    pub const fn share(&self) -> Money {
        Money::from_cents(self.share_cents)
    }
}

/// Defines relationships between participant rows and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each participant row belongs to one expense
    #[sea_orm(
        belongs_to = "super::expense::Entity",
        from = "Column::ExpenseId",
        to = "super::expense::Column::Id",
        on_delete = "Cascade"
    )]
    Expense,
    /// Each participant row refers to one user
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Restrict"
    )]
    User,
}

impl Related<super::expense::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Expense.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
