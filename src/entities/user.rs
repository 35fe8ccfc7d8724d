//! User entity - the identity records the ledger refers to.
//!
//! The ledger only reads `is_approved` and `is_active`; `is_admin` grants the
//! global settlement view.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// User database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    /// Unique identifier for the user
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Login name, unique across all users
    #[sea_orm(unique)]
    pub username: String,
    /// Name shown in reports
    pub display_name: String,
    /// Admins see every balance and the full transfer plan
    pub is_admin: bool,
    /// Only approved users may take part in expenses and payments
    pub is_approved: bool,
    /// Deactivated users keep their history but cannot join new records
    pub is_active: bool,
    /// When the user registered
    pub created_at: DateTimeUtc,
}

/// Users are referenced by expenses, participant rows and payments, never the other way round
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
