//! User business logic - the identity records expenses and payments refer to.
//!
//! Registration, admin approval and activation flags. The ledger itself only ever asks
//! whether an id exists and whether that user is approved and active.

use crate::{
    entities::{Expense, ExpenseParticipant, Payment, User, expense, expense_participant, payment, user},
    errors::{Error, Result},
};
use sea_orm::{Condition, QueryOrder, Set, TransactionTrait, prelude::*};
use tracing::{info, instrument};

const USERNAME_LEN: std::ops::RangeInclusive<usize> = 3..=80;
const DISPLAY_NAME_LEN: std::ops::RangeInclusive<usize> = 1..=100;

/// What the ledger needs to know about a user id.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UserStatus {
    /// Whether the id resolves to a user at all
    pub exists: bool,
    /// Approved by an admin
    pub is_approved: bool,
    /// Not deactivated
    pub is_active: bool,
}

impl UserStatus {
    /// Approved and active users may join expenses and payments.
    #[must_use]
    pub const fn is_eligible(self) -> bool {
        self.exists && self.is_approved && self.is_active
    }
}

impl From<Option<&user::Model>> for UserStatus {
    fn from(user: Option<&user::Model>) -> Self {
        user.map_or_else(Self::default, |u| Self {
            exists: true,
            is_approved: u.is_approved,
            is_active: u.is_active,
        })
    }
}

/// Registers a new user.
///
/// The first user ever registered becomes an approved admin; everyone after that starts
/// unapproved and waits for an admin.
///
/// # Errors
/// Returns an error if:
/// - The username (trimmed) is not 3-80 characters or the display name is not 1-100
/// - The username is already taken (`Conflict`)
/// - The database operation fails
#[instrument(skip(db))]
pub async fn register_user(
    db: &DatabaseConnection,
    username: &str,
    display_name: &str,
) -> Result<user::Model> {
    let username = username.trim();
    let display_name = display_name.trim();

    if !USERNAME_LEN.contains(&username.chars().count()) {
        return Err(Error::invalid_input("username must be 3-80 characters"));
    }
    if !DISPLAY_NAME_LEN.contains(&display_name.chars().count()) {
        return Err(Error::invalid_input("display name must be 1-100 characters"));
    }

    let txn = db.begin().await?;

    let taken = User::find()
        .filter(user::Column::Username.eq(username))
        .one(&txn)
        .await?;
    if taken.is_some() {
        return Err(Error::conflict(format!("username '{username}' already exists")));
    }

    let is_first = User::find().count(&txn).await? == 0;

    let created = user::ActiveModel {
        username: Set(username.to_string()),
        display_name: Set(display_name.to_string()),
        is_admin: Set(is_first),
        is_approved: Set(is_first),
        is_active: Set(true),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;

    if is_first {
        info!(user_id = created.id, "First user registered as admin");
    }
    Ok(created)
}

/// Looks a user up by id.
pub async fn get_user<C>(db: &C, user_id: i64) -> Result<Option<user::Model>>
where
    C: ConnectionTrait,
{
    User::find_by_id(user_id).one(db).await.map_err(Into::into)
}

/// Resolves a user id to its existence and eligibility flags.
pub async fn lookup_user<C>(db: &C, user_id: i64) -> Result<UserStatus>
where
    C: ConnectionTrait,
{
    let user = get_user(db, user_id).await?;
    Ok(UserStatus::from(user.as_ref()))
}

/// All users, oldest first.
pub async fn list_users(db: &DatabaseConnection) -> Result<Vec<user::Model>> {
    User::find()
        .order_by_asc(user::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Users still waiting for admin approval.
pub async fn list_pending_users(db: &DatabaseConnection) -> Result<Vec<user::Model>> {
    User::find()
        .filter(user::Column::IsApproved.eq(false))
        .order_by_asc(user::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Sets or clears the approval flag.
#[instrument(skip(db))]
pub async fn set_user_approved(
    db: &DatabaseConnection,
    user_id: i64,
    approved: bool,
) -> Result<user::Model> {
    let existing = get_user(db, user_id).await?.ok_or(Error::NotFound {
        entity: "user",
        id: user_id,
    })?;

    let mut active_model: user::ActiveModel = existing.into();
    active_model.is_approved = Set(approved);
    let updated = active_model.update(db).await?;
    info!(user_id, approved, "User approval changed");
    Ok(updated)
}

/// Activates or deactivates a user. Their history is untouched either way.
#[instrument(skip(db))]
pub async fn set_user_active(
    db: &DatabaseConnection,
    user_id: i64,
    active: bool,
) -> Result<user::Model> {
    let existing = get_user(db, user_id).await?.ok_or(Error::NotFound {
        entity: "user",
        id: user_id,
    })?;

    let mut active_model: user::ActiveModel = existing.into();
    active_model.is_active = Set(active);
    let updated = active_model.update(db).await?;
    info!(user_id, active, "User activity changed");
    Ok(updated)
}

/// Deletes a user that never made it into the ledger.
///
/// # Errors
/// - `NotFound` if the user does not exist
/// - `Conflict` if the user is an admin, is approved, or is referenced by any expense,
///   participant row or payment
#[instrument(skip(db))]
pub async fn delete_user(db: &DatabaseConnection, user_id: i64) -> Result<()> {
    let txn = db.begin().await?;

    let existing = get_user(&txn, user_id).await?.ok_or(Error::NotFound {
        entity: "user",
        id: user_id,
    })?;

    if existing.is_admin {
        return Err(Error::conflict("admin users cannot be deleted"));
    }
    if existing.is_approved {
        return Err(Error::conflict("approved users cannot be deleted"));
    }

    let referenced = Expense::find()
        .filter(expense::Column::PayerId.eq(user_id))
        .count(&txn)
        .await?
        + ExpenseParticipant::find()
            .filter(expense_participant::Column::UserId.eq(user_id))
            .count(&txn)
            .await?
        + Payment::find()
            .filter(
                Condition::any()
                    .add(payment::Column::SenderId.eq(user_id))
                    .add(payment::Column::ReceiverId.eq(user_id)),
            )
            .count(&txn)
            .await?;
    if referenced > 0 {
        return Err(Error::conflict(format!(
            "user {user_id} is referenced by {referenced} ledger records"
        )));
    }

    existing.delete(&txn).await?;
    txn.commit().await?;

    info!(user_id, "User deleted");
    Ok(())
}
