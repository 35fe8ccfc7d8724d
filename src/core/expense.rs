//! Expense business logic - creation, approval and deletion of shared expenses.
//!
//! An expense is split equally between its distinct participants and stays `pending`
//! until every participant has approved their share. The payer's own share is approved
//! at creation. Once `approved`, an expense is immutable history: it can no longer be
//! deleted and never goes back to `pending`.
//!
//! Every mutation runs in one database transaction, so an expense never exists without
//! its participant rows and two concurrent approvals cannot both miss the final flip.

use crate::{
    core::{
        money::{MAX_AMOUNT, Money, round2},
        period::{Period, to_period},
        user::lookup_user,
    },
    entities::{
        Expense, ExpenseParticipant,
        expense::{self, ExpenseStatus},
        expense_participant,
    },
    errors::{Error, Result},
};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*, sea_query::Expr};
use serde::Serialize;
use tracing::{debug, info, instrument};

/// Longest description accepted on expenses and payments.
pub const MAX_DESCRIPTION_LEN: usize = 500;

/// Arguments for [`create_expense`].
#[derive(Debug, Clone)]
pub struct NewExpense {
    /// User who paid
    pub payer_id: i64,
    /// Total paid, rounded to cents on entry
    pub amount: Decimal,
    /// Optional note
    pub description: Option<String>,
    /// Civil date of the expense
    pub expense_date: NaiveDate,
    /// Users sharing the cost; duplicates are ignored
    pub participant_ids: Vec<i64>,
}

/// An expense with all of its participant rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpenseDetails {
    /// The expense row
    #[serde(flatten)]
    pub expense: expense::Model,
    /// One row per participant, ordered by user id
    pub participants: Vec<expense_participant::Model>,
}

/// Result of an [`approve_expense`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ApprovalOutcome {
    /// Expense that was approved
    pub expense_id: i64,
    /// Participant who approved
    pub user_id: i64,
    /// Always true once the call succeeds
    pub approved: bool,
    /// Status of the expense after this approval
    pub expense_status: ExpenseStatus,
}

/// Optional period filter for listings. Each part filters independently.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PeriodFilter {
    /// Only records from this Jalali year
    pub year: Option<i32>,
    /// Only records from this Jalali month
    pub month: Option<i32>,
}

impl From<Period> for PeriodFilter {
    fn from(period: Period) -> Self {
        Self {
            year: Some(period.year),
            month: Some(period.month),
        }
    }
}

/// Validates a caller-supplied amount and rounds it to cents.
pub(crate) fn validate_amount(amount: Decimal) -> Result<Money> {
    let rounded = round2(amount);
    if !rounded.is_positive() {
        return Err(Error::invalid_input(format!(
            "amount must be greater than zero, got {amount}"
        )));
    }
    if rounded > MAX_AMOUNT {
        return Err(Error::invalid_input(format!(
            "amount must not exceed {MAX_AMOUNT}, got {rounded}"
        )));
    }
    Ok(rounded)
}

pub(crate) fn validate_description(description: Option<String>) -> Result<Option<String>> {
    let description = description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty());
    if let Some(d) = &description {
        if d.chars().count() > MAX_DESCRIPTION_LEN {
            return Err(Error::invalid_input(format!(
                "description must be at most {MAX_DESCRIPTION_LEN} characters"
            )));
        }
    }
    Ok(description)
}

/// Removes repeated ids, keeping the first occurrence of each.
fn distinct_ids(ids: &[i64]) -> Vec<i64> {
    let mut distinct = Vec::with_capacity(ids.len());
    for id in ids {
        if !distinct.contains(id) {
            distinct.push(*id);
        }
    }
    distinct
}

/// Equal share of the entered `amount` for `count` participants.
///
/// Divides the amount as entered, not the rounded total, and rounds the result on its
/// own. Shares are not adjusted to add up to the stored total; they can differ from it
/// by up to half a cent per participant.
#[must_use]
pub fn equal_share(amount: Decimal, count: usize) -> Money {
    round2(amount / Decimal::from(count.max(1)))
}

/// Creates an expense and its participant rows in one transaction.
///
/// Each distinct participant owes `round2(total / count)`. The payer's row, if the payer
/// takes part, is approved immediately; if the payer is the only participant the whole
/// expense is approved on creation.
///
/// # Errors
/// - `InvalidInput` if the participant list is empty, names an unknown, unapproved or
///   inactive user, the amount is not positive after rounding, or the description is too long
/// - `NotFound` if the payer does not exist
/// - `Forbidden` if the payer is unapproved or inactive
#[instrument(skip(db, new_expense), fields(payer_id = new_expense.payer_id))]
pub async fn create_expense(
    db: &DatabaseConnection,
    new_expense: NewExpense,
) -> Result<ExpenseDetails> {
    let NewExpense {
        payer_id,
        amount,
        description,
        expense_date,
        participant_ids,
    } = new_expense;

    let participant_ids = distinct_ids(&participant_ids);
    if participant_ids.is_empty() {
        return Err(Error::invalid_input("participant list cannot be empty"));
    }
    let total = validate_amount(amount)?;
    let description = validate_description(description)?;

    let txn = db.begin().await?;

    let payer = lookup_user(&txn, payer_id).await?;
    if !payer.exists {
        return Err(Error::NotFound {
            entity: "user",
            id: payer_id,
        });
    }
    if !payer.is_eligible() {
        return Err(Error::forbidden("payer is not an approved, active user"));
    }

    let mut unknown = Vec::new();
    let mut ineligible = Vec::new();
    for &user_id in &participant_ids {
        let status = lookup_user(&txn, user_id).await?;
        if !status.exists {
            unknown.push(user_id);
        } else if !status.is_eligible() {
            ineligible.push(user_id);
        }
    }
    if !unknown.is_empty() {
        return Err(Error::invalid_input(format!(
            "these participants do not exist: {unknown:?}"
        )));
    }
    if !ineligible.is_empty() {
        return Err(Error::invalid_input(format!(
            "these participants are not approved or not active: {ineligible:?}"
        )));
    }

    let share = equal_share(amount, participant_ids.len());
    let period = to_period(expense_date);
    let now = Utc::now();
    let status = if participant_ids == [payer_id] {
        ExpenseStatus::Approved
    } else {
        ExpenseStatus::Pending
    };

    let created = expense::ActiveModel {
        payer_id: Set(payer_id),
        amount_cents: Set(total.cents()),
        description: Set(description),
        expense_date: Set(expense_date),
        period_year: Set(period.year),
        period_month: Set(period.month),
        status: Set(status),
        created_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let rows = participant_ids.iter().map(|&user_id| {
        let is_payer = user_id == payer_id;
        expense_participant::ActiveModel {
            expense_id: Set(created.id),
            user_id: Set(user_id),
            share_cents: Set(share.cents()),
            approved: Set(is_payer),
            approved_at: Set(is_payer.then_some(now)),
        }
    });
    ExpenseParticipant::insert_many(rows)
        .exec_without_returning(&txn)
        .await?;

    let participants = participants_of(&txn, created.id).await?;
    txn.commit().await?;

    debug!(
        expense_id = created.id,
        %total,
        %share,
        participants = participants.len(),
        "Expense created"
    );

    Ok(ExpenseDetails {
        expense: created,
        participants,
    })
}

async fn participants_of<C>(db: &C, expense_id: i64) -> Result<Vec<expense_participant::Model>>
where
    C: ConnectionTrait,
{
    ExpenseParticipant::find()
        .filter(expense_participant::Column::ExpenseId.eq(expense_id))
        .order_by_asc(expense_participant::Column::UserId)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Records `caller_id`'s approval of their share.
///
/// Approving twice is a no-op that reports the current status and keeps the original
/// `approved_at`. After each first-time approval the expense flips to `approved` if no
/// participant is left unapproved.
///
/// # Errors
/// - `NotFound` if the expense does not exist
/// - `Forbidden` if the caller is not a participant of the expense
#[instrument(skip(db))]
pub async fn approve_expense(
    db: &DatabaseConnection,
    expense_id: i64,
    caller_id: i64,
) -> Result<ApprovalOutcome> {
    let txn = db.begin().await?;

    let expense = Expense::find_by_id(expense_id)
        .one(&txn)
        .await?
        .ok_or(Error::NotFound {
            entity: "expense",
            id: expense_id,
        })?;

    let participant = ExpenseParticipant::find_by_id((expense_id, caller_id))
        .one(&txn)
        .await?
        .ok_or_else(|| Error::forbidden("you are not a participant of this expense"))?;

    if participant.approved {
        debug!("Participant already approved, nothing to do");
        return Ok(ApprovalOutcome {
            expense_id,
            user_id: caller_id,
            approved: true,
            expense_status: expense.status,
        });
    }

    let mut active_model: expense_participant::ActiveModel = participant.into();
    active_model.approved = Set(true);
    active_model.approved_at = Set(Some(Utc::now()));
    active_model.update(&txn).await?;

    let outstanding = ExpenseParticipant::find()
        .filter(expense_participant::Column::ExpenseId.eq(expense_id))
        .filter(expense_participant::Column::Approved.eq(false))
        .count(&txn)
        .await?;

    let mut expense_status = expense.status;
    if outstanding == 0 && expense_status == ExpenseStatus::Pending {
        // Conditional on the old status so a flip can only ever happen once
        Expense::update_many()
            .col_expr(expense::Column::Status, Expr::value(ExpenseStatus::Approved))
            .filter(expense::Column::Id.eq(expense_id))
            .filter(expense::Column::Status.eq(ExpenseStatus::Pending))
            .exec(&txn)
            .await?;
        expense_status = ExpenseStatus::Approved;
    }

    txn.commit().await?;

    if expense_status == ExpenseStatus::Approved {
        info!(expense_id, "Expense fully approved");
    } else {
        debug!(expense_id, outstanding, "Approval recorded");
    }

    Ok(ApprovalOutcome {
        expense_id,
        user_id: caller_id,
        approved: true,
        expense_status,
    })
}

/// Deletes a pending expense together with its participant rows.
///
/// # Errors
/// - `NotFound` if the expense does not exist
/// - `Conflict` if the expense is already approved
#[instrument(skip(db))]
pub async fn delete_expense(db: &DatabaseConnection, expense_id: i64) -> Result<()> {
    let txn = db.begin().await?;

    let expense = Expense::find_by_id(expense_id)
        .one(&txn)
        .await?
        .ok_or(Error::NotFound {
            entity: "expense",
            id: expense_id,
        })?;

    if expense.status == ExpenseStatus::Approved {
        return Err(Error::conflict("approved expenses cannot be deleted"));
    }

    ExpenseParticipant::delete_many()
        .filter(expense_participant::Column::ExpenseId.eq(expense_id))
        .exec(&txn)
        .await?;
    expense.delete(&txn).await?;

    txn.commit().await?;
    info!(expense_id, "Pending expense deleted");
    Ok(())
}

/// Loads one expense with its participants.
///
/// # Errors
/// Returns `NotFound` if the expense does not exist.
pub async fn get_expense(db: &DatabaseConnection, expense_id: i64) -> Result<ExpenseDetails> {
    let expense = Expense::find_by_id(expense_id)
        .one(db)
        .await?
        .ok_or(Error::NotFound {
            entity: "expense",
            id: expense_id,
        })?;
    let participants = participants_of(db, expense_id).await?;
    Ok(ExpenseDetails {
        expense,
        participants,
    })
}

/// Lists expenses newest first, optionally narrowed to a period.
pub async fn list_expenses(
    db: &DatabaseConnection,
    filter: PeriodFilter,
) -> Result<Vec<ExpenseDetails>> {
    let mut query = Expense::find().order_by_desc(expense::Column::Id);
    if let Some(year) = filter.year {
        query = query.filter(expense::Column::PeriodYear.eq(year));
    }
    if let Some(month) = filter.month {
        query = query.filter(expense::Column::PeriodMonth.eq(month));
    }

    let rows = query.find_with_related(ExpenseParticipant).all(db).await?;
    Ok(rows
        .into_iter()
        .map(|(expense, mut participants)| {
            participants.sort_by_key(|p| p.user_id);
            ExpenseDetails {
                expense,
                participants,
            }
        })
        .collect())
}

/// Expenses on which `user_id` still has to approve their share.
pub async fn pending_approvals(
    db: &DatabaseConnection,
    user_id: i64,
) -> Result<Vec<expense::Model>> {
    Expense::find()
        .inner_join(ExpenseParticipant)
        .filter(expense_participant::Column::UserId.eq(user_id))
        .filter(expense_participant::Column::Approved.eq(false))
        .order_by_desc(expense::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}
