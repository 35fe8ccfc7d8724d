//! Settlement views - who owes whom up to a period.
//!
//! Admins get every user's balance plus the optimized transfer plan. Everyone else only
//! sees their own pairwise balances and no plan. Each view reads all of its data inside
//! one transaction so it never mixes two database states.

use crate::{
    core::{
        ledger::{Balances, ExpenseWithParticipants, aggregate, aggregate_scoped},
        money::Money,
        period::Period,
        settlement::{Transfer, settle},
        user::get_user,
    },
    entities::{
        Expense, ExpenseParticipant, Payment, User, expense, expense_participant, payment, user,
    },
    errors::{Error, Result},
};
use sea_orm::{
    Condition, DatabaseTransaction, QueryOrder, TransactionTrait, prelude::*, sea_query::Query,
};
use serde::Serialize;
use tracing::{debug, instrument};

/// One user's signed balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UserBalance {
    /// The user
    pub user_id: i64,
    /// Positive when the user is owed money, negative when they owe
    pub balance: Money,
}

/// Global view: every balance and the full transfer plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdminView {
    /// Cutoff period (inclusive)
    pub period: Period,
    /// Every approved user plus anyone referenced by counted records, by user id
    pub balances: Vec<UserBalance>,
    /// Suggested transfers that zero all balances
    pub transfers: Vec<Transfer>,
}

/// Caller-scoped view: only the caller's relationships, no transfer plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PersonalView {
    /// Cutoff period (inclusive)
    pub period: Period,
    /// Positive when that user owes the caller, negative when the caller owes them
    pub my_balances: Vec<UserBalance>,
}

/// What [`settlement_report`] returns, depending on the caller's visibility.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "scope", rename_all = "lowercase")]
pub enum SettlementView {
    /// Caller is an admin
    Admin(AdminView),
    /// Caller is a regular user
    Personal(PersonalView),
}

fn up_to<C: ColumnTrait>(year: C, month: C, cutoff: Period) -> Condition {
    Condition::any().add(year.lt(cutoff.year)).add(
        Condition::all()
            .add(year.eq(cutoff.year))
            .add(month.lte(cutoff.month)),
    )
}

/// Approved expenses up to `cutoff`, limited to those `party` paid for or shares in.
async fn load_approved_expenses(
    txn: &DatabaseTransaction,
    cutoff: Period,
    party: Option<i64>,
) -> Result<Vec<ExpenseWithParticipants>> {
    let mut query = Expense::find()
        .filter(expense::Column::Status.eq(expense::ExpenseStatus::Approved))
        .filter(up_to(
            expense::Column::PeriodYear,
            expense::Column::PeriodMonth,
            cutoff,
        ));
    if let Some(user_id) = party {
        query = query.filter(
            Condition::any()
                .add(expense::Column::PayerId.eq(user_id))
                .add(
                    expense::Column::Id.in_subquery(
                        Query::select()
                            .column(expense_participant::Column::ExpenseId)
                            .from(ExpenseParticipant)
                            .and_where(expense_participant::Column::UserId.eq(user_id))
                            .to_owned(),
                    ),
                ),
        );
    }
    query
        .order_by_asc(expense::Column::Id)
        .find_with_related(ExpenseParticipant)
        .all(txn)
        .await
        .map_err(Into::into)
}

async fn load_payments(
    txn: &DatabaseTransaction,
    cutoff: Period,
    party: Option<i64>,
) -> Result<Vec<payment::Model>> {
    let mut query = Payment::find().filter(up_to(
        payment::Column::PeriodYear,
        payment::Column::PeriodMonth,
        cutoff,
    ));
    if let Some(user_id) = party {
        query = query.filter(
            Condition::any()
                .add(payment::Column::SenderId.eq(user_id))
                .add(payment::Column::ReceiverId.eq(user_id)),
        );
    }
    query
        .order_by_asc(payment::Column::Id)
        .all(txn)
        .await
        .map_err(Into::into)
}

fn to_user_balances(balances: &Balances) -> Vec<UserBalance> {
    balances
        .iter()
        .map(|(user_id, balance)| UserBalance {
            user_id: *user_id,
            balance: *balance,
        })
        .collect()
}

/// Global balances and the optimized transfer plan up to `period`.
#[instrument(skip(db))]
pub async fn admin_view(db: &DatabaseConnection, period: Period) -> Result<AdminView> {
    let txn = db.begin().await?;

    let approved_users: Vec<i64> = User::find()
        .filter(user::Column::IsApproved.eq(true))
        .order_by_asc(user::Column::Id)
        .all(&txn)
        .await?
        .into_iter()
        .map(|u| u.id)
        .collect();
    let expenses = load_approved_expenses(&txn, period, None).await?;
    let payments = load_payments(&txn, period, None).await?;

    txn.commit().await?;

    let balances = aggregate(period, approved_users, &expenses, &payments);
    let transfers = settle(&balances);

    debug!(
        expenses = expenses.len(),
        payments = payments.len(),
        transfers = transfers.len(),
        "Admin view computed"
    );

    Ok(AdminView {
        period,
        balances: to_user_balances(&balances),
        transfers,
    })
}

/// The caller's own pairwise balances up to `period`, without a transfer plan.
///
/// Users the caller is square with are left out.
#[instrument(skip(db))]
pub async fn personal_view(
    db: &DatabaseConnection,
    caller_id: i64,
    period: Period,
) -> Result<PersonalView> {
    let txn = db.begin().await?;

    let expenses = load_approved_expenses(&txn, period, Some(caller_id)).await?;
    let payments = load_payments(&txn, period, Some(caller_id)).await?;

    txn.commit().await?;

    let mut balances = aggregate_scoped(period, caller_id, &expenses, &payments);
    balances.retain(|_, balance| !balance.is_zero());

    debug!(counterparties = balances.len(), "Personal view computed");

    Ok(PersonalView {
        period,
        my_balances: to_user_balances(&balances),
    })
}

/// The settlement view `caller_id` is entitled to.
///
/// # Errors
/// - `NotFound` if the caller does not exist
/// - `Forbidden` if the caller is unapproved or inactive
pub async fn settlement_report(
    db: &DatabaseConnection,
    caller_id: i64,
    period: Period,
) -> Result<SettlementView> {
    let caller = get_user(db, caller_id).await?.ok_or(Error::NotFound {
        entity: "user",
        id: caller_id,
    })?;
    if !caller.is_approved || !caller.is_active {
        return Err(Error::forbidden("user is not approved by an admin yet"));
    }

    if caller.is_admin {
        admin_view(db, period).await.map(SettlementView::Admin)
    } else {
        personal_view(db, caller_id, period)
            .await
            .map(SettlementView::Personal)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::expense::{NewExpense, approve_expense, create_expense};
    use crate::core::user::{register_user, set_user_active};
    use crate::test_utils::*;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    const MEHR_1404: Period = Period::from_parts(1404, 7);

    fn balance(user_id: i64, cents: i64) -> UserBalance {
        UserBalance {
            user_id,
            balance: Money::from_cents(cents),
        }
    }

    fn transfer(from: i64, to: i64, cents: i64) -> Transfer {
        Transfer {
            from,
            to,
            amount: Money::from_cents(cents),
        }
    }

    /// Three users: user0 paid 30.00 for everyone (approved), user1 paid back 4.00,
    /// and user1's own 50.00 expense is still waiting for user2.
    async fn seeded() -> Result<(DatabaseConnection, i64, i64, i64)> {
        let (db, users) = setup_with_users(3).await?;
        let (a, b, c) = (users[0].id, users[1].id, users[2].id);

        create_approved_expense(&db, a, "30.00", &[a, b, c]).await?;
        create_test_payment(&db, b, a, "4.00").await?;
        create_test_expense(&db, b, "50.00", &[b, c]).await?;

        Ok((db, a, b, c))
    }

    #[tokio::test]
    async fn test_admin_view_balances_and_transfers() -> Result<()> {
        let (db, a, b, c) = seeded().await?;

        let view = admin_view(&db, MEHR_1404).await?;
        assert_eq!(view.period, MEHR_1404);
        assert_eq!(
            view.balances,
            vec![balance(a, 1600), balance(b, -600), balance(c, -1000)]
        );
        assert_eq!(view.transfers, vec![transfer(c, a, 1000), transfer(b, a, 600)]);

        let total: Money = view.balances.iter().map(|entry| entry.balance).sum();
        assert!(total.is_zero());
        Ok(())
    }

    #[tokio::test]
    async fn test_admin_view_lists_idle_approved_users() -> Result<()> {
        let (db, users) = setup_with_users(2).await?;
        register_user(&db, "waiting", "Waiting").await?;

        let view = admin_view(&db, MEHR_1404).await?;
        assert_eq!(view.balances, vec![balance(users[0].id, 0), balance(users[1].id, 0)]);
        assert!(view.transfers.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_views_are_cumulative_up_to_cutoff() -> Result<()> {
        let (db, users) = setup_with_users(2).await?;
        let (a, b) = (users[0].id, users[1].id);

        // 2025-09-01 falls in Shahrivar 1404
        let earlier = create_expense(
            &db,
            NewExpense {
                payer_id: a,
                amount: Decimal::new(1000, 2),
                description: None,
                expense_date: NaiveDate::from_ymd_opt(2025, 9, 1).unwrap(),
                participant_ids: vec![a, b],
            },
        )
        .await?;
        approve_expense(&db, earlier.expense.id, b).await?;
        create_approved_expense(&db, a, "20.00", &[a, b]).await?;

        let shahrivar = admin_view(&db, Period::from_parts(1404, 6)).await?;
        assert_eq!(shahrivar.balances, vec![balance(a, 500), balance(b, -500)]);

        let mehr = admin_view(&db, MEHR_1404).await?;
        assert_eq!(mehr.balances, vec![balance(a, 1500), balance(b, -1500)]);

        let before = personal_view(&db, b, Period::from_parts(1404, 5)).await?;
        assert!(before.my_balances.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_personal_view_only_shows_callers_relationships() -> Result<()> {
        let (db, a, b, c) = seeded().await?;

        let for_b = personal_view(&db, b, MEHR_1404).await?;
        assert_eq!(for_b.my_balances, vec![balance(a, -600)]);

        let for_a = personal_view(&db, a, MEHR_1404).await?;
        assert_eq!(for_a.my_balances, vec![balance(b, 600), balance(c, 1000)]);

        let global = admin_view(&db, MEHR_1404).await?;
        let own: Money = for_a.my_balances.iter().map(|entry| entry.balance).sum();
        assert_eq!(own, global.balances[0].balance);
        Ok(())
    }

    #[tokio::test]
    async fn test_caller_expense_loading_skips_unrelated_records() -> Result<()> {
        let (db, users) = setup_with_users(4).await?;
        let (a, b, c, d) = (users[0].id, users[1].id, users[2].id, users[3].id);

        let paid_by_a = create_approved_expense(&db, a, "10.00", &[b, c]).await?;
        let shared_by_a = create_approved_expense(&db, c, "20.00", &[a, c]).await?;
        create_approved_expense(&db, c, "30.00", &[c, d]).await?;

        let txn = db.begin().await?;
        let loaded = load_approved_expenses(&txn, MEHR_1404, Some(a)).await?;
        let everything = load_approved_expenses(&txn, MEHR_1404, None).await?;
        txn.commit().await?;

        let ids: Vec<i64> = loaded.iter().map(|(expense, _)| expense.id).collect();
        assert_eq!(ids, vec![paid_by_a.expense.id, shared_by_a.expense.id]);
        assert_eq!(loaded[0].1.len(), 2);
        assert_eq!(everything.len(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn test_personal_view_omits_settled_counterparties() -> Result<()> {
        let (db, a, _, c) = seeded().await?;
        create_test_payment(&db, c, a, "10.00").await?;

        let for_a = personal_view(&db, a, MEHR_1404).await?;
        assert!(for_a.my_balances.iter().all(|entry| entry.user_id != c));

        let for_c = personal_view(&db, c, MEHR_1404).await?;
        assert!(for_c.my_balances.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_settlement_report_by_role() -> Result<()> {
        let (db, a, b, _) = seeded().await?;

        let admin = settlement_report(&db, a, MEHR_1404).await?;
        assert!(matches!(admin, SettlementView::Admin(ref view) if view.transfers.len() == 2));

        let personal = settlement_report(&db, b, MEHR_1404).await?;
        assert!(matches!(personal, SettlementView::Personal(_)));

        let json = serde_json::to_value(&admin).unwrap();
        assert_eq!(json["scope"], "admin");
        assert!(json["transfers"].is_array());
        Ok(())
    }

    #[tokio::test]
    async fn test_settlement_report_rejects_ineligible_callers() -> Result<()> {
        let (db, _, b, _) = seeded().await?;
        let waiting = register_user(&db, "waiting", "Waiting").await?;

        assert!(matches!(
            settlement_report(&db, waiting.id, MEHR_1404).await,
            Err(Error::Forbidden { .. })
        ));
        assert!(matches!(
            settlement_report(&db, 999, MEHR_1404).await,
            Err(Error::NotFound { entity: "user", id: 999 })
        ));

        set_user_active(&db, b, false).await?;
        assert!(matches!(
            settlement_report(&db, b, MEHR_1404).await,
            Err(Error::Forbidden { .. })
        ));
        Ok(())
    }
}
