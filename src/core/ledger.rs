//! Ledger aggregation - folds approved expenses and payments into net balances.
//!
//! A positive balance means the user is owed money, a negative one that the user owes.
//! Only approved expenses count; payments count as soon as they exist. Both are limited
//! to periods up to and including the cutoff.
//!
//! Every user referenced by a folded record gets an entry, even one that is not in the
//! seeded base set, so the global balances always sum to zero.

use crate::core::money::Money;
use crate::core::period::Period;
use crate::entities::{
    expense::{self, ExpenseStatus},
    expense_participant, payment,
};
use std::collections::BTreeMap;

/// Signed balance per user id.
pub type Balances = BTreeMap<i64, Money>;

/// An expense together with all of its participant rows.
pub type ExpenseWithParticipants = (expense::Model, Vec<expense_participant::Model>);

fn expense_counts(expense: &expense::Model, cutoff: Period) -> bool {
    expense.status == ExpenseStatus::Approved && expense.period() <= cutoff
}

fn payment_counts(payment: &payment::Model, cutoff: Period) -> bool {
    payment.period() <= cutoff
}

/// Global balances for every user.
///
/// `base_users` start at zero so they show up even without activity. For each counted
/// expense every non-payer share moves from the participant to the payer; for each
/// payment the sender's balance rises and the receiver's falls by the amount.
///
/// The payment direction follows from "positive means owed": a debtor who pays has
/// discharged part of their debt, so their balance moves up towards zero. Subtracting
/// from the sender instead would count the payment as fresh debt.
#[must_use]
pub fn aggregate(
    cutoff: Period,
    base_users: impl IntoIterator<Item = i64>,
    expenses: &[ExpenseWithParticipants],
    payments: &[payment::Model],
) -> Balances {
    let mut balances: Balances = base_users
        .into_iter()
        .map(|user_id| (user_id, Money::ZERO))
        .collect();

    for (expense, participants) in expenses
        .iter()
        .filter(|(expense, _)| expense_counts(expense, cutoff))
    {
        for participant in participants
            .iter()
            .filter(|participant| participant.user_id != expense.payer_id)
        {
            *balances.entry(participant.user_id).or_default() -= participant.share();
            *balances.entry(expense.payer_id).or_default() += participant.share();
        }
    }

    for payment in payments
        .iter()
        .filter(|payment| payment_counts(payment, cutoff))
    {
        *balances.entry(payment.sender_id).or_default() += payment.amount();
        *balances.entry(payment.receiver_id).or_default() -= payment.amount();
    }

    balances
}

/// Pairwise balances between `caller` and everyone they share records with.
///
/// A positive entry means that user owes the caller, a negative one that the caller owes
/// them. Records the caller is not part of are ignored, so other users' mutual debts never
/// leak. The entries sum to the caller's global balance.
#[must_use]
pub fn aggregate_scoped(
    cutoff: Period,
    caller: i64,
    expenses: &[ExpenseWithParticipants],
    payments: &[payment::Model],
) -> Balances {
    let mut balances = Balances::new();

    for (expense, participants) in expenses
        .iter()
        .filter(|(expense, _)| expense_counts(expense, cutoff))
    {
        if expense.payer_id == caller {
            for participant in participants.iter().filter(|p| p.user_id != caller) {
                *balances.entry(participant.user_id).or_default() += participant.share();
            }
        } else if let Some(own) = participants.iter().find(|p| p.user_id == caller) {
            *balances.entry(expense.payer_id).or_default() -= own.share();
        }
    }

    for payment in payments
        .iter()
        .filter(|payment| payment_counts(payment, cutoff))
    {
        if payment.sender_id == caller {
            *balances.entry(payment.receiver_id).or_default() += payment.amount();
        } else if payment.receiver_id == caller {
            *balances.entry(payment.sender_id).or_default() -= payment.amount();
        }
    }

    balances
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};

    const MEHR_1404: Period = Period::from_parts(1404, 7);

    fn expense(
        id: i64,
        payer_id: i64,
        period: Period,
        status: ExpenseStatus,
        shares: &[(i64, i64)],
    ) -> ExpenseWithParticipants {
        let model = expense::Model {
            id,
            payer_id,
            amount_cents: shares.iter().map(|(_, cents)| cents).sum(),
            description: None,
            expense_date: NaiveDate::from_ymd_opt(2025, 10, 1).unwrap(),
            period_year: period.year,
            period_month: period.month,
            status,
            created_at: Utc.with_ymd_and_hms(2025, 10, 1, 12, 0, 0).unwrap(),
        };
        let participants = shares
            .iter()
            .map(|(user_id, cents)| expense_participant::Model {
                expense_id: id,
                user_id: *user_id,
                share_cents: *cents,
                approved: status == ExpenseStatus::Approved || *user_id == payer_id,
                approved_at: None,
            })
            .collect();
        (model, participants)
    }

    fn payment(id: i64, sender_id: i64, receiver_id: i64, period: Period, cents: i64) -> payment::Model {
        payment::Model {
            id,
            sender_id,
            receiver_id,
            amount_cents: cents,
            description: None,
            payment_date: NaiveDate::from_ymd_opt(2025, 10, 1).unwrap(),
            period_year: period.year,
            period_month: period.month,
            created_at: Utc.with_ymd_and_hms(2025, 10, 1, 12, 0, 0).unwrap(),
        }
    }

    fn money(cents: i64) -> Money {
        Money::from_cents(cents)
    }

    #[test]
    fn test_aggregate_seeds_base_users() {
        let balances = aggregate(MEHR_1404, [1, 2, 3], &[], &[]);
        assert_eq!(balances.len(), 3);
        assert!(balances.values().all(|b| b.is_zero()));
    }

    #[test]
    fn test_aggregate_moves_shares_to_payer() {
        let expenses = [expense(
            1,
            1,
            MEHR_1404,
            ExpenseStatus::Approved,
            &[(1, 1000), (2, 1000), (3, 1000)],
        )];
        let balances = aggregate(MEHR_1404, [1, 2, 3], &expenses, &[]);
        assert_eq!(balances[&1], money(2000));
        assert_eq!(balances[&2], money(-1000));
        assert_eq!(balances[&3], money(-1000));
    }

    #[test]
    fn test_aggregate_ignores_pending_and_later_periods() {
        let expenses = [
            expense(1, 1, MEHR_1404, ExpenseStatus::Pending, &[(1, 500), (2, 500)]),
            expense(
                2,
                1,
                Period::from_parts(1404, 8),
                ExpenseStatus::Approved,
                &[(1, 500), (2, 500)],
            ),
        ];
        let payments = [payment(1, 2, 1, Period::from_parts(1405, 1), 300)];
        let balances = aggregate(MEHR_1404, [1, 2], &expenses, &payments);
        assert!(balances.values().all(|b| b.is_zero()));
    }

    #[test]
    fn test_aggregate_includes_earlier_periods() {
        let expenses = [expense(
            1,
            1,
            Period::from_parts(1403, 12),
            ExpenseStatus::Approved,
            &[(1, 500), (2, 500)],
        )];
        let balances = aggregate(MEHR_1404, [1, 2], &expenses, &[]);
        assert_eq!(balances[&1], money(500));
        assert_eq!(balances[&2], money(-500));
    }

    #[test]
    fn test_aggregate_payment_reduces_debt() {
        let expenses = [expense(
            1,
            1,
            MEHR_1404,
            ExpenseStatus::Approved,
            &[(1, 2000), (2, 2000)],
        )];
        let payments = [payment(1, 2, 1, MEHR_1404, 1500)];
        let balances = aggregate(MEHR_1404, [1, 2], &expenses, &payments);
        assert_eq!(balances[&1], money(500));
        assert_eq!(balances[&2], money(-500));
    }

    #[test]
    fn test_aggregate_adds_referenced_users_outside_base() {
        let expenses = [expense(
            1,
            1,
            MEHR_1404,
            ExpenseStatus::Approved,
            &[(1, 700), (9, 700)],
        )];
        let balances = aggregate(MEHR_1404, [1], &expenses, &[]);
        assert_eq!(balances[&9], money(-700));
        let total: Money = balances.values().copied().sum();
        assert!(total.is_zero());
    }

    #[test]
    fn test_aggregate_payer_outside_participants() {
        // payer 1 paid for 2 and 3 only
        let expenses = [expense(
            1,
            1,
            MEHR_1404,
            ExpenseStatus::Approved,
            &[(2, 1250), (3, 1250)],
        )];
        let balances = aggregate(MEHR_1404, [1, 2, 3], &expenses, &[]);
        assert_eq!(balances[&1], money(2500));
        assert_eq!(balances[&2], money(-1250));
        assert_eq!(balances[&3], money(-1250));
    }

    #[test]
    fn test_aggregate_scoped_only_sees_callers_records() {
        let expenses = [
            expense(1, 1, MEHR_1404, ExpenseStatus::Approved, &[(1, 1000), (2, 1000)]),
            expense(2, 3, MEHR_1404, ExpenseStatus::Approved, &[(3, 400), (1, 400)]),
            expense(3, 2, MEHR_1404, ExpenseStatus::Approved, &[(2, 900), (3, 900)]),
        ];
        let payments = [
            payment(1, 2, 1, MEHR_1404, 300),
            payment(2, 3, 2, MEHR_1404, 900),
        ];

        let mine = aggregate_scoped(MEHR_1404, 1, &expenses, &payments);
        assert_eq!(mine.len(), 2);
        assert_eq!(mine[&2], money(700));
        assert_eq!(mine[&3], money(-400));

        let global = aggregate(MEHR_1404, [1, 2, 3], &expenses, &payments);
        let scoped_total: Money = mine.values().copied().sum();
        assert_eq!(scoped_total, global[&1]);
    }

    #[test]
    fn test_aggregate_scoped_payment_to_caller() {
        let payments = [payment(1, 4, 1, MEHR_1404, 250)];
        let mine = aggregate_scoped(MEHR_1404, 1, &[], &payments);
        assert_eq!(mine[&4], money(-250));
    }
}
