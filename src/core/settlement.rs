//! Debt settlement - turns net balances into a short list of transfers.
//!
//! Debtors and creditors are each sorted by magnitude, largest first, and the largest
//! remaining debtor always pays the largest remaining creditor. Every step zeroes at
//! least one side, so the plan never has more than `debtors + creditors - 1` transfers.

use crate::core::ledger::Balances;
use crate::core::money::{Money, round2};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Remainders at or below this magnitude count as settled rounding noise.
pub const SETTLE_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 4);

/// One suggested payment from a debtor to a creditor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    /// User who should pay
    #[serde(rename = "from_user_id")]
    pub from: i64,
    /// User who should receive
    #[serde(rename = "to_user_id")]
    pub to: i64,
    /// Amount to pay, always positive
    pub amount: Money,
}

fn is_settled(amount: Money) -> bool {
    amount.abs().to_decimal() <= SETTLE_TOLERANCE
}

/// Computes the transfers that bring every balance to zero.
///
/// Positive balances are creditors, negative ones debtors. Ties in magnitude keep
/// the iteration order of `balances` (ascending user id). If the balances do not sum
/// to zero, whatever is left over on the longer side stays unmatched.
#[must_use]
pub fn settle(balances: &Balances) -> Vec<Transfer> {
    let mut debtors: Vec<(i64, Money)> = balances
        .iter()
        .filter(|(_, balance)| balance.is_negative() && !is_settled(**balance))
        .map(|(user_id, balance)| (*user_id, balance.abs()))
        .collect();
    let mut creditors: Vec<(i64, Money)> = balances
        .iter()
        .filter(|(_, balance)| balance.is_positive() && !is_settled(**balance))
        .map(|(user_id, balance)| (*user_id, *balance))
        .collect();

    // sort_by is stable, so equal magnitudes keep input order
    debtors.sort_by(|a, b| b.1.cmp(&a.1));
    creditors.sort_by(|a, b| b.1.cmp(&a.1));

    let mut transfers = Vec::with_capacity(debtors.len() + creditors.len());
    let (mut i, mut j) = (0, 0);
    while i < debtors.len() && j < creditors.len() {
        let (debtor, owed) = debtors[i];
        let (creditor, due) = creditors[j];

        let amount = round2(owed.min(due).to_decimal());
        if amount.is_positive() {
            transfers.push(Transfer {
                from: debtor,
                to: creditor,
                amount,
            });
        }

        debtors[i].1 = owed - amount;
        creditors[j].1 = due - amount;

        if debtors[i].1.to_decimal() <= SETTLE_TOLERANCE {
            i += 1;
        }
        if creditors[j].1.to_decimal() <= SETTLE_TOLERANCE {
            j += 1;
        }
    }

    transfers
}
