/// Cent-exact money amounts and rounding
pub mod money;

/// Jalali calendar periods
pub mod period;

/// User registration and eligibility
pub mod user;

/// Shared expenses and the participant approval workflow
pub mod expense;

/// Direct payments between users
pub mod payment;

/// Balance aggregation over approved expenses and payments
pub mod ledger;

/// Greedy debt settlement
pub mod settlement;

/// Admin and personal settlement views
pub mod view;
