//! Entity module - Contains all SeaORM entity definitions for the database.
//! Expenses and their participant rows are stored independently and related by id;
//! the cascade from expense to participants lives in the foreign key, not in the models.

pub mod expense;
pub mod expense_participant;
pub mod payment;
pub mod user;

// Re-export specific types to avoid conflicts
pub use expense::{Column as ExpenseColumn, Entity as Expense, Model as ExpenseModel};
pub use expense_participant::{
    Column as ExpenseParticipantColumn, Entity as ExpenseParticipant,
    Model as ExpenseParticipantModel,
};
pub use payment::{Column as PaymentColumn, Entity as Payment, Model as PaymentModel};
pub use user::{Column as UserColumn, Entity as User, Model as UserModel};
