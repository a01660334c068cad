//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod cash_day;
pub mod expense;
pub mod ledger_entry;
pub mod withdrawal;

// Re-export specific types to avoid conflicts
pub use cash_day::{Column as CashDayColumn, Entity as CashDay, Model as CashDayModel};
pub use expense::{
    Column as ExpenseColumn, Entity as Expense, ExpenseCategory, ExpenseStatus, ExpenseType,
    Model as ExpenseModel, Priority, Role,
};
pub use ledger_entry::{
    Column as LedgerEntryColumn, Entity as LedgerEntry, LedgerEntryKind,
    Model as LedgerEntryModel,
};
pub use withdrawal::{
    Column as WithdrawalColumn, Entity as Withdrawal, Model as WithdrawalModel, WithdrawalType,
};
