/// Admission control: is there enough cash for an expense?
pub mod admission;
/// Injectable time source
pub mod clock;
/// Notes, coins and cash breakdowns
pub mod denomination;
/// Expense creation, approval workflow, deletion and listing
pub mod expense;
/// Per-date cash ledger
pub mod ledger;
/// Service facade over the ledger and expense workflow
pub mod office;
/// Today, weekly and monthly summaries
pub mod period;
/// Approval state machine and role permissions
pub mod workflow;

pub use clock::{Clock, FixedClock, SystemClock};
pub use expense::{Actor, ExpenseFilter, NewExpense};
pub use ledger::NewWithdrawal;
pub use office::CashOffice;
pub use period::Period;
