//! Unified error type for the cash ledger and expense workflow.
//!
//! Every variant carries the structured data (amounts, ids, states) a caller
//! needs to render an actionable message without re-querying.

use crate::entities::{ExpenseStatus, Role};
use chrono::NaiveDate;
use sea_orm::{DbErr, RuntimeErr, sqlx};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Invalid amount: {amount} (must be greater than zero)")]
    InvalidAmount { amount: i64 },

    #[error(
        "Insufficient funds: available {available}, required {required}, shortfall {shortfall}"
    )]
    InsufficientFunds {
        available: i64,
        required: i64,
        shortfall: i64,
    },

    #[error("Permission denied: role '{role}' may not {action}")]
    PermissionDenied { role: Role, action: String },

    #[error("Invalid transition: cannot move expense from '{from}' to '{to}'")]
    InvalidTransition {
        from: ExpenseStatus,
        to: ExpenseStatus,
    },

    #[error("Expense not found: {id}")]
    ExpenseNotFound { id: i64 },

    #[error("No cash ledger has been set up for {date}")]
    CashDayNotFound { date: NaiveDate },

    #[error("Concurrent modification for {date}: {detail}")]
    Conflict { date: NaiveDate, detail: String },

    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),
}

impl Error {
    /// Shorthand for a [`Error::Validation`] with the given message.
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Reports a `SQLite` busy or locked failure as a conflict on `date`.
    ///
    /// Another process holding the write lock is a lost race, like a stale
    /// ledger version. Every other error passes through unchanged.
    #[must_use]
    pub(crate) fn busy_as_conflict(self, date: NaiveDate) -> Self {
        match self {
            Self::Database(err) if is_busy(&err) => Self::Conflict {
                date,
                detail: format!("database is busy: {err}"),
            },
            other => other,
        }
    }
}

// SQLITE_BUSY (5) and SQLITE_LOCKED (6), including their extended codes
fn is_busy(err: &DbErr) -> bool {
    let (DbErr::Conn(RuntimeErr::SqlxError(sqlx::Error::Database(db_err)))
    | DbErr::Exec(RuntimeErr::SqlxError(sqlx::Error::Database(db_err)))
    | DbErr::Query(RuntimeErr::SqlxError(sqlx::Error::Database(db_err)))) = err
    else {
        return false;
    };
    db_err
        .code()
        .and_then(|code| code.parse::<i32>().ok())
        .is_some_and(|code| matches!(code & 0xff, 5 | 6))
}

// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_other_errors_are_not_conflicts() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();

        let db = Error::Database(DbErr::Custom("disk I/O error".into())).busy_as_conflict(date);
        assert!(matches!(db, Error::Database(_)));

        let amount = Error::InvalidAmount { amount: 0 }.busy_as_conflict(date);
        assert!(matches!(amount, Error::InvalidAmount { amount: 0 }));
    }
}
