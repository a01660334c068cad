//! Shared test utilities for `cashbook`.
//!
//! This module provides common helper functions for setting up test databases
//! and creating ledgers, actors and expenses with sensible defaults.

#![allow(clippy::unwrap_used)]

use crate::{
    core::{
        expense::{self, Actor, CreatedExpense, NewExpense},
        ledger,
        workflow::PermissionTable,
    },
    entities::{ExpenseCategory, Role},
    errors::Result,
};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use sea_orm::DatabaseConnection;

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all database tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// The ledger date most tests work on, a Wednesday.
#[must_use]
pub fn test_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 10).unwrap()
}

/// 09:30 UTC on [`test_date`].
#[must_use]
pub fn test_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 10, 9, 30, 0).unwrap()
}

/// Sets up a test database with opening cash on [`test_date`].
pub async fn setup_with_cash_day(opening_cash: i64) -> Result<DatabaseConnection> {
    let db = setup_test_db().await?;
    ledger::set_opening_cash(&db, test_date(), opening_cash, None, test_now()).await?;
    Ok(db)
}

/// An admin actor.
#[must_use]
pub fn admin() -> Actor {
    Actor::new("admin-1", Role::Admin)
}

/// A manager actor.
#[must_use]
pub fn manager() -> Actor {
    Actor::new("manager-1", Role::Manager)
}

/// An officer actor.
#[must_use]
pub fn officer() -> Actor {
    Actor::new("officer-1", Role::Officer)
}

/// Creates a pending expense dated [`test_date`] with sensible defaults.
///
/// # Defaults
/// * created by [`manager`] with the default permissions
/// * category: miscellaneous
/// * `proceed_anyway`: false
pub async fn create_test_expense(db: &DatabaseConnection, amount: i64) -> Result<CreatedExpense> {
    let new = NewExpense::new("Test expense", amount, ExpenseCategory::Miscellaneous).on(test_date());
    expense::create_expense(
        db,
        &PermissionTable::default(),
        new,
        &manager(),
        false,
        test_now(),
    )
    .await
}
