//! The cash office service - one entry point for every ledger and expense operation.
//!
//! [`CashOffice`] owns the database connection, the clock and the loaded
//! settings. Mutations are serialized per ledger date: the admission check and
//! the write for one date never interleave with another mutation of the same
//! date, while different dates proceed independently. A write refused because
//! another process holds the database lock is reported as `Error::Conflict`.

use crate::{
    config::settings::Settings,
    core::{
        admission::{self, SufficiencyCheck},
        clock::{Clock, SystemClock},
        denomination::CurrencyBreakdown,
        expense::{
            self, Actor, CreatedExpense, DeletedExpense, ExpenseFilter, NewExpense,
            TransitionOutcome,
        },
        ledger::{self, NewWithdrawal, OpeningCashOutcome},
        period::{self, Period, PeriodSummary},
    },
    entities::{ExpenseStatus, cash_day, expense as expense_entity, ledger_entry, withdrawal},
    errors::{Error, Result},
};
use chrono::NaiveDate;
use sea_orm::DatabaseConnection;
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::debug;

type DateLocks = HashMap<NaiveDate, Arc<AsyncMutex<()>>>;

/// Service facade over the cash ledger and expense workflow
#[derive(Debug)]
pub struct CashOffice {
    db: DatabaseConnection,
    clock: Arc<dyn Clock>,
    settings: Arc<Settings>,
    locks: Mutex<DateLocks>,
}

impl CashOffice {
    /// Creates an office over `db` with the given settings and clock.
    pub fn new(db: DatabaseConnection, settings: Settings, clock: Arc<dyn Clock>) -> Self {
        Self {
            db,
            clock,
            settings: Arc::new(settings),
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Creates an office that reads the wall clock.
    pub fn with_system_clock(db: DatabaseConnection, settings: Settings) -> Self {
        Self::new(db, settings, Arc::new(SystemClock))
    }

    /// The underlying connection.
    #[must_use]
    pub const fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    /// The loaded settings.
    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Today's date according to the office clock.
    #[must_use]
    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    /// Waits for exclusive access to `date`'s ledger.
    async fn lock_date(&self, date: NaiveDate) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            // Drop locks nobody is holding or waiting on
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            Arc::clone(locks.entry(date).or_default())
        };
        debug!("Waiting for ledger lock on {}", date);
        lock.lock_owned().await
    }

    /// Ledger for `date`, or for today when `date` is `None`.
    pub async fn get_daily_cash(&self, date: Option<NaiveDate>) -> Result<Option<cash_day::Model>> {
        let date = date.unwrap_or_else(|| self.today());
        ledger::get_cash_day(&self.db, date).await
    }

    /// Sets up or tops up the ledger for `date`.
    pub async fn set_daily_cash(
        &self,
        date: NaiveDate,
        opening_cash: i64,
        notes: Option<String>,
    ) -> Result<OpeningCashOutcome> {
        let _guard = self.lock_date(date).await;
        ledger::set_opening_cash(&self.db, date, opening_cash, notes, self.clock.now())
            .await
            .map_err(|e| e.busy_as_conflict(date))
    }

    /// Records a withdrawal against `date`.
    pub async fn record_withdrawal(
        &self,
        date: NaiveDate,
        withdrawal: NewWithdrawal,
    ) -> Result<(cash_day::Model, withdrawal::Model)> {
        let _guard = self.lock_date(date).await;
        ledger::record_withdrawal(&self.db, date, withdrawal, self.clock.now())
            .await
            .map_err(|e| e.busy_as_conflict(date))
    }

    /// Checks `amount` against today's available cash.
    pub async fn check_sufficient_cash(&self, amount: i64) -> Result<SufficiencyCheck> {
        admission::check_sufficient_cash(&self.db, self.today(), amount).await
    }

    /// Builds a breakdown from label/count pairs using the configured denominations.
    pub fn currency_breakdown<I, S>(&self, counts: I) -> Result<CurrencyBreakdown>
    where
        I: IntoIterator<Item = (S, u32)>,
        S: Into<String>,
    {
        CurrencyBreakdown::from_counts(&self.settings.denominations, counts)
    }

    /// Creates a `pending` expense, checking cash on its ledger day.
    pub async fn create_expense(
        &self,
        new: NewExpense,
        actor: &Actor,
        proceed_anyway: bool,
    ) -> Result<CreatedExpense> {
        let now = self.clock.now();
        let date = new.ledger_date(now);
        let _guard = self.lock_date(date).await;
        expense::create_expense(
            &self.db,
            &self.settings.permissions,
            new,
            actor,
            proceed_anyway,
            now,
        )
        .await
        .map_err(|e| e.busy_as_conflict(date))
    }

    async fn expense_ledger_date(&self, id: i64) -> Result<NaiveDate> {
        expense::get_expense_by_id(&self.db, id)
            .await?
            .map(|e| e.ledger_date())
            .ok_or(Error::ExpenseNotFound { id })
    }

    /// Moves expense `id` to `target`.
    pub async fn transition_expense(
        &self,
        id: i64,
        target: ExpenseStatus,
        actor: &Actor,
    ) -> Result<TransitionOutcome> {
        let date = self.expense_ledger_date(id).await?;
        let _guard = self.lock_date(date).await;
        expense::transition_expense(
            &self.db,
            &self.settings.permissions,
            id,
            target,
            actor,
            self.clock.now(),
        )
        .await
        .map_err(|e| e.busy_as_conflict(date))
    }

    /// Deletes expense `id`, crediting its ledger day if it had consumed cash.
    pub async fn delete_expense(&self, id: i64, actor: &Actor) -> Result<DeletedExpense> {
        self.settings.permissions.ensure_delete(actor.role)?;
        let date = self.expense_ledger_date(id).await?;
        let _guard = self.lock_date(date).await;
        expense::delete_expense(
            &self.db,
            &self.settings.permissions,
            id,
            actor,
            self.clock.now(),
        )
        .await
        .map_err(|e| e.busy_as_conflict(date))
    }

    /// Retrieves one expense.
    pub async fn get_expense(&self, id: i64) -> Result<Option<expense_entity::Model>> {
        expense::get_expense_by_id(&self.db, id).await
    }

    /// Lists expenses matching `filter`, newest first.
    pub async fn list_expenses(&self, filter: &ExpenseFilter) -> Result<Vec<expense_entity::Model>> {
        expense::list_expenses(&self.db, filter).await
    }

    /// Withdrawals recorded against `date`.
    pub async fn list_withdrawals(&self, date: NaiveDate) -> Result<Vec<withdrawal::Model>> {
        ledger::list_withdrawals(&self.db, date).await
    }

    /// Audit trail for `date`.
    pub async fn list_ledger_entries(&self, date: NaiveDate) -> Result<Vec<ledger_entry::Model>> {
        ledger::list_ledger_entries(&self.db, date).await
    }

    /// Summary of `period` as of now.
    pub async fn summarize(&self, period: Period) -> Result<PeriodSummary> {
        period::load_period_summary(
            &self.db,
            period,
            self.clock.now(),
            &self.settings.budgets,
            self.settings.week_starts_on,
        )
        .await
    }

    /// Renders `summary` with the configured currency symbol.
    #[must_use]
    pub fn format_summary(&self, summary: &PeriodSummary) -> String {
        period::format_period_summary(summary, &self.settings.currency_symbol)
    }
}
