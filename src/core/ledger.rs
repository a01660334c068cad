//! Cash ledger business logic - one `cash_days` row per calendar date.
//!
//! The ledger tracks opening cash, withdrawals and the spend of approved
//! expenses for each day. Every change goes through `apply_movement`, which
//! updates the running totals with a single atomic `UPDATE ... SET col = col + delta`
//! guarded by the row's `version`, and appends a matching `ledger_entries`
//! row in the same database transaction. A zero-row update means another
//! writer got there first and is reported as `Error::Conflict`.

use crate::{
    core::denomination::CurrencyBreakdown,
    entities::{
        CashDay, LedgerEntry, LedgerEntryKind, Withdrawal, WithdrawalType, cash_day,
        ledger_entry, withdrawal,
    },
    errors::{Error, Result},
};
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{QueryOrder, Set, SqlErr, TransactionTrait, prelude::*, sea_query::Expr};
use serde::Serialize;
use tracing::{debug, info, instrument};

const TOP_UP_PURPOSE: &str = "Opening cash top-up";

/// Largest amount a single opening cash, withdrawal or expense may carry.
///
/// Keeps every running total and period sum well inside `i64`.
pub const MAX_AMOUNT: i64 = 1_000_000_000_000;

/// Rejects amounts that are not positive or exceed [`MAX_AMOUNT`].
pub(crate) const fn ensure_amount(amount: i64) -> Result<()> {
    if amount <= 0 || amount > MAX_AMOUNT {
        return Err(Error::InvalidAmount { amount });
    }
    Ok(())
}

/// Whether `set_opening_cash` created the day or added to it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OpeningCashKind {
    /// First opening cash for the date; the day was created
    Setup,
    /// The day already existed; the amount was added as a withdrawal
    TopUp,
}

/// Result of [`set_opening_cash`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpeningCashOutcome {
    /// Ledger state after the call
    pub day: cash_day::Model,
    /// Setup or top-up
    pub kind: OpeningCashKind,
    /// The implicit withdrawal recorded for a top-up
    pub top_up: Option<withdrawal::Model>,
}

/// Input for [`record_withdrawal`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewWithdrawal {
    /// Amount withdrawn, must be positive
    pub amount: i64,
    /// Why the money was withdrawn, must not be blank
    pub purpose: String,
    /// Cash or bank transfer
    pub withdrawal_type: WithdrawalType,
    /// Optional longer description
    pub description: Option<String>,
    /// Optional note/coin composition; must add up to `amount`
    pub currency_notes: Option<CurrencyBreakdown>,
}

impl NewWithdrawal {
    /// A plain cash withdrawal with no description or breakdown.
    pub fn cash(amount: i64, purpose: impl Into<String>) -> Self {
        Self {
            amount,
            purpose: purpose.into(),
            withdrawal_type: WithdrawalType::Cash,
            description: None,
            currency_notes: None,
        }
    }

    fn validate(&self) -> Result<()> {
        ensure_amount(self.amount)?;
        if self.purpose.trim().is_empty() {
            return Err(Error::validation("Withdrawal purpose cannot be empty"));
        }
        if let Some(notes) = &self.currency_notes {
            notes.ensure_total(self.amount)?;
        }
        Ok(())
    }
}

/// A single change to a day's totals
struct Movement {
    kind: LedgerEntryKind,
    withdrawals: i64,
    spent: i64,
    expense_id: Option<i64>,
    withdrawal_id: Option<i64>,
    at: DateTime<Utc>,
}

impl Movement {
    const fn available_delta(&self) -> i64 {
        self.withdrawals - self.spent
    }

    /// The totals `day` would hold after this movement, if they fit in `i64`.
    fn checked_totals(&self, day: &cash_day::Model) -> Option<(i64, i64, i64)> {
        Some((
            day.total_withdrawals.checked_add(self.withdrawals)?,
            day.total_spent.checked_add(self.spent)?,
            day.available_amount.checked_add(self.available_delta())?,
        ))
    }
}

/// Finds the ledger row for `date`.
pub async fn get_cash_day<C>(db: &C, date: NaiveDate) -> Result<Option<cash_day::Model>>
where
    C: ConnectionTrait,
{
    CashDay::find_by_id(date).one(db).await.map_err(Into::into)
}

/// Cash available on `date`; zero when no ledger has been set up.
pub async fn available_amount<C>(db: &C, date: NaiveDate) -> Result<i64>
where
    C: ConnectionTrait,
{
    Ok(get_cash_day(db, date)
        .await?
        .map_or(0, |day| day.available_amount))
}

async fn require_cash_day<C>(db: &C, date: NaiveDate) -> Result<cash_day::Model>
where
    C: ConnectionTrait,
{
    get_cash_day(db, date)
        .await?
        .ok_or(Error::CashDayNotFound { date })
}

/// Applies `movement` to `day` and appends the audit entry.
///
/// The update only succeeds if the row still carries the version that was
/// read into `day`. Totals that would leave `i64` are refused with
/// `Error::Validation` before anything is written.
///
/// Transactions are opened deferred, so a second process holding the
/// `SQLite` write lock makes a write here fail with `SQLITE_BUSY`;
/// `CashOffice` reports that as `Error::Conflict` for the date.
async fn apply_movement<C>(
    db: &C,
    day: &cash_day::Model,
    movement: Movement,
) -> Result<cash_day::Model>
where
    C: ConnectionTrait,
{
    let delta = movement.available_delta();
    if movement.checked_totals(day).is_none() {
        return Err(Error::validation(format!(
            "Ledger totals for {} would overflow",
            day.date
        )));
    }

    let result = CashDay::update_many()
        .col_expr(
            cash_day::Column::TotalWithdrawals,
            Expr::col(cash_day::Column::TotalWithdrawals).add(movement.withdrawals),
        )
        .col_expr(
            cash_day::Column::TotalSpent,
            Expr::col(cash_day::Column::TotalSpent).add(movement.spent),
        )
        .col_expr(
            cash_day::Column::AvailableAmount,
            Expr::col(cash_day::Column::AvailableAmount).add(delta),
        )
        .col_expr(
            cash_day::Column::Version,
            Expr::col(cash_day::Column::Version).add(1),
        )
        .col_expr(cash_day::Column::UpdatedAt, Expr::value(movement.at))
        .filter(cash_day::Column::Date.eq(day.date))
        .filter(cash_day::Column::Version.eq(day.version))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return Err(Error::Conflict {
            date: day.date,
            detail: format!("ledger changed since version {} was read", day.version),
        });
    }

    let updated = require_cash_day(db, day.date).await?;

    ledger_entry::ActiveModel {
        cash_date: Set(day.date),
        kind: Set(movement.kind),
        amount: Set(delta),
        balance_after: Set(updated.available_amount),
        expense_id: Set(movement.expense_id),
        withdrawal_id: Set(movement.withdrawal_id),
        created_at: Set(movement.at),
        ..Default::default()
    }
    .insert(db)
    .await?;

    debug!(
        "Ledger {} {}: {:+} -> available {} (version {})",
        day.date, movement.kind, delta, updated.available_amount, updated.version
    );
    Ok(updated)
}

async fn insert_withdrawal<C>(
    db: &C,
    date: NaiveDate,
    withdrawal: NewWithdrawal,
    is_top_up: bool,
    at: DateTime<Utc>,
) -> Result<withdrawal::Model>
where
    C: ConnectionTrait,
{
    let currency_notes = withdrawal
        .currency_notes
        .as_ref()
        .map(CurrencyBreakdown::to_json)
        .transpose()?;

    withdrawal::ActiveModel {
        cash_date: Set(date),
        amount: Set(withdrawal.amount),
        purpose: Set(withdrawal.purpose.trim().to_string()),
        withdrawal_type: Set(withdrawal.withdrawal_type),
        description: Set(withdrawal.description),
        currency_notes: Set(currency_notes),
        is_top_up: Set(is_top_up),
        created_at: Set(at),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Creates the row for `date` with `amount` as opening cash.
///
/// A row that appeared after the caller's read is reported as a conflict.
async fn insert_cash_day<C>(
    db: &C,
    date: NaiveDate,
    amount: i64,
    notes: Option<String>,
    now: DateTime<Utc>,
) -> Result<cash_day::Model>
where
    C: ConnectionTrait,
{
    let inserted = cash_day::ActiveModel {
        date: Set(date),
        opening_cash: Set(amount),
        total_withdrawals: Set(0),
        total_spent: Set(0),
        available_amount: Set(amount),
        notes: Set(notes),
        version: Set(0),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await;

    match inserted {
        Ok(day) => Ok(day),
        Err(err) => {
            let duplicate = matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
                || get_cash_day(db, date).await?.is_some();
            if duplicate {
                return Err(Error::Conflict {
                    date,
                    detail: "cash day was set up concurrently".to_string(),
                });
            }
            Err(err.into())
        }
    }
}

/// Sets up the ledger for `date`, or tops it up if it already exists.
///
/// The first call for a date creates the day with `amount` as opening cash.
/// Later calls leave `opening_cash` untouched and record `amount` as an
/// implicit withdrawal, so the caller can tell "setup" from "added".
///
/// # Errors
/// * `Error::InvalidAmount` if `amount` is not positive or above [`MAX_AMOUNT`]
/// * `Error::Conflict` if another writer created or changed the day concurrently
#[instrument(skip(db, notes))]
pub async fn set_opening_cash(
    db: &DatabaseConnection,
    date: NaiveDate,
    amount: i64,
    notes: Option<String>,
    now: DateTime<Utc>,
) -> Result<OpeningCashOutcome> {
    ensure_amount(amount)?;

    let txn = db.begin().await?;

    if let Some(existing) = get_cash_day(&txn, date).await? {
        let mut top_up = NewWithdrawal::cash(amount, TOP_UP_PURPOSE);
        top_up.description = notes;
        let withdrawal = insert_withdrawal(&txn, date, top_up, true, now).await?;
        let day = apply_movement(
            &txn,
            &existing,
            Movement {
                kind: LedgerEntryKind::TopUp,
                withdrawals: amount,
                spent: 0,
                expense_id: None,
                withdrawal_id: Some(withdrawal.id),
                at: now,
            },
        )
        .await?;
        txn.commit().await?;

        info!(
            "Topped up cash for {} by {}: available {}",
            date, amount, day.available_amount
        );
        return Ok(OpeningCashOutcome {
            day,
            kind: OpeningCashKind::TopUp,
            top_up: Some(withdrawal),
        });
    }

    let day = insert_cash_day(&txn, date, amount, notes, now).await?;

    ledger_entry::ActiveModel {
        cash_date: Set(date),
        kind: Set(LedgerEntryKind::Opening),
        amount: Set(amount),
        balance_after: Set(day.available_amount),
        expense_id: Set(None),
        withdrawal_id: Set(None),
        created_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;

    info!("Set up cash for {} with opening cash {}", date, amount);
    Ok(OpeningCashOutcome {
        day,
        kind: OpeningCashKind::Setup,
        top_up: None,
    })
}

/// Records a withdrawal against an existing day, raising its available cash.
///
/// Withdrawals are never capped.
///
/// # Errors
/// * `Error::InvalidAmount` / `Error::Validation` for bad input
/// * `Error::CashDayNotFound` if the day has not been set up
#[instrument(skip(db, withdrawal), fields(amount = withdrawal.amount))]
pub async fn record_withdrawal(
    db: &DatabaseConnection,
    date: NaiveDate,
    withdrawal: NewWithdrawal,
    now: DateTime<Utc>,
) -> Result<(cash_day::Model, withdrawal::Model)> {
    withdrawal.validate()?;

    let txn = db.begin().await?;

    let existing = require_cash_day(&txn, date).await?;
    let amount = withdrawal.amount;
    let recorded = insert_withdrawal(&txn, date, withdrawal, false, now).await?;
    let day = apply_movement(
        &txn,
        &existing,
        Movement {
            kind: LedgerEntryKind::Withdrawal,
            withdrawals: amount,
            spent: 0,
            expense_id: None,
            withdrawal_id: Some(recorded.id),
            at: now,
        },
    )
    .await?;

    txn.commit().await?;

    info!(
        "Recorded withdrawal {} of {} for {} ({}): available {}",
        recorded.id, amount, date, recorded.purpose, day.available_amount
    );
    Ok((day, recorded))
}

/// Charges an approved expense to the ledger for `date`.
///
/// The balance may go negative; the admission decision was made when the
/// expense was created.
pub(crate) async fn debit<C>(
    db: &C,
    date: NaiveDate,
    amount: i64,
    expense_id: i64,
    now: DateTime<Utc>,
) -> Result<cash_day::Model>
where
    C: ConnectionTrait,
{
    let day = require_cash_day(db, date).await?;
    apply_movement(
        db,
        &day,
        Movement {
            kind: LedgerEntryKind::Debit,
            withdrawals: 0,
            spent: amount,
            expense_id: Some(expense_id),
            withdrawal_id: None,
            at: now,
        },
    )
    .await
}

/// Reverses an earlier [`debit`] when an approved or paid expense is deleted.
pub(crate) async fn credit<C>(
    db: &C,
    date: NaiveDate,
    amount: i64,
    expense_id: i64,
    now: DateTime<Utc>,
) -> Result<cash_day::Model>
where
    C: ConnectionTrait,
{
    let day = require_cash_day(db, date).await?;
    apply_movement(
        db,
        &day,
        Movement {
            kind: LedgerEntryKind::Credit,
            withdrawals: 0,
            spent: -amount,
            expense_id: Some(expense_id),
            withdrawal_id: None,
            at: now,
        },
    )
    .await
}

/// Withdrawals recorded against `date`, oldest first.
pub async fn list_withdrawals<C>(db: &C, date: NaiveDate) -> Result<Vec<withdrawal::Model>>
where
    C: ConnectionTrait,
{
    list_withdrawals_between(db, date, date).await
}

/// Withdrawals whose ledger day falls in `[start, end]`, oldest first.
pub async fn list_withdrawals_between<C>(
    db: &C,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<withdrawal::Model>>
where
    C: ConnectionTrait,
{
    Withdrawal::find()
        .filter(withdrawal::Column::CashDate.between(start, end))
        .order_by_asc(withdrawal::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Audit entries for `date` in commit order.
pub async fn list_ledger_entries<C>(db: &C, date: NaiveDate) -> Result<Vec<ledger_entry::Model>>
where
    C: ConnectionTrait,
{
    LedgerEntry::find()
        .filter(ledger_entry::Column::CashDate.eq(date))
        .order_by_asc(ledger_entry::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}
