//! Period summaries - expense totals for today, this week and this month.
//!
//! [`summarize`] is pure: it takes the expenses and withdrawals already
//! loaded, a reference instant and the configured budgets, and returns a
//! [`PeriodSummary`]. [`load_period_summary`] does the loading.

use crate::{
    core::{
        expense::{ExpenseFilter, list_expenses},
        ledger,
    },
    entities::{ExpenseStatus, expense, withdrawal},
    errors::{Error, Result},
};
use chrono::{DateTime, Datelike, Duration, NaiveTime, Utc, Weekday};
use sea_orm::ConnectionTrait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

/// Reporting period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Period {
    /// The current UTC calendar day
    Today,
    /// Start of the current week up to now
    Weekly,
    /// First of the current month up to now
    Monthly,
}

impl Period {
    /// Every period, shortest first.
    pub const ALL: [Self; 3] = [Self::Today, Self::Weekly, Self::Monthly];
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Today => "today",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        })
    }
}

impl FromStr for Period {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "today" | "daily" => Ok(Self::Today),
            "weekly" | "week" => Ok(Self::Weekly),
            "monthly" | "month" => Ok(Self::Monthly),
            other => Err(Error::validation(format!("unknown period '{other}'"))),
        }
    }
}

/// Spending budget per period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetTable {
    /// Budget for a single day
    pub today: i64,
    /// Budget for a week
    pub weekly: i64,
    /// Budget for a month
    pub monthly: i64,
}

impl Default for BudgetTable {
    fn default() -> Self {
        Self {
            today: 10_000,
            weekly: 70_000,
            monthly: 300_000,
        }
    }
}

impl BudgetTable {
    /// Budget for `period`.
    #[must_use]
    pub const fn for_period(&self, period: Period) -> i64 {
        match period {
            Period::Today => self.today,
            Period::Weekly => self.weekly,
            Period::Monthly => self.monthly,
        }
    }

    /// Rejects negative budgets.
    pub fn validate(&self) -> Result<()> {
        for period in Period::ALL {
            let budget = self.for_period(period);
            if budget < 0 {
                return Err(Error::Config {
                    message: format!("{period} budget cannot be negative ({budget})"),
                });
            }
        }
        Ok(())
    }
}

/// Time window a period covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PeriodWindow {
    /// Inclusive start
    pub start: DateTime<Utc>,
    /// End of the window
    pub end: DateTime<Utc>,
    /// Whether `end` itself belongs to the window
    pub end_inclusive: bool,
}

impl PeriodWindow {
    /// Whether `instant` falls inside the window.
    #[must_use]
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.start
            && if self.end_inclusive {
                instant <= self.end
            } else {
                instant < self.end
            }
    }
}

/// Computes the window of `period` around `reference`.
///
/// `Today` is `[midnight, next midnight)`. `Weekly` runs from midnight of the
/// most recent `week_start` day to `reference` inclusive, and `Monthly` from
/// midnight of the first of the month to `reference` inclusive.
#[must_use]
pub fn window(period: Period, reference: DateTime<Utc>, week_start: Weekday) -> PeriodWindow {
    let today = reference.date_naive();
    let midnight = |date: chrono::NaiveDate| date.and_time(NaiveTime::MIN).and_utc();

    match period {
        Period::Today => {
            let start = midnight(today);
            PeriodWindow {
                start,
                end: start + Duration::days(1),
                end_inclusive: false,
            }
        }
        Period::Weekly => {
            let days_back = (7 + today.weekday().num_days_from_monday()
                - week_start.num_days_from_monday())
                % 7;
            PeriodWindow {
                start: midnight(today - Duration::days(i64::from(days_back))),
                end: reference,
                end_inclusive: true,
            }
        }
        Period::Monthly => PeriodWindow {
            start: midnight(today - Duration::days(i64::from(today.day0()))),
            end: reference,
            end_inclusive: true,
        },
    }
}

/// The ledger data a summary needs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerView {
    /// Available cash on the current date's ledger
    pub current_available: i64,
    /// Withdrawals (including top-ups) that may fall in the window
    pub withdrawals: Vec<withdrawal::Model>,
}

/// Aggregated view of one period
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PeriodSummary {
    /// Which period
    pub period: Period,
    /// Window start
    pub window_start: DateTime<Utc>,
    /// Window end
    pub window_end: DateTime<Utc>,
    /// Expenses in the window
    pub total_count: usize,
    /// Sum of their amounts, saturating at `i64::MAX`
    pub total_amount: i64,
    /// Pending expenses in the window
    pub pending_count: usize,
    /// Sum of pending amounts
    pub pending_amount: i64,
    /// Approved expenses in the window
    pub approved_count: usize,
    /// Sum of approved amounts
    pub approved_amount: i64,
    /// Rejected expenses in the window
    pub rejected_count: usize,
    /// Sum of rejected amounts
    pub rejected_amount: i64,
    /// Paid expenses in the window
    pub paid_count: usize,
    /// Sum of paid amounts
    pub paid_amount: i64,
    /// Withdrawals whose ledger day starts inside the window
    pub withdrawals_in_period: i64,
    /// Available cash on the current date, whatever the period
    pub cash_remaining: i64,
    /// Configured budget for the period
    pub budget: i64,
    /// `total_amount > budget`
    pub is_over_budget: bool,
    /// `max(0, total_amount - budget)`
    pub over_budget_amount: i64,
    /// Expenses bucketed by creation time because they had no date
    pub fallback_dated_count: usize,
}

impl PeriodSummary {
    /// Count and amount for one status.
    #[must_use]
    pub const fn status_totals(&self, status: ExpenseStatus) -> (usize, i64) {
        match status {
            ExpenseStatus::Pending => (self.pending_count, self.pending_amount),
            ExpenseStatus::Approved => (self.approved_count, self.approved_amount),
            ExpenseStatus::Rejected => (self.rejected_count, self.rejected_amount),
            ExpenseStatus::Paid => (self.paid_count, self.paid_amount),
        }
    }

    /// Share of the budget used, in whole percent. Zero budget reports zero.
    #[must_use]
    pub fn budget_used_percent(&self) -> i64 {
        if self.budget == 0 {
            return 0;
        }
        self.total_amount.saturating_mul(100) / self.budget
    }
}

/// Builds the summary of `period` at `reference` from already loaded data.
#[must_use]
pub fn summarize(
    expenses: &[expense::Model],
    ledger: &LedgerView,
    period: Period,
    reference: DateTime<Utc>,
    budgets: &BudgetTable,
    week_start: Weekday,
) -> PeriodSummary {
    let window = window(period, reference, week_start);
    let budget = budgets.for_period(period);

    let mut summary = PeriodSummary {
        period,
        window_start: window.start,
        window_end: window.end,
        total_count: 0,
        total_amount: 0,
        pending_count: 0,
        pending_amount: 0,
        approved_count: 0,
        approved_amount: 0,
        rejected_count: 0,
        rejected_amount: 0,
        paid_count: 0,
        paid_amount: 0,
        withdrawals_in_period: 0,
        cash_remaining: ledger.current_available,
        budget,
        is_over_budget: false,
        over_budget_amount: 0,
        fallback_dated_count: 0,
    };

    for expense in expenses {
        let (instant, fallback) = expense.effective_instant();
        if !window.contains(instant) {
            continue;
        }
        if fallback {
            warn!(
                "Expense {} has no expense date, bucketing by created_at {}",
                expense.id, expense.created_at
            );
            summary.fallback_dated_count += 1;
        }

        summary.total_count += 1;
        summary.total_amount = summary.total_amount.saturating_add(expense.amount);
        let (count, amount) = match expense.status {
            ExpenseStatus::Pending => (&mut summary.pending_count, &mut summary.pending_amount),
            ExpenseStatus::Approved => (&mut summary.approved_count, &mut summary.approved_amount),
            ExpenseStatus::Rejected => (&mut summary.rejected_count, &mut summary.rejected_amount),
            ExpenseStatus::Paid => (&mut summary.paid_count, &mut summary.paid_amount),
        };
        *count += 1;
        *amount = amount.saturating_add(expense.amount);
    }

    summary.withdrawals_in_period = ledger
        .withdrawals
        .iter()
        .filter(|w| window.contains(w.cash_date.and_time(NaiveTime::MIN).and_utc()))
        .fold(0_i64, |total, w| total.saturating_add(w.amount));

    summary.over_budget_amount = summary.total_amount.saturating_sub(budget).max(0);
    summary.is_over_budget = summary.total_amount > budget;

    debug!(
        "{} summary: {} expenses totalling {} against budget {}",
        period, summary.total_count, summary.total_amount, budget
    );
    summary
}

/// Loads the expenses and withdrawals for `period` at `now` and summarizes them.
pub async fn load_period_summary<C>(
    db: &C,
    period: Period,
    now: DateTime<Utc>,
    budgets: &BudgetTable,
    week_start: Weekday,
) -> Result<PeriodSummary>
where
    C: ConnectionTrait,
{
    let window = window(period, now, week_start);
    let first_day = window.start.date_naive();
    let last_day = window.end.date_naive();

    let expenses = list_expenses(
        db,
        &ExpenseFilter {
            date_range: Some((first_day, last_day)),
            ..Default::default()
        },
    )
    .await?;

    let view = LedgerView {
        current_available: ledger::available_amount(db, now.date_naive()).await?,
        withdrawals: ledger::list_withdrawals_between(db, first_day, last_day).await?,
    };

    Ok(summarize(
        &expenses,
        &view,
        period,
        now,
        budgets,
        week_start,
    ))
}

/// Formats an amount with thousands separators, e.g. `₹12,500` or `-₹300`.
#[must_use]
pub fn format_amount(amount: i64, currency_symbol: &str) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let sign = if amount < 0 { "-" } else { "" };
    format!("{sign}{currency_symbol}{grouped}")
}

/// Text bar of budget usage, e.g. `[████░░░░░░] 40%`.
#[must_use]
pub fn format_budget_bar(used_percent: i64, bar_length: usize) -> String {
    let clamped = used_percent.clamp(0, 100);
    let filled = usize::try_from(clamped)
        .map_or(0, |p| (p * bar_length + 50) / 100)
        .min(bar_length);
    format!(
        "[{}{}] {used_percent}%",
        "█".repeat(filled),
        "░".repeat(bar_length - filled)
    )
}

/// Renders a summary as multi-line text for logs and terminals.
#[must_use]
pub fn format_period_summary(summary: &PeriodSummary, currency_symbol: &str) -> String {
    let money = |amount| format_amount(amount, currency_symbol);

    let mut text = format!(
        "{} summary ({} to {})\n",
        summary.period,
        summary.window_start.format("%Y-%m-%d %H:%M"),
        summary.window_end.format("%Y-%m-%d %H:%M"),
    );
    text.push_str(&format!(
        "  Expenses: {} totalling {}\n",
        summary.total_count,
        money(summary.total_amount)
    ));

    for status in [
        ExpenseStatus::Pending,
        ExpenseStatus::Approved,
        ExpenseStatus::Rejected,
        ExpenseStatus::Paid,
    ] {
        let (count, amount) = summary.status_totals(status);
        text.push_str(&format!("    {status}: {count} ({})\n", money(amount)));
    }

    text.push_str(&format!(
        "  Withdrawals: {}\n  Cash remaining today: {}\n",
        money(summary.withdrawals_in_period),
        money(summary.cash_remaining)
    ));
    text.push_str(&format!(
        "  Budget: {} {}\n",
        money(summary.budget),
        format_budget_bar(summary.budget_used_percent(), 10)
    ));
    if summary.is_over_budget {
        text.push_str(&format!(
            "  Over budget by {}\n",
            money(summary.over_budget_amount)
        ));
    }
    if summary.fallback_dated_count > 0 {
        text.push_str(&format!(
            "  {} undated expense(s) counted by creation time\n",
            summary.fallback_dated_count
        ));
    }

    text
}
