//! Expense entity - An expense request moving through the approval workflow.
//!
//! Each expense carries its amount, classification, workflow status, the
//! informational approval chain (`prepared_by`, `checked_by`, `passed_by`) and
//! the identity and role of whoever created it. Status changes are driven only
//! through `core::expense`, which enforces the transition graph in
//! `core::workflow`.

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Workflow status of an expense
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum ExpenseStatus {
    /// Awaiting an admin decision
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Approved; the amount has been debited from the ledger
    #[sea_orm(string_value = "approved")]
    Approved,
    /// Rejected; terminal
    #[sea_orm(string_value = "rejected")]
    Rejected,
    /// Settled; terminal
    #[sea_orm(string_value = "paid")]
    Paid,
}

impl ExpenseStatus {
    /// Whether money for an expense in this status has left the ledger.
    #[must_use]
    pub const fn consumes_cash(self) -> bool {
        matches!(self, Self::Approved | Self::Paid)
    }

    /// Lowercase name used in messages and storage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Paid => "paid",
        }
    }
}

impl fmt::Display for ExpenseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role of the officer performing an action
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Full control over the workflow
    #[sea_orm(string_value = "admin")]
    Admin,
    /// Branch manager, may raise expenses
    #[sea_orm(string_value = "manager")]
    Manager,
    /// Field officer, read-only with the default permissions
    #[sea_orm(string_value = "officer")]
    Officer,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Admin => "admin",
            Self::Manager => "manager",
            Self::Officer => "officer",
        })
    }
}

/// Closed set of expense categories
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
pub enum ExpenseCategory {
    /// Stationery, furniture and consumables
    #[sea_orm(string_value = "office_supplies")]
    OfficeSupplies,
    /// Fares, fuel and lodging
    #[sea_orm(string_value = "travel")]
    Travel,
    /// Power, water and similar bills
    #[sea_orm(string_value = "utilities")]
    Utilities,
    /// Premises rent
    #[sea_orm(string_value = "rent")]
    Rent,
    /// Wages and advances
    #[sea_orm(string_value = "salary")]
    Salary,
    /// Repairs and upkeep
    #[sea_orm(string_value = "maintenance")]
    Maintenance,
    /// Phone, internet and courier
    #[sea_orm(string_value = "communication")]
    Communication,
    /// Tea, snacks and meals
    #[sea_orm(string_value = "refreshments")]
    Refreshments,
    /// Anything else
    #[sea_orm(string_value = "miscellaneous")]
    Miscellaneous,
}

/// Direction of the expense in the office books
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(8))")]
#[serde(rename_all = "snake_case")]
pub enum ExpenseType {
    /// Money paid out
    #[sea_orm(string_value = "debit")]
    Debit,
    /// Money received back
    #[sea_orm(string_value = "credit")]
    Credit,
}

/// Urgency of the request
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(8))")]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// Can wait
    #[sea_orm(string_value = "low")]
    Low,
    /// Normal handling
    #[sea_orm(string_value = "medium")]
    Medium,
    /// Handle soon
    #[sea_orm(string_value = "high")]
    High,
    /// Handle today
    #[sea_orm(string_value = "urgent")]
    Urgent,
}

/// Expense database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "expenses")]
pub struct Model {
    /// Unique identifier for the expense
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Short title, required
    pub title: String,
    /// Optional longer description
    pub description: Option<String>,
    /// Requested amount, always positive
    pub amount: i64,
    /// Expense category
    pub category: ExpenseCategory,
    /// Debit or credit
    pub expense_type: ExpenseType,
    /// Urgency
    pub priority: Priority,
    /// Business date of the expense; `None` falls back to `created_at`
    pub expense_date: Option<Date>,
    /// Current workflow status
    pub status: ExpenseStatus,
    /// Name of whoever prepared the voucher (informational)
    pub prepared_by: Option<String>,
    /// Name of whoever checked the voucher (informational)
    pub checked_by: Option<String>,
    /// Name of whoever passed the voucher (informational)
    pub passed_by: Option<String>,
    /// Officer id of the creator
    pub created_by_id: String,
    /// Role of the creator at creation time
    pub created_by_role: Role,
    /// Officer id of the admin who approved the expense
    pub approved_by_id: Option<String>,
    /// Set when the expense entered `approved`
    pub approved_at: Option<DateTimeUtc>,
    /// Set when the expense entered `paid`
    pub paid_at: Option<DateTimeUtc>,
    /// Set when the expense entered `rejected`
    pub rejected_at: Option<DateTimeUtc>,
    /// True if the creator chose to proceed despite insufficient cash
    pub funds_override: bool,
    /// Optional note/coin composition, see `core::denomination`
    pub currency_notes: Option<Json>,
    /// When the expense was created
    pub created_at: DateTimeUtc,
    /// When the expense last changed
    pub updated_at: DateTimeUtc,
}

impl Model {
    /// The ledger day this expense is charged to.
    ///
    /// Uses `expense_date` when present, otherwise the UTC date of `created_at`.
    #[must_use]
    pub fn ledger_date(&self) -> NaiveDate {
        self.expense_date
            .unwrap_or_else(|| self.created_at.date_naive())
    }

    /// The instant used to bucket this expense into reporting periods, and
    /// whether it came from the creation timestamp fallback.
    #[must_use]
    pub fn effective_instant(&self) -> (DateTime<Utc>, bool) {
        self.expense_date.map_or((self.created_at, true), |date| {
            (date.and_time(chrono::NaiveTime::MIN).and_utc(), false)
        })
    }
}

/// Expenses have no foreign keys; the ledger day is derived from the dates.
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
