//! Ledger entry entity - Append-only audit trail of every cash day mutation.
//!
//! Entries are written in the same database transaction as the change to the
//! `cash_days` row they describe, so the trail never disagrees with the ledger.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What caused the ledger to move
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum LedgerEntryKind {
    /// First opening-cash setup for the day
    #[sea_orm(string_value = "opening")]
    Opening,
    /// Opening cash added to an existing day
    #[sea_orm(string_value = "top_up")]
    TopUp,
    /// Explicit withdrawal
    #[sea_orm(string_value = "withdrawal")]
    Withdrawal,
    /// Expense approved
    #[sea_orm(string_value = "debit")]
    Debit,
    /// Approved or paid expense deleted
    #[sea_orm(string_value = "credit")]
    Credit,
}

impl fmt::Display for LedgerEntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Opening => "opening",
            Self::TopUp => "top_up",
            Self::Withdrawal => "withdrawal",
            Self::Debit => "debit",
            Self::Credit => "credit",
        })
    }
}

/// Ledger entry database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "ledger_entries")]
pub struct Model {
    /// Unique identifier, also the commit order within a day
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Ledger day that moved
    pub cash_date: Date,
    /// Cause of the movement
    pub kind: LedgerEntryKind,
    /// Signed effect on the available balance
    pub amount: i64,
    /// Available balance after the movement
    pub balance_after: i64,
    /// Expense that caused a debit or credit
    pub expense_id: Option<i64>,
    /// Withdrawal that caused a top-up or withdrawal entry
    pub withdrawal_id: Option<i64>,
    /// When the movement was committed
    pub created_at: DateTimeUtc,
}

/// Defines relationships between `LedgerEntry` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each entry belongs to one cash day
    #[sea_orm(
        belongs_to = "super::cash_day::Entity",
        from = "Column::CashDate",
        to = "super::cash_day::Column::Date"
    )]
    CashDay,
}

impl Related<super::cash_day::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CashDay.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
