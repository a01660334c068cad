//! Withdrawal entity - Cash brought into the office for a given day.
//!
//! Withdrawals raise the day's available balance and are never capped.
//! An opening-cash top-up is stored as a withdrawal with `is_top_up` set.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How the withdrawn money reached the office
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum WithdrawalType {
    /// Physical cash
    #[sea_orm(string_value = "cash")]
    Cash,
    /// Transfer from the office bank account
    #[sea_orm(string_value = "bank_transfer")]
    BankTransfer,
}

impl fmt::Display for WithdrawalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Cash => "cash",
            Self::BankTransfer => "bank_transfer",
        })
    }
}

/// Withdrawal database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "withdrawals")]
pub struct Model {
    /// Unique identifier for the withdrawal
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Ledger day the withdrawal was recorded against
    pub cash_date: Date,
    /// Amount withdrawn, always positive
    pub amount: i64,
    /// Why the money was withdrawn (required)
    pub purpose: String,
    /// Cash or bank transfer
    pub withdrawal_type: WithdrawalType,
    /// Optional longer description
    pub description: Option<String>,
    /// Optional note/coin composition, see `core::denomination`
    pub currency_notes: Option<Json>,
    /// True when recorded implicitly by an opening-cash top-up
    pub is_top_up: bool,
    /// When the withdrawal was recorded
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Withdrawal and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each withdrawal belongs to one cash day
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
