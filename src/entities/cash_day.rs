//! Cash day entity - One ledger row per calendar date.
//!
//! The row holds the opening cash, the running withdrawal and spend totals and
//! the available balance derived from them. `version` is bumped on every
//! mutation so concurrent writers can detect a stale read.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Cash day database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "cash_days")]
pub struct Model {
    /// Calendar date this ledger row covers
    #[sea_orm(primary_key, auto_increment = false)]
    pub date: Date,
    /// Cash on hand when the day was set up; top-ups never change it
    pub opening_cash: i64,
    /// Sum of all withdrawals (including opening-cash top-ups) for the day
    pub total_withdrawals: i64,
    /// Sum of approved and paid expenses charged to the day
    pub total_spent: i64,
    /// `opening_cash + total_withdrawals - total_spent`, may be negative
    pub available_amount: i64,
    /// Free-text notes supplied when the day was set up
    pub notes: Option<String>,
    /// Optimistic-concurrency counter
    pub version: i32,
    /// When the day was set up
    pub created_at: DateTimeUtc,
    /// When the row last changed
    pub updated_at: DateTimeUtc,
}

impl Model {
    /// Recomputes the available balance from the stored totals.
    #[must_use]
    pub const fn derived_available(&self) -> i64 {
        self.opening_cash
            .saturating_add(self.total_withdrawals)
            .saturating_sub(self.total_spent)
    }
}

/// Defines relationships between `CashDay` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One day has many withdrawals
    #[sea_orm(has_many = "super::withdrawal::Entity")]
    Withdrawals,
    /// One day has many ledger entries
    #[sea_orm(has_many = "super::ledger_entry::Entity")]
    LedgerEntries,
}

impl Related<super::withdrawal::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Withdrawals.def()
    }
}

impl Related<super::ledger_entry::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LedgerEntries.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
