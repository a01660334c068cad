//! Admission control - is there enough cash to take on an expense?
//!
//! The check is advisory and never mutates state. Callers decide whether an
//! insufficient result blocks the expense, prompts for a withdrawal, or is
//! overridden with an explicit "proceed anyway" flag.

use crate::{
    core::ledger,
    errors::{Error, Result},
};
use chrono::NaiveDate;
use sea_orm::ConnectionTrait;
use serde::Serialize;
use tracing::debug;

/// Outcome of comparing a requested amount against available cash
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SufficiencyCheck {
    /// `true` when the shortfall is zero
    pub sufficient: bool,
    /// Cash available on the ledger day
    pub available: i64,
    /// Amount requested
    pub required: i64,
    /// `max(0, required - available)`
    pub shortfall: i64,
}

impl SufficiencyCheck {
    /// Converts an insufficient check into `Error::InsufficientFunds`.
    pub fn into_result(self) -> Result<Self> {
        if self.sufficient {
            Ok(self)
        } else {
            Err(Error::InsufficientFunds {
                available: self.available,
                required: self.required,
                shortfall: self.shortfall,
            })
        }
    }
}

/// Compares `requested` with `available`.
#[must_use]
pub fn check_sufficiency(available: i64, requested: i64) -> SufficiencyCheck {
    let shortfall = requested.saturating_sub(available).max(0);
    SufficiencyCheck {
        sufficient: shortfall == 0,
        available,
        required: requested,
        shortfall,
    }
}

/// Reads the available cash for `date` and checks `requested` against it.
///
/// A date with no ledger counts as zero available cash.
///
/// # Errors
/// Returns `Error::InvalidAmount` if `requested` is not positive.
pub async fn check_sufficient_cash<C>(
    db: &C,
    date: NaiveDate,
    requested: i64,
) -> Result<SufficiencyCheck>
where
    C: ConnectionTrait,
{
    if requested <= 0 {
        return Err(Error::InvalidAmount { amount: requested });
    }

    let available = ledger::available_amount(db, date).await?;
    let check = check_sufficiency(available, requested);
    debug!(
        %date,
        available,
        requested,
        shortfall = check.shortfall,
        "Checked cash sufficiency"
    );
    Ok(check)
}
