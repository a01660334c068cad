//! Currency denominations and the per-denomination cash breakdown.
//!
//! A [`CurrencyBreakdown`] records how many of each note or coin make up an
//! amount. Its total is always recomputed from the counts against a
//! [`DenominationTable`]; a total supplied from outside is only ever compared
//! against, never stored as truth.

use crate::errors::{Error, Result};
use sea_orm::prelude::Json;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

/// Whether a denomination is a note or a coin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenominationKind {
    /// Paper note
    Note,
    /// Coin
    Coin,
}

/// A single note or coin value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Denomination {
    /// Stable key used in breakdown counts, e.g. `note_500`
    pub label: String,
    /// Face value in whole currency units
    pub value: i64,
    /// Note or coin
    pub kind: DenominationKind,
}

impl Denomination {
    fn note(value: i64) -> Self {
        Self {
            label: format!("note_{value}"),
            value,
            kind: DenominationKind::Note,
        }
    }

    fn coin(value: i64) -> Self {
        Self {
            label: format!("coin_{value}"),
            value,
            kind: DenominationKind::Coin,
        }
    }
}

/// The set of denominations a breakdown may use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DenominationTable(Vec<Denomination>);

impl Default for DenominationTable {
    fn default() -> Self {
        let notes = [2000, 500, 200, 100, 50, 20, 10, 5, 2, 1]
            .into_iter()
            .map(Denomination::note);
        let coins = [5, 2, 1].into_iter().map(Denomination::coin);
        Self(notes.chain(coins).collect())
    }
}

impl DenominationTable {
    /// Builds a table from an explicit list, validating it.
    pub fn new(denominations: Vec<Denomination>) -> Result<Self> {
        let table = Self(denominations);
        table.validate()?;
        Ok(table)
    }

    /// All denominations in table order.
    #[must_use]
    pub fn entries(&self) -> &[Denomination] {
        &self.0
    }

    /// Face value for a label, if the label is in the table.
    #[must_use]
    pub fn value_of(&self, label: &str) -> Option<i64> {
        self.0.iter().find(|d| d.label == label).map(|d| d.value)
    }

    /// Checks that the table is non-empty, labels are unique and values positive.
    pub fn validate(&self) -> Result<()> {
        if self.0.is_empty() {
            return Err(Error::Config {
                message: "denomination table cannot be empty".to_string(),
            });
        }
        for (index, denomination) in self.0.iter().enumerate() {
            if denomination.value <= 0 {
                return Err(Error::Config {
                    message: format!(
                        "denomination '{}' must have a positive value",
                        denomination.label
                    ),
                });
            }
            if self.0[..index].iter().any(|d| d.label == denomination.label) {
                return Err(Error::Config {
                    message: format!("duplicate denomination label '{}'", denomination.label),
                });
            }
        }
        Ok(())
    }
}

/// Note and coin counts with their recomputed total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CurrencyBreakdown {
    counts: BTreeMap<String, u32>,
    total: i64,
}

/// Shape of a breakdown as stored in JSON columns.
#[derive(Deserialize)]
struct StoredBreakdown {
    counts: BTreeMap<String, u32>,
    #[serde(default)]
    total: Option<i64>,
}

impl CurrencyBreakdown {
    /// Builds a breakdown from label/count pairs, computing the total.
    ///
    /// Zero counts are dropped. Repeated labels are summed.
    ///
    /// # Errors
    /// Returns `Error::Validation` for labels not in `table` or if the total
    /// overflows.
    pub fn from_counts<I, S>(table: &DenominationTable, counts: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, u32)>,
        S: Into<String>,
    {
        let mut merged: BTreeMap<String, u32> = BTreeMap::new();
        for (label, count) in counts {
            let label = label.into();
            if table.value_of(&label).is_none() {
                return Err(Error::validation(format!("unknown denomination '{label}'")));
            }
            if count == 0 {
                continue;
            }
            let entry = merged.entry(label).or_default();
            *entry = entry
                .checked_add(count)
                .ok_or_else(|| Error::validation("denomination count overflow"))?;
        }

        let total = compute_total(table, &merged)?;
        Ok(Self {
            counts: merged,
            total,
        })
    }

    /// Builds a breakdown and rejects it if `declared_total` disagrees with
    /// the computed total.
    pub fn with_declared_total<I, S>(
        table: &DenominationTable,
        counts: I,
        declared_total: i64,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = (S, u32)>,
        S: Into<String>,
    {
        let breakdown = Self::from_counts(table, counts)?;
        breakdown.ensure_total(declared_total)?;
        Ok(breakdown)
    }

    /// Total value of the breakdown.
    #[must_use]
    pub const fn total(&self) -> i64 {
        self.total
    }

    /// Non-zero counts keyed by denomination label.
    #[must_use]
    pub const fn counts(&self) -> &BTreeMap<String, u32> {
        &self.counts
    }

    /// Count for one label, zero when absent.
    #[must_use]
    pub fn count(&self, label: &str) -> u32 {
        self.counts.get(label).copied().unwrap_or(0)
    }

    /// Fails with `Error::Validation` unless the breakdown adds up to `amount`.
    pub fn ensure_total(&self, amount: i64) -> Result<()> {
        if self.total == amount {
            Ok(())
        } else {
            Err(Error::validation(format!(
                "currency breakdown totals {} but amount is {amount}",
                self.total
            )))
        }
    }

    /// Serializes for a JSON column.
    pub fn to_json(&self) -> Result<Json> {
        serde_json::to_value(self).map_err(Into::into)
    }

    /// Reads a breakdown from a JSON column, recomputing the total.
    ///
    /// A stored total that disagrees with the counts is logged and ignored.
    pub fn from_json(table: &DenominationTable, value: &Json) -> Result<Self> {
        let stored: StoredBreakdown = serde_json::from_value(value.clone())?;
        let breakdown = Self::from_counts(table, stored.counts)?;
        if let Some(stored_total) = stored.total.filter(|t| *t != breakdown.total) {
            warn!(
                stored_total,
                computed_total = breakdown.total,
                "Ignoring stored breakdown total that disagrees with its counts"
            );
        }
        Ok(breakdown)
    }
}

fn compute_total(table: &DenominationTable, counts: &BTreeMap<String, u32>) -> Result<i64> {
    counts.iter().try_fold(0_i64, |acc, (label, count)| {
        let value = table
            .value_of(label)
            .ok_or_else(|| Error::validation(format!("unknown denomination '{label}'")))?;
        value
            .checked_mul(i64::from(*count))
            .and_then(|line| acc.checked_add(line))
            .ok_or_else(|| Error::validation("currency breakdown total overflow"))
    })
}
