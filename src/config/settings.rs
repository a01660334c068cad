//! Settings loading from config.toml
//!
//! Budgets, the denomination table, role permissions and the first day of the
//! week are data, not code. Every section is optional; anything left out falls
//! back to the built-in defaults.

use crate::{
    core::{denomination::DenominationTable, period::BudgetTable, workflow::PermissionTable},
    errors::{Error, Result},
};
use chrono::Weekday;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Default location of the settings file
pub const DEFAULT_SETTINGS_PATH: &str = "config.toml";

/// Everything configurable about the cash office
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Symbol printed in front of amounts
    pub currency_symbol: String,
    /// First day of the weekly reporting window
    pub week_starts_on: Weekday,
    /// Spending budget per period
    pub budgets: BudgetTable,
    /// Notes and coins a breakdown may use
    pub denominations: DenominationTable,
    /// Which roles may create, transition and delete expenses
    pub permissions: PermissionTable,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            currency_symbol: "₹".to_string(),
            week_starts_on: Weekday::Sun,
            budgets: BudgetTable::default(),
            denominations: DenominationTable::default(),
            permissions: PermissionTable::default(),
        }
    }
}

impl Settings {
    /// Parses settings from TOML text and validates them.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let settings: Self = toml::from_str(contents).map_err(|e| Error::Config {
            message: format!("Failed to parse settings: {e}"),
        })?;
        settings.validate()?;
        Ok(settings)
    }

    /// Checks every section for internal consistency.
    pub fn validate(&self) -> Result<()> {
        self.budgets.validate()?;
        self.denominations.validate()?;
        self.permissions.validate()
    }
}

/// Loads settings from a TOML file.
///
/// # Errors
/// Returns `Error::Config` if the file cannot be read, does not parse, or
/// fails validation.
pub fn load_settings<P: AsRef<Path>>(path: P) -> Result<Settings> {
    let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| Error::Config {
        message: format!(
            "Failed to read settings file {}: {e}",
            path.as_ref().display()
        ),
    })?;
    Settings::from_toml(&contents)
}

/// Loads settings from `path`, or returns the defaults if the file does not exist.
pub fn load_settings_or_default<P: AsRef<Path>>(path: P) -> Result<Settings> {
    let path = path.as_ref();
    if path.exists() {
        info!("Loading settings from {}", path.display());
        load_settings(path)
    } else {
        info!("No settings file at {}, using defaults", path.display());
        Ok(Settings::default())
    }
}
