use cashbook::{
    config::{database, settings},
    core::{CashOffice, Period},
    errors::Result,
};
use dotenvy::dotenv;
use std::env;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file, non-fatal since env vars can be set externally
    dotenv().ok();
    info!("Attempted to load .env file.");

    // 3. Load settings
    let settings_path = match env::var("CASHBOOK_CONFIG") {
        Ok(path) => path,
        Err(env::VarError::NotPresent) => settings::DEFAULT_SETTINGS_PATH.to_string(),
        Err(e) => return Err(e.into()),
    };
    let settings = settings::load_settings_or_default(&settings_path)
        .inspect_err(|e| error!("Failed to load settings from {}: {}", settings_path, e))?;

    // 4. Initialize database
    let db = database::create_connection()
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db)
        .await
        .inspect(|_| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to create tables: {}", e))?;

    // 5. Report the current state of the office
    let office = CashOffice::with_system_clock(db, settings);
    match office.get_daily_cash(None).await? {
        Some(day) => info!(
            "Cash for {}: opening {}, withdrawals {}, spent {}, available {}",
            day.date, day.opening_cash, day.total_withdrawals, day.total_spent, day.available_amount
        ),
        None => warn!("No cash has been set up for {} yet", office.today()),
    }

    for period in Period::ALL {
        let summary = office.summarize(period).await?;
        info!("\n{}", office.format_summary(&summary));
    }

    Ok(())
}
