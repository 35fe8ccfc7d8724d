use chrono::Utc;
use dotenvy::dotenv;
use expense_ledger::{
    config::{database, settings},
    core::{period::to_period, view::admin_view},
    errors::Result,
};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // 1. Load .env file so DATABASE_URL and RUST_LOG are visible below
    let dotenv_loaded = dotenv().is_ok();

    // 2. Load settings (config.toml is optional)
    let settings = settings::load_default_settings()?;

    // 3. Initialize tracing, RUST_LOG wins over the configured filter
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&settings.log_filter)),
        )
        .init();
    if !dotenv_loaded {
        warn!("No .env file loaded, relying on the process environment");
    }

    // 4. Connect and make sure the schema exists
    let db = database::create_connection(&settings.database_url)
        .await
        .inspect_err(|e| error!("Failed to connect to database: {e}"))?;
    database::create_tables(&db)
        .await
        .inspect(|()| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to create tables: {e}"))?;

    // 5. Report balances and the settlement plan for the chosen period
    let period = settings
        .report_period
        .unwrap_or_else(|| to_period(Utc::now().date_naive()));
    let view = admin_view(&db, period).await?;

    info!(%period, users = view.balances.len(), "Settlement report");
    for entry in &view.balances {
        info!(user_id = entry.user_id, balance = %entry.balance, "Balance");
    }
    if view.transfers.is_empty() {
        info!("Everyone is settled up");
    }
    for transfer in &view.transfers {
        info!(
            from = transfer.from,
            to = transfer.to,
            amount = %transfer.amount,
            "Transfer"
        );
    }

    Ok(())
}
