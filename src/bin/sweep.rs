//! One-shot billing sweep: marks stale pending payments overdue and
//! re-derives every billable shop's activation. Meant for cron.

use std::sync::Arc;

use chrono::Utc;
use clap::Parser;
use sqlx::sqlite::SqlitePoolOptions;
use teketeke::{
    config::Settings,
    notifications::LogNotifier,
    service::ServiceContext,
};

#[derive(Parser, Debug)]
#[command(name = "teketeke-sweep", about = "Run the shop billing sweep once")]
struct Args {
    /// Report what would change without writing anything.
    #[arg(long)]
    dry_run: bool,

    /// Database URL, overriding configuration.
    #[arg(long)]
    database_url: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "teketeke=info".into()),
        )
        .init();

    let args = Args::parse();

    let settings = Settings::new().unwrap_or_else(|e| {
        tracing::warn!("Failed to load config: {}. Using defaults.", e);
        Settings::default()
    });
    let database_url = args.database_url.unwrap_or_else(|| settings.database.url.clone());

    let db_pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect(&database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&db_pool).await?;

    let context = ServiceContext::with_sqlite(db_pool, Arc::new(LogNotifier), &settings);
    let report = context.activation_service.sweep(Utc::now(), args.dry_run).await?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
