pub mod domain;
pub mod projections;
pub mod shared;
pub mod usecases;

use usecases::u601_reconcile::executor::ReconcileExecutor;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let log_dir = std::path::Path::new("target").join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file_path = log_dir.join("backend.log");
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file_path)?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| {
                // Keep SQL statement logs out, keep application logs
                "info,sqlx=warn,sea_orm=warn".into()
            }),
        ))
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::sync::Arc::new(log_file))
                .with_ansi(false),
        )
        .init();

    let config = shared::config::load_config()?;
    let db_path = shared::config::get_database_path(&config)?;
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let conn = shared::data::db::connect(&db_path.to_string_lossy()).await?;
    shared::data::db::ensure_schema(&conn).await?;

    let ctx = shared::context::ReconContext::new(conn, &config)?;
    let summary = ReconcileExecutor::new(&ctx).run().await?;

    tracing::info!("run summary: {}", serde_json::to_string(&summary)?);
    if summary.errors > 0 {
        tracing::warn!(
            "{} row(s) were skipped or failed; see warnings above",
            summary.errors
        );
    }

    Ok(())
}
