//! Seed the configured database with Rango's sample categories and pages.
//!
//! Usage: `cargo run --bin populate-rango`

use anyhow::Result;
use std::path::Path;

use rango::config::Config;
use rango::db::{self, seed};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rango=info".into()),
        )
        .init();

    println!("Starting Rango population script...");

    let config = Config::load_with_env(Path::new("config.yml"))?;
    let pool = db::create_pool(&config.database).await?;
    db::migrations::run_migrations(&pool).await?;

    let report = seed::populate(&pool).await?;
    for (category, page) in &report.pages {
        println!("- {} - {}", category, page);
    }
    println!(
        "Created {} categories and {} pages",
        report.categories_created, report.pages_created
    );

    Ok(())
}
