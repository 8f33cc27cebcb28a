use anyhow::Context;
use log::{error, info};
use thingseed::{config::SeedConfig, store::SqliteStore};

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = SeedConfig::load().context("Invalid configuration")?;
    let migration = config.migration().context("Failed loading table schema")?;

    let mut store = SqliteStore::open(&config.database)
        .with_context(|| format!("Failed to open {}", config.database.display()))?;

    let result = migration.run(&mut store);
    store.close();

    match result {
        Ok(report) => {
            info!(
                "Migration finished: {} rows in {} batches",
                report.rows, report.batches
            );
            Ok(())
        }
        Err(err) => {
            error!(
                "Migration failed, {} rows remain committed",
                err.rows_committed()
            );
            Err(err).context("Migration failed")
        }
    }
}
