use std::path::PathBuf;

use anyhow::Context;
use thingseed::{
    common::Error,
    config::SeedConfig,
    query::SelectQuery,
    store::{SqliteStore, Store},
};

const DUMP_LIMIT: usize = 20;

fn main() -> Result<(), Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let config = SeedConfig::load()?;
    let table_name = config.table_schema()?.name;

    let database: PathBuf = std::env::args()
        .nth(1)
        .map_or(config.database, PathBuf::from);
    let store = SqliteStore::open(&database).context("Cannot open database")?;

    if !store.is_table_exist(&table_name)? {
        println!("Table {table_name} does not exist in {}", store.location());
        return Ok(());
    }

    println!(
        "Table {table_name}: {} rows",
        store.count_rows(&table_name)?
    );

    let rows = store.run_select_query(&SelectQuery {
        from: table_name,
        limit: Some(DUMP_LIMIT),
    })?;
    for (row_idx, row) in rows.iter().enumerate() {
        println!("Row #{row_idx}:");
        for (field_name, value) in row {
            println!("\t{field_name} = {value:?}");
        }
    }

    store.close();
    Ok(())
}
