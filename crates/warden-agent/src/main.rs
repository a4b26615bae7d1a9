use std::{path::PathBuf, sync::Arc};

use anyhow::Context;
use tracing_subscriber::EnvFilter;

mod console;
mod executor;
mod instance;
mod launch;
mod logbuf;
mod paths;
mod process;
mod provision;
mod pump;
mod registry;
mod store;
mod supervisor;
#[cfg(all(test, unix))]
mod testutil;
mod ticker;
mod wipe;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let database_url =
        std::env::var("WARDEN_DATABASE_URL").context("WARDEN_DATABASE_URL is not set")?;
    let data_root: PathBuf = paths::data_root();
    tracing::info!(data_root = %data_root.display(), "agent starting");

    let store = Arc::new(store::DbStore::connect(&database_url).await);

    console::Console::new(store, data_root).run().await;
    Ok(())
}
