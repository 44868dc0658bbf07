use docflow_db::{JobRepository, SqliteJobRepository};
use docflow_storage::FileStorage;
use docflow_tools::ToolKind;
use docflow_worker::WorkerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = WorkerConfig::from_env();

    println!(
        "docflow-selfcheck: starting with storage_root={} database={}",
        config.storage.root.display(),
        config.database_path.display()
    );

    ensure_storage(&config).await?;
    ensure_tools(&config)?;
    ensure_database(&config).await?;

    println!("docflow-selfcheck: ok");
    Ok(())
}

async fn ensure_storage(config: &WorkerConfig) -> anyhow::Result<()> {
    let storage = FileStorage::from_config(&config.storage);
    storage
        .check_writable()
        .await
        .map_err(|e| anyhow::anyhow!("storage root not writable: {}", e))?;
    storage.ensure_layout().await?;
    Ok(())
}

fn ensure_tools(config: &WorkerConfig) -> anyhow::Result<()> {
    for tool in [ToolKind::Reflow, ToolKind::Dehyphenate] {
        let path = config.tools.resolve(tool)?;
        println!("docflow-selfcheck: {} tool at {}", tool, path.display());
    }
    Ok(())
}

async fn ensure_database(config: &WorkerConfig) -> anyhow::Result<()> {
    let repo = SqliteJobRepository::open(&config.database_path)
        .map_err(|e| anyhow::anyhow!("cannot open database: {}", e))?;
    repo.ping().await?;
    Ok(())
}
