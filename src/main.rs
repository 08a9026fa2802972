use mimalloc::MiMalloc;
use stmtmgr::{StmtManager, config::AppConfig, utils::logging};
use tracing::{error, info};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = AppConfig::load()?;
    logging::init(&cfg.loglevel);

    info!(
        connection_file = %cfg.connection_file.display(),
        statements = cfg.statements.len(),
        loglevel = %cfg.loglevel,
        "stmtmgr starting"
    );

    let document = tokio::fs::read(&cfg.connection_file).await?;
    let manager = StmtManager::new(&document).await?;

    let mut failed = 0usize;
    for spec in &cfg.statements {
        match manager.add_stmt(&spec.name, &spec.query).await {
            Ok(()) => info!(name = %spec.name, "statement prepared"),
            Err(e) => {
                failed += 1;
                error!(name = %spec.name, error = %e, "statement rejected");
            }
        }
    }

    let names = manager.stmt_names().await?;
    info!(registered = ?names, failed, "registration finished");

    manager.close().await?;
    info!("stmtmgr has shut down.");
    Ok(())
}
