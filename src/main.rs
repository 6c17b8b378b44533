//! bq-report - a paginated, schema-stable JSON report service over BigQuery.

mod cli;

use std::sync::Arc;

use anyhow::Context;
use bq_report::config::Config;
use bq_report::report::{QueryExecutor, ReportService};
use bq_report::server::{self, AppState};
use bq_report::warehouse::{self, MockWarehouse, WarehouseClient};
use cli::Cli;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Warning: could not load .env: {e}");
        }
    }
    bq_report::logging::init_stderr_logging();

    if let Err(e) = run().await {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse_args();

    let config_path = cli.config_path();
    info!("Loading config from: {}", config_path.display());
    let mut config = Config::load_from_file(&config_path)?;
    config.merge(&cli.to_overrides());
    config.apply_env_defaults();

    let client: Arc<dyn WarehouseClient> = if cli.mock_warehouse {
        info!("Using the in-memory demo warehouse");
        Arc::new(MockWarehouse::demo())
    } else {
        let settings = config.warehouse.connection_settings()?;
        warehouse::connect(&settings).await?
    };

    let executor = QueryExecutor::new(client, config.warehouse.location.clone());
    let service = ReportService::new(executor, &config.report);
    let limits = config.report.limits();
    info!(
        page_size = limits.page_size(),
        max_pages = limits.max_pages(),
        "Report paging configured"
    );

    let shutdown = CancellationToken::new();
    let state = Arc::new(AppState::new(
        service,
        config.report.timeouts(),
        shutdown.clone(),
    ));
    let router = server::build_router(state, &config.server);

    let addr = config.server.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    server::cancel_on_signal(shutdown.clone());
    server::serve(listener, router, shutdown).await?;
    Ok(())
}
