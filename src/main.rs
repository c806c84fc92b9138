use clap::Parser;
use streamhub::api::{self, Stores};
use streamhub::config::Config;
use streamhub::logging;
use streamhub::server::Server;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config = Config::parse();
    logging::init(&config.log_level, config.log_format)?;

    info!(data_dir = %config.data_dir.display(), "opening collections");
    let dispatcher = api::application(Stores::open(&config.data_dir)).build();

    let server = Server::bind(&config.addr(), dispatcher)
        .await?
        .max_connections(config.max_connections);
    info!("streamhub running at http://{}", server.local_addr()?);

    server
        .serve_with_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
            info!("shutdown signal received");
        })
        .await?;

    Ok(())
}
