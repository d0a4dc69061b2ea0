use suma_rpc::{build_registry, config::Config, logging, transport::server::RpcServer};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init_logging();

    let config = Config::from_env()?;
    let server = RpcServer::bind(&config, build_registry()).await?;

    info!(
        bind_addr = %config.bind_addr,
        bind_port = config.bind_port,
        local_addr = %server.local_addr()?,
        "server starting"
    );

    server.serve().await?;
    Ok(())
}
