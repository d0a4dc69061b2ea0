use std::{future::Future, net::SocketAddr, time::Instant};

use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use crate::transport::server::ConnectionOutcome;

pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

/// Drives a connection future and emits one summary event when it finishes.
pub async fn connection_logging<F>(peer: SocketAddr, connection: F) -> ConnectionOutcome
where
    F: Future<Output = ConnectionOutcome>,
{
    let started_at = Instant::now();

    let outcome = connection.await;
    let elapsed_ms = started_at.elapsed().as_millis();

    info!(
        peer = %peer,
        outcome = outcome.as_str(),
        request_bytes = outcome.request_bytes(),
        duration_ms = elapsed_ms,
        "connection summary"
    );

    if matches!(
        outcome,
        ConnectionOutcome::TimedOut | ConnectionOutcome::Failed
    ) {
        warn!(peer = %peer, outcome = outcome.as_str(), "connection closed without response");
    }

    outcome
}
