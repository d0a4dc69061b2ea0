use std::{net::SocketAddr, sync::Arc, time::Duration};

use tokio::{
    io::{AsyncRead, AsyncWrite, AsyncWriteExt},
    net::{TcpListener, TcpSocket, TcpStream},
};
use tracing::{info, warn};

use crate::{
    config::Config,
    errors::{RpcError, ServerError},
    logging::connection_logging,
    registry::MethodRegistry,
    rpc::{dispatch::handle_payload, response::Response},
    transport::framing::{read_request, FrameError},
};

pub const LISTEN_BACKLOG: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionSettings {
    pub read_timeout: Option<Duration>,
    pub max_request_bytes: usize,
}

impl From<&Config> for ConnectionSettings {
    fn from(config: &Config) -> Self {
        Self {
            read_timeout: config.read_timeout,
            max_request_bytes: config.max_request_bytes,
        }
    }
}

/// How a connection ended, as reported in the connection summary log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionOutcome {
    Empty,
    Responded { request_bytes: usize, error: bool },
    Rejected { request_bytes: usize },
    TimedOut,
    Failed,
}

impl ConnectionOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Responded { error: false, .. } => "success",
            Self::Responded { error: true, .. } => "failure",
            Self::Rejected { .. } => "rejected",
            Self::TimedOut => "timed_out",
            Self::Failed => "io_error",
        }
    }

    pub fn request_bytes(&self) -> usize {
        match self {
            Self::Responded { request_bytes, .. } | Self::Rejected { request_bytes } => {
                *request_bytes
            }
            Self::Empty | Self::TimedOut | Self::Failed => 0,
        }
    }
}

#[derive(Debug)]
pub struct RpcServer {
    listener: TcpListener,
    registry: Arc<MethodRegistry>,
    settings: ConnectionSettings,
}

impl RpcServer {
    /// Resolves and binds the configured address. Any failure here is fatal.
    pub async fn bind(config: &Config, registry: MethodRegistry) -> Result<Self, ServerError> {
        let addr = config.bind_socket().await?;
        let listener = listen(addr).map_err(|source| ServerError::Bind { addr, source })?;

        Ok(Self {
            listener,
            registry: Arc::new(registry),
            settings: ConnectionSettings::from(config),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    /// Accepts connections forever, serving each on its own task.
    pub async fn serve(self) -> Result<(), ServerError> {
        info!(
            local_addr = %self.local_addr()?,
            methods = ?self.registry.method_names(),
            "rpc server accepting connections"
        );

        loop {
            let (stream, peer) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(err) => {
                    warn!(error = %err, "failed to accept connection");
                    continue;
                }
            };

            let registry = Arc::clone(&self.registry);
            let settings = self.settings;
            tokio::spawn(async move {
                connection_logging(peer, handle_connection(stream, &registry, settings)).await;
            });
        }
    }
}

fn listen(addr: SocketAddr) -> std::io::Result<TcpListener> {
    let socket = if addr.is_ipv4() {
        TcpSocket::new_v4()?
    } else {
        TcpSocket::new_v6()?
    };
    socket.set_reuseaddr(true)?;
    socket.bind(addr)?;
    socket.listen(LISTEN_BACKLOG)
}

async fn handle_connection(
    mut stream: TcpStream,
    registry: &MethodRegistry,
    settings: ConnectionSettings,
) -> ConnectionOutcome {
    let outcome = serve_stream(&mut stream, registry, settings).await;
    if let Err(err) = stream.shutdown().await {
        if err.kind() != std::io::ErrorKind::NotConnected {
            warn!(error = %err, "failed to shut down connection");
        }
    }
    outcome
}

/// Runs one read, process, write cycle on `stream`. Never writes more than one response.
pub async fn serve_stream<S>(
    stream: &mut S,
    registry: &MethodRegistry,
    settings: ConnectionSettings,
) -> ConnectionOutcome
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let read = read_request(stream, settings.max_request_bytes);
    let frame = match settings.read_timeout {
        Some(limit) => tokio::time::timeout(limit, read)
            .await
            .unwrap_or(Err(FrameError::TimedOut)),
        None => read.await,
    };

    let (response, outcome) = match frame {
        Ok(None) => return ConnectionOutcome::Empty,
        Ok(Some(payload)) => {
            let response = handle_payload(registry, &payload).await;
            let outcome = ConnectionOutcome::Responded {
                request_bytes: payload.len(),
                error: response.is_error(),
            };
            (response, outcome)
        }
        Err(FrameError::RequestTooLarge { size, max_size }) => {
            let err = RpcError::internal(format!(
                "request of {size} bytes exceeds {max_size} byte limit"
            ));
            warn!(error = %err, "request rejected");
            (
                Response::failure(None, &err),
                ConnectionOutcome::Rejected {
                    request_bytes: size,
                },
            )
        }
        Err(FrameError::TimedOut) => {
            warn!("timed out waiting for request");
            return ConnectionOutcome::TimedOut;
        }
        Err(err @ FrameError::Io(_)) => {
            warn!(error = %err, "failed to read request");
            return ConnectionOutcome::Failed;
        }
    };

    let bytes = response.encode();
    if let Err(err) = write_response(stream, &bytes).await {
        warn!(error = %err, "failed to write response");
        return ConnectionOutcome::Failed;
    }

    outcome
}

async fn write_response<S>(stream: &mut S, bytes: &[u8]) -> std::io::Result<()>
where
    S: AsyncWrite + Unpin,
{
    stream.write_all(bytes).await?;
    stream.flush().await
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};
    use tokio::io::{duplex, AsyncReadExt};

    use super::*;
    use crate::build_registry;

    fn settings() -> ConnectionSettings {
        ConnectionSettings {
            read_timeout: Some(Duration::from_secs(5)),
            max_request_bytes: 1024,
        }
    }

    async fn exchange(
        request: &[u8],
        settings: ConnectionSettings,
    ) -> (ConnectionOutcome, Value) {
        let (mut client, mut server) = duplex(4096);
        client.write_all(request).await.expect("request written");
        client.shutdown().await.expect("client half-close");

        let outcome = serve_stream(&mut server, &build_registry(), settings).await;
        drop(server);

        let mut raw = Vec::new();
        client.read_to_end(&mut raw).await.expect("response read");
        (outcome, serde_json::from_slice(&raw).expect("response is json"))
    }

    #[tokio::test]
    async fn serves_one_request() {
        let request = br#"{"method":"suma","params":{"a":1,"b":2},"id":"x"}"#;
        let (outcome, response) = exchange(request, settings()).await;

        assert_eq!(response, json!({"jsonrpc": "2.0", "result": 3, "id": "x"}));
        assert_eq!(outcome.as_str(), "success");
        assert!(outcome.request_bytes() > 0);
    }

    #[tokio::test]
    async fn oversize_request_gets_internal_error() {
        let mut payload = br#"{"method":"suma","params":{"pad":""#.to_vec();
        payload.extend(std::iter::repeat(b'x').take(2048));
        payload.extend_from_slice(br#""},"id":1}"#);

        let (outcome, response) = exchange(&payload, settings()).await;

        assert_eq!(response["error"]["code"], json!(-32603));
        assert_eq!(response["id"], Value::Null);
        assert!(matches!(outcome, ConnectionOutcome::Rejected { .. }));
    }

    #[tokio::test]
    async fn empty_connection_gets_no_response() {
        let (mut client, mut server) = duplex(64);
        client.shutdown().await.expect("client half-close");

        let outcome = serve_stream(&mut server, &build_registry(), settings()).await;
        drop(server);

        let mut raw = Vec::new();
        client.read_to_end(&mut raw).await.expect("read succeeds");
        assert_eq!(outcome, ConnectionOutcome::Empty);
        assert!(raw.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn idle_client_times_out() {
        let (_client, mut server) = duplex(64);
        let settings = ConnectionSettings {
            read_timeout: Some(Duration::from_secs(1)),
            ..settings()
        };

        let outcome = serve_stream(&mut server, &build_registry(), settings).await;
        assert_eq!(outcome, ConnectionOutcome::TimedOut);
    }
}
