//! Method dispatch
//!
//! Resolves decoded requests against the registry, runs the handler and folds
//! every outcome into a [`Response`]. Nothing raised here reaches the transport.

use tracing::{info, warn};

use crate::{
    errors::RpcError,
    registry::MethodRegistry,
    rpc::{
        request::{Params, Request},
        response::Response,
    },
};

/// Decodes `payload` and dispatches it. Decode failures answer with a null id.
pub async fn handle_payload(registry: &MethodRegistry, payload: &[u8]) -> Response {
    match Request::decode(payload) {
        Ok(request) => dispatch(registry, request).await,
        Err(err) => {
            warn!(error = %err, "request rejected");
            Response::failure(None, &err)
        }
    }
}

pub async fn dispatch(registry: &MethodRegistry, request: Request) -> Response {
    let Request { method, params, id } = request;
    let audit_params = audit_param_shape(&params);

    let response = match registry.resolve(&method) {
        None => Response::failure(id, &RpcError::method_not_found(method.as_str())),
        Some(handler) => {
            // Run the handler on its own task so a panic is contained.
            let outcome = tokio::spawn(async move { handler.call(params).await }).await;
            match outcome {
                Ok(Ok(result)) => Response::success(id, result),
                Ok(Err(err)) => {
                    warn!(method = %method, error = %err, "method failed");
                    Response::failure(id, &err)
                }
                Err(join_err) => {
                    warn!(method = %method, error = %join_err, "method aborted");
                    Response::failure(id, &RpcError::internal(join_err.to_string()))
                }
            }
        }
    };

    info!(
        method = %method,
        params = %audit_params,
        outcome = if response.is_error() { "failure" } else { "success" },
        "rpc call audited"
    );

    response
}

/// Summarizes params for the audit log: names for named params, a count for
/// positional ones. Values are never logged.
pub fn audit_param_shape(params: &Params) -> String {
    match params {
        Params::Named(map) => {
            let names: Vec<&str> = map.keys().map(String::as_str).collect();
            format!("{{{}}}", names.join(","))
        }
        Params::Positional(items) => format!("[{} positional]", items.len()),
    }
}
