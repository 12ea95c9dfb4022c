//! RPC gateway service: the HTTP front of the control plane.
//!
//! Routes:
//! - `POST /rpc`: JSON-RPC 2.0, single or batch. The client identity comes
//!   from the configured header, set by the authenticating proxy.
//! - `GET /health`: liveness and session count.
//! - `GET /metrics`: Prometheus text exposition.

use axum::{
    extract::State,
    http::{HeaderMap, HeaderName, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use rc_telemetry::{encode_metrics, HistogramTimer, RPC_REQUESTS};
use serde_json::{json, Value};
use std::str::FromStr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use crate::domain::{GatewayConfig, GatewayError, Operation, RpcError};
use crate::handlers::{GatewayContext, HandlerRegistry, RequestContext};

/// Longest accepted string request ID.
const MAX_ID_LEN: usize = 256;

/// RPC gateway service state
pub struct RpcGatewayService {
    config: GatewayConfig,
    state: AppState,
    shutdown: Arc<Notify>,
}

impl RpcGatewayService {
    /// Create a service with the standard handler set.
    pub fn new(config: GatewayConfig, context: Arc<GatewayContext>) -> Result<Self, GatewayError> {
        Self::with_registry(config, context, HandlerRegistry::standard())
    }

    /// Create a service with a custom handler set.
    pub fn with_registry(
        config: GatewayConfig,
        context: Arc<GatewayContext>,
        registry: HandlerRegistry,
    ) -> Result<Self, GatewayError> {
        config
            .validate()
            .map_err(|e| GatewayError::Config(e.to_string()))?;
        registry.validate()?;
        let identity_header = HeaderName::from_str(&config.identity_header.to_ascii_lowercase())
            .map_err(|e| GatewayError::Config(format!("identity header: {e}")))?;

        let state = AppState {
            context,
            registry: Arc::new(registry),
            identity_header,
            max_batch_size: config.max_batch_size,
        };
        Ok(Self {
            config,
            state,
            shutdown: Arc::new(Notify::new()),
        })
    }

    /// Shared request context.
    pub fn context(&self) -> Arc<GatewayContext> {
        Arc::clone(&self.state.context)
    }

    /// Build the HTTP router.
    pub fn router(&self) -> Router {
        let middleware = ServiceBuilder::new().layer(TraceLayer::new_for_http());

        Router::new()
            .route("/rpc", post(handle_json_rpc))
            .route("/health", get(health_check))
            .route("/metrics", get(metrics))
            .layer(middleware)
            .with_state(self.state.clone())
    }

    /// Bind the configured address and serve until [`shutdown`](Self::shutdown).
    pub async fn serve(&self) -> Result<(), GatewayError> {
        let addr = self.config.addr();
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| GatewayError::Bind(format!("{addr}: {e}")))?;
        self.serve_on(listener).await
    }

    /// Serve on an already bound listener.
    pub async fn serve_on(&self, listener: TcpListener) -> Result<(), GatewayError> {
        let addr = listener
            .local_addr()
            .map_err(|e| GatewayError::Bind(e.to_string()))?;
        info!(addr = %addr, "RPC gateway listening");

        let shutdown = Arc::clone(&self.shutdown);
        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move { shutdown.notified().await })
            .await
            .map_err(|e| GatewayError::Serve(e.to_string()))?;

        info!("RPC gateway stopped");
        Ok(())
    }

    /// Trigger graceful shutdown.
    pub fn shutdown(&self) {
        self.shutdown.notify_one();
    }
}

/// Application state shared across handlers
#[derive(Clone)]
struct AppState {
    context: Arc<GatewayContext>,
    registry: Arc<HandlerRegistry>,
    identity_header: HeaderName,
    max_batch_size: usize,
}

/// Handle a JSON-RPC request
async fn handle_json_rpc(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> impl IntoResponse {
    let Some(user_id) = client_identity(&headers, &state.identity_header) else {
        let err = RpcError::unauthorized("missing client identity");
        return (StatusCode::UNAUTHORIZED, Json(error_response(Value::Null, err)));
    };

    let request: Value = match serde_json::from_str(&body) {
        Ok(v) => v,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(error_response(Value::Null, RpcError::parse_error(e.to_string()))),
            );
        }
    };

    let response = match request {
        Value::Array(requests) => {
            if requests.is_empty() {
                error_response(Value::Null, RpcError::invalid_request("Empty batch"))
            } else if requests.len() > state.max_batch_size {
                error_response(
                    Value::Null,
                    RpcError::invalid_request(format!(
                        "Batch too large: {} requests (max {})",
                        requests.len(),
                        state.max_batch_size
                    )),
                )
            } else {
                // Sequential, so a client's operations apply in order.
                let mut responses = Vec::with_capacity(requests.len());
                for req in &requests {
                    responses.push(process_single_request(&state, &user_id, req).await);
                }
                Value::Array(responses)
            }
        }
        single => process_single_request(&state, &user_id, &single).await,
    };

    (StatusCode::OK, Json(response))
}

fn client_identity(headers: &HeaderMap, header: &HeaderName) -> Option<String> {
    headers
        .get(header)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Process a single JSON-RPC request
async fn process_single_request(state: &AppState, user_id: &str, request: &Value) -> Value {
    let id = request.get("id").cloned().unwrap_or(Value::Null);
    if let Err(e) = validate_id(request.get("id")) {
        return error_response(Value::Null, e);
    }
    if request.get("jsonrpc").and_then(Value::as_str) != Some("2.0") {
        return error_response(id, RpcError::invalid_request("Invalid Request: jsonrpc must be \"2.0\""));
    }

    let method = request.get("method").and_then(Value::as_str).unwrap_or("");
    let operation = match Operation::from_str(method) {
        Ok(op) => op,
        Err(_) => {
            RPC_REQUESTS
                .with_label_values(&["unknown", "method_not_found"])
                .inc();
            return error_response(id, RpcError::method_not_found(method));
        }
    };
    let params = request.get("params").cloned().unwrap_or(Value::Null);

    let _timer = HistogramTimer::rpc(operation.method_name());
    let ctx = RequestContext::new(Arc::clone(&state.context), user_id);
    let result = state.registry.dispatch(operation, ctx, params).await;

    match result {
        Ok(value) => {
            RPC_REQUESTS
                .with_label_values(&[operation.method_name(), "ok"])
                .inc();
            json!({
                "jsonrpc": "2.0",
                "id": id,
                "result": value
            })
        }
        Err(e) => {
            RPC_REQUESTS
                .with_label_values(&[operation.method_name(), e.outcome()])
                .inc();
            debug!(operation = %operation, user = %user_id, error = %e, "Request rejected");
            error_response(id, e)
        }
    }
}

/// Null IDs and IDs that are neither string nor number are rejected.
fn validate_id(id: Option<&Value>) -> Result<(), RpcError> {
    let Some(id) = id else {
        return Ok(());
    };
    match id {
        Value::Null => Err(RpcError::invalid_request(
            "Invalid Request: null id (notifications not supported)",
        )),
        Value::String(s) if s.is_empty() => {
            Err(RpcError::invalid_request("Invalid Request: empty string id"))
        }
        Value::String(s) if s.len() > MAX_ID_LEN => Err(RpcError::invalid_request(format!(
            "Invalid Request: id string too long (max {MAX_ID_LEN} chars)"
        ))),
        Value::String(_) | Value::Number(_) => Ok(()),
        _ => Err(RpcError::invalid_request(
            "Invalid Request: id must be string or number",
        )),
    }
}

fn error_response(id: Value, err: RpcError) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": err
    })
}

/// Health check endpoint
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "service": "rc-rpc-gateway",
        "version": env!("CARGO_PKG_VERSION"),
        "sessions": state.context.sessions.users().len()
    }))
}

/// Prometheus exposition
async fn metrics() -> impl IntoResponse {
    match encode_metrics() {
        Ok(text) => (StatusCode::OK, text),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}
