//! Gateway service: mounts the adapters on one axum router and runs it.

use crate::adapters::{
    action, rest, ActionAdapter, ChannelTransport, RestAdapter, RpcAdapter, RpcRequest,
    StreamAdapter,
};
use crate::domain::config::GatewayConfig;
use crate::domain::correlation::CorrelationId;
use crate::domain::error::GatewayError;
use crate::domain::response::{CommandResponse, ResponseCode};
use crate::gate::{ActionDispatcher, Catalog, Gate};
use crate::middleware::{create_cors_layer, GatewayMetrics, TracingLayer, REQUEST_ID_HEADER};
use crate::ports::outbound::ResponseHead;
use axum::{
    body::{Body, Bytes},
    extract::{DefaultBodyLimit, RawQuery, State},
    http::{header, HeaderMap, HeaderName},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_stream::{wrappers::ReceiverStream, StreamExt};
use tower::ServiceBuilder;
use tracing::{error, info, Instrument, Span};

/// Gateway HTTP service
pub struct GatewayService {
    config: GatewayConfig,
    gate: Arc<Gate>,
    actions: Arc<ActionDispatcher>,
    metrics: Arc<GatewayMetrics>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    server: Option<JoinHandle<std::io::Result<()>>>,
}

impl GatewayService {
    /// Create a new gateway service
    pub fn new(config: GatewayConfig, catalog: Arc<Catalog>) -> Result<Self, GatewayError> {
        config
            .validate()
            .map_err(|e| GatewayError::Config(e.to_string()))?;

        let metrics = Arc::new(GatewayMetrics::new());
        let gate = Arc::new(
            Gate::new(&config, Arc::clone(&catalog)).with_metrics(Arc::clone(&metrics)),
        );
        let actions = Arc::new(ActionDispatcher::new(catalog, Arc::clone(&metrics)));

        Ok(Self {
            config,
            gate,
            actions,
            metrics,
            shutdown_tx: None,
            server: None,
        })
    }

    /// Bind the HTTP listener and serve in the background.
    ///
    /// Returns the bound address (useful with port 0).
    pub async fn start(&mut self) -> Result<SocketAddr, GatewayError> {
        if !self.config.http.enabled {
            return Err(GatewayError::Config("http server is disabled".into()));
        }
        if self.server.is_some() {
            return Err(GatewayError::Internal("gateway already started".into()));
        }

        let addr = self.config.http_addr();
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| GatewayError::Bind(format!("{addr}: {e}")))?;
        let local_addr = listener.local_addr()?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        self.shutdown_tx = Some(shutdown_tx);

        let router = self.router();
        self.server = Some(tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
        }));

        info!(addr = %local_addr, "Gateway listening");
        Ok(local_addr)
    }

    /// Trigger graceful shutdown and wait for in-flight requests
    pub async fn shutdown(&mut self) -> Result<(), GatewayError> {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        if let Some(server) = self.server.take() {
            match server.await {
                Ok(result) => result?,
                Err(e) => return Err(GatewayError::Internal(e.to_string())),
            }
            info!("Gateway stopped");
        }
        Ok(())
    }

    pub fn gate(&self) -> Arc<Gate> {
        Arc::clone(&self.gate)
    }

    pub fn metrics(&self) -> Arc<GatewayMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Build the HTTP router with every adapter mounted
    pub fn router(&self) -> Router {
        let keys = self.config.params.clone();
        let state = AppState {
            rest: RestAdapter::new(Arc::clone(&self.gate), keys.clone()),
            rpc: RpcAdapter::new(Arc::clone(&self.gate)),
            stream: StreamAdapter::new(Arc::clone(&self.gate), keys.clone()),
            actions: ActionAdapter::new(Arc::clone(&self.actions), keys),
            metrics: Arc::clone(&self.metrics),
            stream_buffer: self.config.limits.stream_buffer,
        };

        let middleware = ServiceBuilder::new()
            .layer(create_cors_layer(&self.config.cors))
            .layer(TracingLayer::new());

        let routes = &self.config.routes;
        Router::new()
            .route(&routes.command, get(handle_command).post(handle_command))
            .route(&routes.rpc, axum::routing::post(handle_rpc))
            .route(&routes.stream, get(handle_stream).post(handle_stream))
            .route(&routes.action, get(handle_action).post(handle_action))
            .route(&routes.health, get(health_check))
            .route(&routes.metrics, get(metrics_json))
            .layer(DefaultBodyLimit::max(self.config.limits.max_body_size))
            .layer(middleware)
            .with_state(state)
    }
}

/// Application state shared across handlers
#[derive(Clone)]
struct AppState {
    rest: RestAdapter,
    rpc: RpcAdapter,
    stream: StreamAdapter,
    actions: ActionAdapter,
    metrics: Arc<GatewayMetrics>,
    stream_buffer: usize,
}

/// Request parts every adapter needs
struct Parts {
    query: Option<String>,
    content_type: Option<String>,
    correlation_id: CorrelationId,
}

impl Parts {
    fn new(headers: &HeaderMap, query: Option<String>) -> Self {
        let header = |name: HeaderName| headers.get(name).and_then(|v| v.to_str().ok());
        Self {
            query,
            content_type: header(header::CONTENT_TYPE).map(str::to_string),
            correlation_id: CorrelationId::from_header(header(REQUEST_ID_HEADER)),
        }
    }
}

async fn handle_command(
    State(state): State<AppState>,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
    body: Bytes,
) -> Response {
    let parts = Parts::new(&headers, query);
    let rest = state.rest;
    let span = Span::current();
    let task = tokio::task::spawn_blocking(move || {
        span.in_scope(|| {
            rest.call_from_parts(
                parts.query.as_deref(),
                parts.content_type.as_deref(),
                &body,
                parts.correlation_id,
            )
        })
    });

    match task.await {
        Ok(body) => Json(body).into_response(),
        Err(e) => {
            error!(error = %e, "command task failed");
            Json(rest::render(&CommandResponse::new(ResponseCode::Error, None, None)))
                .into_response()
        }
    }
}

async fn handle_rpc(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let parts = Parts::new(&headers, None);
    let request: RpcRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            tracing::warn!(error = %e, "rejecting malformed rpc request");
            return Json(rest::render(&CommandResponse::malformed_request())).into_response();
        }
    };

    let rpc = state.rpc;
    let span = Span::current();
    let task = tokio::task::spawn_blocking(move || {
        span.in_scope(|| rpc.call(&request, parts.correlation_id))
    });

    match task.await {
        Ok(response) => Json(rest::render(&response)).into_response(),
        Err(e) => {
            error!(error = %e, "rpc task failed");
            Json(rest::render(&CommandResponse::new(ResponseCode::Error, None, None)))
                .into_response()
        }
    }
}

async fn handle_stream(
    State(state): State<AppState>,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
    body: Bytes,
) -> Response {
    let parts = Parts::new(&headers, query);
    let (transport, head_rx, body_rx) = ChannelTransport::new(state.stream_buffer);
    let adapter = state.stream;

    tokio::spawn(
        async move {
            adapter
                .call_from_parts(
                    parts.query.as_deref(),
                    parts.content_type.as_deref(),
                    &body,
                    transport,
                    parts.correlation_id,
                )
                .await;
        }
        .instrument(Span::current()),
    );

    // The adapter always opens the head before eof; a dropped sender means
    // the task died, and the empty body ends the stream.
    let head = head_rx.await.unwrap_or_else(|_| {
        error!("stream task ended before sending a head");
        ResponseHead::default()
    });

    let stream = ReceiverStream::new(body_rx).map(Ok::<_, Infallible>);
    let mut response = Response::new(Body::from_stream(stream));
    *response.status_mut() = head.status;
    *response.headers_mut() = head.headers;
    response
}

async fn handle_action(
    State(state): State<AppState>,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
    body: Bytes,
) -> Response {
    let parts = Parts::new(&headers, query);
    let actions = state.actions;
    let span = Span::current();
    let task = tokio::task::spawn_blocking(move || {
        span.in_scope(|| {
            actions.call_from_parts(
                parts.query.as_deref(),
                parts.content_type.as_deref(),
                &body,
                parts.correlation_id,
            )
        })
    });

    match task.await {
        Ok(body) => Json(body).into_response(),
        Err(e) => {
            error!(error = %e, "action task failed");
            Json(action::render(&crate::domain::action::ActionResponse::unexpected()))
                .into_response()
        }
    }
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": crate::VERSION,
    }))
}

async fn metrics_json(State(state): State<AppState>) -> Json<Value> {
    Json(state.metrics.to_json())
}
