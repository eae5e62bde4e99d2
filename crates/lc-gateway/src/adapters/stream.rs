//! Server-push streaming adapter.
//!
//! The handler's pushes become `data: <payload>\n\n` frames. The response
//! head is built lazily on first use, may be adjusted until the first frame
//! commits it, and the adapter always finishes with an end-of-stream signal.

use crate::adapters::params::{params_from_parts, take_reserved};
use crate::adapters::rest::render;
use crate::domain::config::ParamKeys;
use crate::domain::correlation::CorrelationId;
use crate::domain::error::StreamError;
use crate::domain::handler::{Params, Protocol};
use crate::domain::response::CommandResponse;
use crate::gate::Gate;
use crate::middleware::metrics::GatewayMetrics;
use crate::ports::outbound::{HeadUpdate, ResponseHead, StreamSink, StreamTransport};
use async_trait::async_trait;
use axum::http::{HeaderName, HeaderValue, StatusCode};
use bytes::Bytes;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

/// Format one event-stream frame; each payload line gets its own `data:` field
pub fn event_frame(message: &str) -> Bytes {
    let mut frame = String::with_capacity(message.len() + 8);
    for line in message.split('\n') {
        frame.push_str("data: ");
        frame.push_str(line.strip_suffix('\r').unwrap_or(line));
        frame.push('\n');
    }
    frame.push('\n');
    Bytes::from(frame)
}

#[derive(Debug, Default)]
struct StreamResponse {
    head: ResponseHead,
    opened: bool,
}

/// Per-call streaming state; the sink handed to `Command::async_run`
pub struct StreamContext<T: StreamTransport> {
    transport: T,
    response: Option<StreamResponse>,
    frames_sent: usize,
    metrics: Arc<GatewayMetrics>,
}

impl<T: StreamTransport> StreamContext<T> {
    pub fn new(transport: T, metrics: Arc<GatewayMetrics>) -> Self {
        Self {
            transport,
            response: None,
            frames_sent: 0,
            metrics,
        }
    }

    /// Apply a status/header change to the pending head.
    ///
    /// Invalid statuses or header pairs are skipped with a warning. Once the
    /// head has been sent, changes are refused.
    pub async fn rebuild_response(&mut self, update: HeadUpdate) -> Result<(), StreamError> {
        let response = self.response.get_or_insert_with(StreamResponse::default);
        if response.opened {
            warn!("event-stream head already sent, ignoring rebuild");
            return Err(StreamError::HeadCommitted);
        }

        if let Some(status) = update.status {
            match StatusCode::from_u16(status) {
                Ok(status) => response.head.status = status,
                Err(_) => warn!(status, "ignoring invalid event-stream status"),
            }
        }

        for (name, value) in update.headers {
            match (
                HeaderName::try_from(name.as_str()),
                HeaderValue::from_str(&value),
            ) {
                (Ok(name), Ok(value)) => {
                    response.head.headers.insert(name, value);
                }
                _ => warn!(header = %name, "ignoring invalid event-stream header"),
            }
        }

        Ok(())
    }

    /// Send one `data:` frame, committing the head first if needed
    pub async fn send_event_message(&mut self, message: &str) -> Result<(), StreamError> {
        self.ensure_open().await?;
        if let Err(e) = self.transport.send(event_frame(message)).await {
            warn!(error = %e, "event-stream send failed");
            return Err(e);
        }
        self.frames_sent += 1;
        self.metrics.record_stream_frame();
        Ok(())
    }

    /// Signal end of stream
    pub async fn eof(&mut self) -> Result<(), StreamError> {
        self.ensure_open().await?;
        self.transport.eof().await
    }

    pub fn frames_sent(&self) -> usize {
        self.frames_sent
    }

    /// Whether the head has been sent
    pub fn is_committed(&self) -> bool {
        self.response.as_ref().is_some_and(|r| r.opened)
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    async fn ensure_open(&mut self) -> Result<(), StreamError> {
        let response = self.response.get_or_insert_with(StreamResponse::default);
        if !response.opened {
            response.opened = true;
            self.transport.open(response.head.clone()).await?;
            self.metrics.record_stream_opened();
            debug!(status = %response.head.status, "event-stream opened");
        }
        Ok(())
    }
}

#[async_trait]
impl<T: StreamTransport> StreamSink for StreamContext<T> {
    async fn push(&mut self, message: &str) -> Result<(), StreamError> {
        self.send_event_message(message).await
    }

    async fn rebuild_head(&mut self, update: HeadUpdate) -> Result<(), StreamError> {
        self.rebuild_response(update).await
    }
}

/// Transport backed by channels, drained by the HTTP body
pub struct ChannelTransport {
    head_tx: Option<oneshot::Sender<ResponseHead>>,
    body_tx: Option<mpsc::Sender<Bytes>>,
}

impl ChannelTransport {
    /// Returns the transport plus the head and body receivers.
    ///
    /// The body receiver ends when `eof` is called or the transport drops.
    pub fn new(buffer: usize) -> (Self, oneshot::Receiver<ResponseHead>, mpsc::Receiver<Bytes>) {
        let (head_tx, head_rx) = oneshot::channel();
        let (body_tx, body_rx) = mpsc::channel(buffer.max(1));
        let transport = Self {
            head_tx: Some(head_tx),
            body_tx: Some(body_tx),
        };
        (transport, head_rx, body_rx)
    }
}

#[async_trait]
impl StreamTransport for ChannelTransport {
    async fn open(&mut self, head: ResponseHead) -> Result<(), StreamError> {
        let tx = self.head_tx.take().ok_or(StreamError::HeadCommitted)?;
        tx.send(head).map_err(|_| StreamError::Closed)
    }

    async fn send(&mut self, chunk: Bytes) -> Result<(), StreamError> {
        let tx = self.body_tx.as_ref().ok_or(StreamError::Closed)?;
        tx.send(chunk).await.map_err(|_| StreamError::Closed)
    }

    async fn eof(&mut self) -> Result<(), StreamError> {
        self.body_tx.take().map(drop).ok_or(StreamError::Closed)
    }
}

/// Streaming adapter over the suspendable gate entry point
#[derive(Clone)]
pub struct StreamAdapter {
    gate: Arc<Gate>,
    keys: ParamKeys,
}

impl StreamAdapter {
    pub fn new(gate: Arc<Gate>, keys: ParamKeys) -> Self {
        Self { gate, keys }
    }

    /// Run one streaming call to completion, ending with `eof`.
    ///
    /// The envelope is not sent; whatever the handler pushed is the output.
    pub async fn call<T: StreamTransport>(
        &self,
        params: Params,
        transport: T,
        correlation_id: CorrelationId,
    ) -> StreamContext<T> {
        let mut params = params;
        let handler_id = take_reserved(&mut params, &self.keys.stream_command_id);
        let verb = take_reserved(&mut params, &self.keys.stream_method);

        let mut stream = StreamContext::new(transport, self.gate.metrics());
        let ctx = self
            .gate
            .context(Protocol::Stream)
            .with_correlation_id(correlation_id);
        let response = self
            .gate
            .async_call_in(&ctx, &handler_id, &params, &verb, Some(&mut stream))
            .await;
        debug!(
            handler_id = %handler_id,
            code = response.code().value(),
            frames = stream.frames_sent(),
            "stream call finished"
        );

        if let Err(e) = stream.eof().await {
            warn!(error = %e, "event-stream eof failed");
        }
        stream
    }

    /// Extract parameters, then stream.
    ///
    /// Malformed input sends a single `BAD_REQUEST` envelope frame with
    /// status 400 and never reaches the gate.
    pub async fn call_from_parts<T: StreamTransport>(
        &self,
        query: Option<&str>,
        content_type: Option<&str>,
        body: &[u8],
        transport: T,
        correlation_id: CorrelationId,
    ) -> StreamContext<T> {
        match params_from_parts(query, content_type, body) {
            Ok(params) => self.call(params, transport, correlation_id).await,
            Err(e) => {
                warn!(error = %e, %correlation_id, "rejecting malformed stream request");
                let mut stream = StreamContext::new(transport, self.gate.metrics());
                let _ = stream
                    .rebuild_response(HeadUpdate::status(StatusCode::BAD_REQUEST.as_u16()))
                    .await;
                let frame = render(&CommandResponse::malformed_request()).to_string();
                let _ = stream.send_event_message(&frame).await;
                let _ = stream.eof().await;
                stream
            }
        }
    }
}
