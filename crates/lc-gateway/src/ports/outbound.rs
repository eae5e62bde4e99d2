//! Outbound ports for the gateway.
//!
//! [`StreamSink`] is what a handler sees during `async_run`; a
//! [`StreamTransport`] is what the streaming adapter writes frames into.

use crate::domain::error::StreamError;
use async_trait::async_trait;
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use bytes::Bytes;

pub const EVENT_STREAM_CONTENT_TYPE: &str = "text/event-stream;charset=UTF-8";

/// Status/header change requested by a handler
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeadUpdate {
    pub status: Option<u16>,
    pub headers: Vec<(String, String)>,
}

impl HeadUpdate {
    pub fn status(status: u16) -> Self {
        Self {
            status: Some(status),
            headers: Vec::new(),
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// Incremental output channel handed to `Command::async_run`
#[async_trait]
pub trait StreamSink: Send {
    /// False when pushes go nowhere (non-streaming calls)
    fn is_attached(&self) -> bool {
        true
    }

    /// Emit one discrete message
    async fn push(&mut self, message: &str) -> Result<(), StreamError>;

    /// Adjust outgoing status and headers before the head is sent
    async fn rebuild_head(&mut self, update: HeadUpdate) -> Result<(), StreamError>;
}

/// Sink used when no streaming adapter is attached; discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct DetachedSink;

#[async_trait]
impl StreamSink for DetachedSink {
    fn is_attached(&self) -> bool {
        false
    }

    async fn push(&mut self, _message: &str) -> Result<(), StreamError> {
        Ok(())
    }

    async fn rebuild_head(&mut self, _update: HeadUpdate) -> Result<(), StreamError> {
        Ok(())
    }
}

/// Status line and headers of a streaming response
#[derive(Debug, Clone)]
pub struct ResponseHead {
    pub status: StatusCode,
    pub headers: HeaderMap,
}

impl Default for ResponseHead {
    fn default() -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static(EVENT_STREAM_CONTENT_TYPE),
        );
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        Self {
            status: StatusCode::OK,
            headers,
        }
    }
}

/// Byte-level streaming transport
#[async_trait]
pub trait StreamTransport: Send {
    /// Commit status and headers; called at most once, before any `send`
    async fn open(&mut self, head: ResponseHead) -> Result<(), StreamError>;

    /// Write one already-framed chunk
    async fn send(&mut self, chunk: Bytes) -> Result<(), StreamError>;

    /// Signal end of stream
    async fn eof(&mut self) -> Result<(), StreamError>;
}
