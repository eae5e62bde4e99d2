//! Gateway error types.
//!
//! None of these ever reach a transport adapter directly: the gate converts
//! handler and pipe faults into response envelopes, and adapters convert
//! parameter failures into `BAD_REQUEST` envelopes.

use crate::domain::handler::Protocol;
use thiserror::Error;

/// Faults raised by command or action code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandlerError {
    /// Handler reported an undefined fault
    #[error("handler fault: {0}")]
    Fault(String),

    /// Handler code panicked; the payload is kept for logging
    #[error("handler panicked: {0}")]
    Panicked(String),

    /// Call deadline elapsed while the handler was running
    #[error("deadline exceeded")]
    DeadlineExceeded,
}

impl HandlerError {
    /// Create a fault from any message
    pub fn fault(message: impl Into<String>) -> Self {
        Self::Fault(message.into())
    }
}

/// Result type for handler entry points
pub type HandlerResult<T> = Result<T, HandlerError>;

/// Faults raised while a pipe runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipeError {
    /// Pipe reported a fault
    #[error("pipe fault: {0}")]
    Fault(String),

    /// Pipe code panicked
    #[error("pipe panicked: {0}")]
    Panicked(String),
}

impl PipeError {
    /// Create a fault from any message
    pub fn fault(message: impl Into<String>) -> Self {
        Self::Fault(message.into())
    }
}

/// Result type for pipe runs
pub type PipeResult<T> = Result<T, PipeError>;

/// Typed "not found" outcomes of handler and pipe resolution.
///
/// Resolution never fails loudly: the gate maps every variant to a
/// `NO_COMMAND` envelope (handlers) or skips the stage (pipes).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// No registry entry for the requested handler id
    #[error("no handler registered for id '{0}'")]
    UnknownHandler(String),

    /// Registry entry exists but its module or class is empty
    #[error("handler '{handler_id}' has an incomplete binding")]
    IncompleteBinding { handler_id: String },

    /// Registry entry names a class the catalog does not know
    #[error("no class '{path}' in the catalog")]
    UnknownClass { path: String },

    /// Class exists but does not have the requested capability
    #[error("'{path}' is not a {expected}")]
    WrongKind { path: String, expected: &'static str },

    /// Factory failed or panicked while constructing the instance
    #[error("failed to instantiate '{path}': {reason}")]
    Instantiation { path: String, reason: String },

    /// Handler does not accept calls over this protocol
    #[error("handler '{handler_id}' does not accept {protocol} calls")]
    ProtocolNotSupported { handler_id: String, protocol: Protocol },

    /// No pipe registered under this name
    #[error("no pipe named '{0}'")]
    UnknownPipe(String),
}

/// Malformed transport input.
#[derive(Debug, Error)]
pub enum ParamsError {
    /// Body was sent as JSON but could not be parsed
    #[error("request body is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// Body parsed as JSON but is not an object
    #[error("request body must be a JSON object")]
    NotAnObject,

    /// Multipart form body could not be decoded
    #[error("request body is not a valid multipart form: {0}")]
    InvalidMultipart(String),
}

impl From<multer::Error> for ParamsError {
    fn from(err: multer::Error) -> Self {
        Self::InvalidMultipart(err.to_string())
    }
}

/// Failures writing to a streaming transport.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StreamError {
    /// Peer went away or the stream was already finished
    #[error("stream closed")]
    Closed,

    /// Status and headers were already sent
    #[error("response head already sent")]
    HeadCommitted,
}

/// Gateway-level errors (startup and process wiring)
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Server socket bind error
    #[error("server bind error: {0}")]
    Bind(String),

    /// IO error while serving
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal server error
    #[error("internal error: {0}")]
    Internal(String),
}
