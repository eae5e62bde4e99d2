//! Command handlers and their identity.
//!
//! A command is created once per call by the gate, after its id resolved in
//! the handler registry. Its identity (id, verb, protocol) is fixed at
//! construction; only the handler's own `run`/`async_run` touches its result.

use crate::domain::error::HandlerResult;
use crate::ports::outbound::StreamSink;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Parameters handed to a handler, after reserved keys were removed
pub type Params = serde_json::Map<String, Value>;

/// Adapter family a call arrived through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    /// In-process call, no transport
    Direct,
    /// One-shot request/response
    Rest,
    /// Fire-and-return RPC
    Rpc,
    /// Server-push event stream
    Stream,
}

impl Protocol {
    /// Canonical lowercase name
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Rest => "rest",
            Self::Rpc => "rpc",
            Self::Stream => "stream",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of a single handler instance.
///
/// No setters: every field is fixed when the gate constructs the handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerIdentity {
    handler_id: String,
    verb: String,
    protocol: Protocol,
}

impl HandlerIdentity {
    pub fn new(handler_id: impl Into<String>, verb: impl Into<String>, protocol: Protocol) -> Self {
        Self {
            handler_id: handler_id.into(),
            verb: verb.into(),
            protocol,
        }
    }

    /// Symbolic id the handler was resolved by
    pub fn handler_id(&self) -> &str {
        &self.handler_id
    }

    /// Verb (method) the call was made with
    pub fn verb(&self) -> &str {
        &self.verb
    }

    /// Adapter family that created the handler
    pub fn protocol(&self) -> Protocol {
        self.protocol
    }
}

/// Per-call state every command carries.
///
/// Handlers embed one of these and expose it through [`Command::state`].
#[derive(Debug, Clone)]
pub struct CommandState {
    identity: HandlerIdentity,
    result: Option<Value>,
    message: Option<String>,
}

impl CommandState {
    pub fn new(identity: HandlerIdentity) -> Self {
        Self {
            identity,
            result: None,
            message: None,
        }
    }

    pub fn identity(&self) -> &HandlerIdentity {
        &self.identity
    }

    pub fn result(&self) -> Option<&Value> {
        self.result.as_ref()
    }

    /// Store the payload copied into the envelope on success or failure
    pub fn set_result(&mut self, result: impl Into<Value>) {
        self.result = Some(result.into());
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Override the default envelope message
    pub fn set_message(&mut self, message: impl Into<String>) {
        self.message = Some(message.into());
    }
}

/// A unit of business logic resolved by id.
///
/// `Ok(true)` is business success (`SUCCESS`), `Ok(false)` a defined
/// business failure (`FAIL`), and `Err` an undefined fault (`ERROR`).
/// Panics are treated like `Err`.
#[async_trait]
pub trait Command: Send {
    /// Identity and result slot of this instance
    fn state(&self) -> &CommandState;

    /// Blocking entry point, used by `Gate::call`. Must not suspend.
    fn run(&mut self, params: &Params, verb: &str) -> HandlerResult<bool>;

    /// Suspendable entry point, used by `Gate::async_call`.
    ///
    /// `stream` is attached only under the streaming adapter; elsewhere it
    /// silently discards pushes (see [`StreamSink::is_attached`]).
    async fn async_run(
        &mut self,
        params: &Params,
        verb: &str,
        stream: &mut dyn StreamSink,
    ) -> HandlerResult<bool>;

    fn identity(&self) -> &HandlerIdentity {
        self.state().identity()
    }

    fn result(&self) -> Option<&Value> {
        self.state().result()
    }

    fn message(&self) -> Option<&str> {
        self.state().message()
    }
}
