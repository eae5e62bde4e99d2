//! Domain types for the gateway.
//!
//! Handlers, pipes, envelopes, configuration and errors. Nothing here knows
//! about HTTP.

pub mod action;
pub mod config;
pub mod correlation;
pub mod error;
pub mod handler;
pub mod pipe;
pub mod response;

// Re-exports for convenience
pub use action::{Action, ActionCode, ActionResponse, ActionState};
pub use config::{GatewayConfig, HandlerBinding, PipeTable};
pub use correlation::CorrelationId;
pub use error::{GatewayError, HandlerError, HandlerResult, PipeError, PipeResult, ResolveError};
pub use handler::{Command, CommandState, HandlerIdentity, Params, Protocol};
pub use pipe::{Phase, Pipe, PipeState, Verdict};
pub use response::{CommandResponse, ResponseCode};
