//! Transport adapters.
//!
//! Each adapter turns a transport-specific request into
//! `(handler_id, params, verb)`, calls the gate and renders the result. The
//! HTTP wiring lives in [`crate::service`]; these types are transport-agnostic
//! apart from the stream head types.

pub mod action;
pub mod params;
pub mod rest;
pub mod rpc;
pub mod stream;

pub use action::ActionAdapter;
pub use params::{params_from_parts, take_reserved};
pub use rest::RestAdapter;
pub use rpc::{RpcAdapter, RpcRequest};
pub use stream::{ChannelTransport, StreamAdapter, StreamContext};
