//! Lightcone gateway - command dispatch behind REST, RPC and event-stream
//! transports.
//!
//! A caller names a handler by id; the gate resolves it from configuration,
//! runs the before pipes, the handler, then the after pipes, and returns one
//! uniform [`CommandResponse`] whatever happened.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       LIGHTCONE GATEWAY                       │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌──────────┐  ┌──────────┐  ┌──────────┐  ┌──────────┐       │
//! │  │ /command │  │   /rpc   │  │ /stream  │  │ /action  │       │
//! │  └────┬─────┘  └────┬─────┘  └────┬─────┘  └────┬─────┘       │
//! │       │             │             │             │             │
//! │  ┌────┴─────────────┴─────────────┴────┐   ┌────┴──────┐      │
//! │  │        Middleware: CORS → Tracing    │   │  Action   │      │
//! │  └────────────────┬─────────────────────┘   │ Dispatcher│      │
//! │                   │                         └───────────┘      │
//! │  ┌────────────────┴─────────────────────┐                     │
//! │  │  Gate: resolve → before → handler →  │                     │
//! │  │        after → envelope              │                     │
//! │  └────────────────┬─────────────────────┘                     │
//! │                   │                                           │
//! │  ┌────────────────┴─────────────────────┐                     │
//! │  │  Catalog (module, class) → factory   │                     │
//! │  └──────────────────────────────────────┘                     │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use lc_gateway::{Catalog, GatewayConfig, GatewayService};
//!
//! let mut catalog = Catalog::new();
//! catalog.register_command("demo", "Bar", Bar::create);
//! let mut service = GatewayService::new(GatewayConfig::default(), Arc::new(catalog))?;
//! service.start().await?;
//! ```

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod adapters;
pub mod domain;
pub mod gate;
pub mod middleware;
pub mod ports;
pub mod service;

// Re-exports for public API
pub use adapters::{ActionAdapter, RestAdapter, RpcAdapter, RpcRequest, StreamAdapter};
pub use domain::action::{Action, ActionCode, ActionResponse, ActionState};
pub use domain::config::{GatewayConfig, HandlerBinding, PipeTable};
pub use domain::correlation::CorrelationId;
pub use domain::error::{
    GatewayError, HandlerError, HandlerResult, PipeError, PipeResult, ResolveError, StreamError,
};
pub use domain::handler::{Command, CommandState, HandlerIdentity, Params, Protocol};
pub use domain::pipe::{Phase, Pipe, PipeState, Verdict};
pub use domain::response::{CommandResponse, ResponseCode};
pub use gate::{ActionDispatcher, CallContext, Catalog, Gate};
pub use middleware::GatewayMetrics;
pub use ports::{HeadUpdate, StreamSink};
pub use service::GatewayService;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
