//! The gate: resolves a handler, drives the before-chain, invokes the
//! handler, drives the after-chain and builds the envelope.
//!
//! ```text
//! resolve ──miss──────────────────────────────────────────► NO_COMMAND
//!    │
//! before-chain ──INTERRUPT──────────────────────────────────► pipe response | BAD_REQUEST
//!    │
//! handler ──false──► FAIL      ──fault/panic──► ERROR
//!    │ true
//! after-chain ──INTERRUPT───────────────────────────────────► pipe response | BAD_REQUEST
//!    │
//! SUCCESS
//! ```
//!
//! `call` and `async_call` share every stage except the handler entry point.
//! Nothing below the gate lets a fault reach an adapter.

pub mod action;
pub mod context;
pub mod registry;

pub use action::ActionDispatcher;
pub use context::CallContext;
pub use registry::{ActionFactory, Catalog, CommandFactory, HandlerRegistry, PipeFactory};

use crate::domain::config::{GatewayConfig, PipeTable};
use crate::domain::error::{HandlerError, HandlerResult, PipeError, ResolveError};
use crate::domain::handler::{Command, HandlerIdentity, Params, Protocol};
use crate::domain::pipe::{Phase, Verdict};
use crate::domain::response::CommandResponse;
use crate::middleware::metrics::{CallTimer, GatewayMetrics};
use crate::ports::outbound::{DetachedSink, StreamSink};
use futures::FutureExt;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, info_span, warn, Instrument};

/// Gateway coordinator.
///
/// Holds only read-only tables; one instance serves all concurrent calls.
pub struct Gate {
    registry: HandlerRegistry,
    pipes: PipeTable,
    metrics: Arc<GatewayMetrics>,
    call_timeout: Option<Duration>,
}

impl Gate {
    /// Build from configuration and the process catalog
    pub fn new(config: &GatewayConfig, catalog: Arc<Catalog>) -> Self {
        Self {
            registry: HandlerRegistry::new(config.handlers.clone(), catalog),
            pipes: config.pipes.clone(),
            metrics: Arc::new(GatewayMetrics::new()),
            call_timeout: Some(config.timeouts.call),
        }
    }

    /// Share an existing metrics instance
    pub fn with_metrics(mut self, metrics: Arc<GatewayMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Override the per-call deadline; `None` disables it
    pub fn with_call_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn metrics(&self) -> Arc<GatewayMetrics> {
        Arc::clone(&self.metrics)
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// Fresh context for one call, carrying the configured deadline
    pub fn context(&self, protocol: Protocol) -> CallContext {
        let ctx = CallContext::new(protocol);
        match self.call_timeout {
            Some(timeout) => ctx.with_timeout(timeout),
            None => ctx,
        }
    }

    /// Blocking call. Never suspends.
    pub fn call(&self, handler_id: &str, params: &Params, verb: &str) -> CommandResponse {
        let ctx = self.context(Protocol::Direct);
        self.call_in(&ctx, handler_id, params, verb)
    }

    /// Blocking call under an explicit context
    pub fn call_in(
        &self,
        ctx: &CallContext,
        handler_id: &str,
        params: &Params,
        verb: &str,
    ) -> CommandResponse {
        let span = call_span(ctx, handler_id, verb);
        let _enter = span.enter();

        let timer = CallTimer::new(self.metrics());
        let response = self.eval(ctx, handler_id, params, verb);
        timer.finish(response.code());
        debug!(code = response.code().value(), "call finished");
        response
    }

    /// Suspendable call.
    ///
    /// `stream` is handed to the handler's `async_run`; without one the
    /// handler's pushes are discarded.
    pub async fn async_call(
        &self,
        handler_id: &str,
        params: &Params,
        verb: &str,
        stream: Option<&mut dyn StreamSink>,
    ) -> CommandResponse {
        let ctx = self.context(Protocol::Direct);
        self.async_call_in(&ctx, handler_id, params, verb, stream)
            .await
    }

    /// Suspendable call under an explicit context
    pub async fn async_call_in(
        &self,
        ctx: &CallContext,
        handler_id: &str,
        params: &Params,
        verb: &str,
        stream: Option<&mut dyn StreamSink>,
    ) -> CommandResponse {
        let span = call_span(ctx, handler_id, verb);
        async move {
            let timer = CallTimer::new(self.metrics());
            let response = self
                .async_eval(ctx, handler_id, params, verb, stream)
                .await;
            timer.finish(response.code());
            debug!(code = response.code().value(), "call finished");
            response
        }
        .instrument(span)
        .await
    }

    fn eval(
        &self,
        ctx: &CallContext,
        handler_id: &str,
        params: &Params,
        verb: &str,
    ) -> CommandResponse {
        let mut cmd = match self.resolve(ctx, handler_id, verb) {
            Ok(cmd) => cmd,
            Err(response) => return response,
        };

        if let Some(response) = self.run_chain(ctx, Phase::Before, cmd.as_ref(), None) {
            return response;
        }

        if ctx.is_expired() {
            return self.timed_out(cmd.identity());
        }

        let outcome = catch_unwind(AssertUnwindSafe(|| cmd.run(params, verb)))
            .unwrap_or_else(|payload| Err(HandlerError::Panicked(panic_message(payload.as_ref()))));

        self.complete(ctx, cmd.as_ref(), outcome)
    }

    async fn async_eval(
        &self,
        ctx: &CallContext,
        handler_id: &str,
        params: &Params,
        verb: &str,
        stream: Option<&mut dyn StreamSink>,
    ) -> CommandResponse {
        let mut cmd = match self.resolve(ctx, handler_id, verb) {
            Ok(cmd) => cmd,
            Err(response) => return response,
        };

        if let Some(response) = self.run_chain(ctx, Phase::Before, cmd.as_ref(), None) {
            return response;
        }

        if ctx.is_expired() {
            return self.timed_out(cmd.identity());
        }

        let mut detached = DetachedSink;
        let sink: &mut dyn StreamSink = match stream {
            Some(sink) => sink,
            None => &mut detached,
        };

        let run = AssertUnwindSafe(cmd.async_run(params, verb, sink)).catch_unwind();
        let outcome = match ctx.deadline() {
            Some(deadline) => tokio::time::timeout_at(deadline, run)
                .await
                .unwrap_or(Ok(Err(HandlerError::DeadlineExceeded))),
            None => run.await,
        };
        let outcome = outcome
            .unwrap_or_else(|payload| Err(HandlerError::Panicked(panic_message(payload.as_ref()))));

        self.complete(ctx, cmd.as_ref(), outcome)
    }

    /// Resolve the handler, or the envelope to return instead
    fn resolve(
        &self,
        ctx: &CallContext,
        handler_id: &str,
        verb: &str,
    ) -> Result<Box<dyn Command>, CommandResponse> {
        self.registry
            .resolve_command(handler_id, verb, ctx.protocol())
            .map_err(|e| {
                warn!(error = %e, "handler resolution failed");
                match e {
                    ResolveError::ProtocolNotSupported { .. } => {
                        CommandResponse::protocol_not_supported(handler_id)
                    }
                    _ => CommandResponse::no_command(handler_id),
                }
            })
    }

    /// Map the handler outcome and run the after-chain on success
    fn complete(
        &self,
        ctx: &CallContext,
        cmd: &dyn Command,
        outcome: HandlerResult<bool>,
    ) -> CommandResponse {
        match outcome {
            Ok(true) => {}
            Ok(false) => {
                debug!("handler reported failure");
                return CommandResponse::fail(cmd);
            }
            Err(HandlerError::DeadlineExceeded) => {
                warn!("handler exceeded the call deadline");
                return self.timed_out(cmd.identity());
            }
            Err(e) => {
                error!(error = %e, "handler fault");
                return CommandResponse::error(cmd.identity());
            }
        }

        let tentative = CommandResponse::success(cmd);
        self.run_chain(ctx, Phase::After, cmd, Some(&tentative))
            .unwrap_or(tentative)
    }

    /// Run the configured chain for `phase`.
    ///
    /// Returns the envelope that ends the call early, or `None` when every
    /// pipe let the call through.
    fn run_chain(
        &self,
        ctx: &CallContext,
        phase: Phase,
        cmd: &dyn Command,
        response: Option<&CommandResponse>,
    ) -> Option<CommandResponse> {
        let identity = cmd.identity();
        let names = self.pipes.chain_for(identity.handler_id(), phase);

        for name in names {
            if ctx.is_expired() {
                warn!(pipe = %name, %phase, "deadline passed during pipe chain");
                return Some(self.timed_out(identity));
            }

            let mut pipe = match self.registry.catalog().instantiate_pipe(name) {
                Ok(pipe) => pipe,
                Err(ResolveError::UnknownPipe(_)) => {
                    warn!(pipe = %name, %phase, "pipe not found, skipping");
                    self.metrics.record_pipe_skipped();
                    continue;
                }
                Err(e) => {
                    error!(pipe = %name, %phase, error = %e, "pipe construction failed");
                    return Some(CommandResponse::bad_request(identity));
                }
            };

            let verdict = catch_unwind(AssertUnwindSafe(|| pipe.run(cmd, response)))
                .unwrap_or_else(|payload| Err(PipeError::Panicked(panic_message(payload.as_ref()))));

            match verdict {
                Ok(Verdict::Interrupt) => {
                    self.metrics.record_interrupt();
                    let response = pipe
                        .state_mut()
                        .take_response()
                        .unwrap_or_else(|| CommandResponse::bad_request(identity));
                    info!(
                        pipe = %name,
                        %phase,
                        code = response.code().value(),
                        message = pipe.state().message().unwrap_or_default(),
                        "pipe interrupted call"
                    );
                    return Some(response);
                }
                Ok(verdict @ (Verdict::Continue | Verdict::Pass)) => {
                    debug!(pipe = %name, %phase, ?verdict, "pipe let call through");
                }
                Err(e) => {
                    error!(pipe = %name, %phase, error = %e, "pipe fault");
                    return Some(CommandResponse::bad_request(identity));
                }
            }
        }

        None
    }

    fn timed_out(&self, identity: &HandlerIdentity) -> CommandResponse {
        self.metrics.record_timeout();
        CommandResponse::timed_out(identity)
    }
}

fn call_span(ctx: &CallContext, handler_id: &str, verb: &str) -> tracing::Span {
    info_span!(
        "gate_call",
        handler_id = %handler_id,
        verb = %verb,
        protocol = %ctx.protocol(),
        correlation_id = %ctx.correlation_id(),
    )
}

/// Best-effort text of a caught panic payload
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
