//! Action dispatch: `before` → `run` → `after`, outside the pipe chain.

use crate::domain::action::{Action, ActionResponse};
use crate::domain::error::{HandlerError, HandlerResult};
use crate::domain::handler::{HandlerIdentity, Params, Protocol};
use crate::gate::panic_message;
use crate::gate::registry::Catalog;
use crate::middleware::metrics::GatewayMetrics;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, error, info_span, warn};

/// Resolves and runs actions by name
pub struct ActionDispatcher {
    catalog: Arc<Catalog>,
    metrics: Arc<GatewayMetrics>,
}

impl ActionDispatcher {
    pub fn new(catalog: Arc<Catalog>, metrics: Arc<GatewayMetrics>) -> Self {
        Self { catalog, metrics }
    }

    /// Run the action registered under `name`. Never fails outward.
    pub fn dispatch(
        &self,
        name: &str,
        params: &Params,
        verb: &str,
        protocol: Protocol,
    ) -> ActionResponse {
        let span = info_span!("action_call", action = %name, verb = %verb, protocol = %protocol);
        let _enter = span.enter();

        let response = self.eval(name, params, verb, protocol);
        self.metrics.record_action(response.code);
        debug!(code = response.code.value(), "action finished");
        response
    }

    fn eval(&self, name: &str, params: &Params, verb: &str, protocol: Protocol) -> ActionResponse {
        let identity = HandlerIdentity::new(name, verb, protocol);
        let mut action = match self.catalog.instantiate_action(name, identity) {
            Ok(action) => action,
            Err(e) => {
                warn!(error = %e, "action resolution failed");
                return ActionResponse::not_found(name);
            }
        };

        let outcome = catch_unwind(AssertUnwindSafe(|| lifecycle(action.as_mut(), params, verb)))
            .unwrap_or_else(|payload| Err(HandlerError::Panicked(panic_message(payload.as_ref()))));

        match outcome {
            Ok(None) => ActionResponse::from_state(action.state()),
            Ok(Some(hook)) => {
                if action.state().code().is_some() {
                    warn!(hook, "action hook aborted with a declared code");
                } else {
                    error!(hook, "action hook aborted without a declared code");
                }
                ActionResponse::aborted(action.state())
            }
            Err(e) => {
                error!(error = %e, "action fault");
                ActionResponse::unexpected()
            }
        }
    }
}

/// Returns the name of the hook that aborted, if any
fn lifecycle(
    action: &mut dyn Action,
    params: &Params,
    verb: &str,
) -> HandlerResult<Option<&'static str>> {
    if !action.before(params) {
        return Ok(Some("before"));
    }
    action.run(params, verb)?;
    if !action.after(params) {
        return Ok(Some("after"));
    }
    Ok(None)
}
