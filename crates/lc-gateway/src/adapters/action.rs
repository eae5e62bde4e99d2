//! Action adapter: reads the action name from its reserved key and renders
//! the `{code, success, message, result}` shape.

use crate::adapters::params::{params_from_parts, take_reserved};
use crate::domain::action::{ActionCode, ActionResponse};
use crate::domain::config::ParamKeys;
use crate::domain::correlation::CorrelationId;
use crate::domain::handler::{Params, Protocol};
use crate::domain::response::MALFORMED_REQUEST_MESSAGE;
use crate::gate::ActionDispatcher;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Clone)]
pub struct ActionAdapter {
    dispatcher: Arc<ActionDispatcher>,
    keys: ParamKeys,
}

impl ActionAdapter {
    pub fn new(dispatcher: Arc<ActionDispatcher>, keys: ParamKeys) -> Self {
        Self { dispatcher, keys }
    }

    pub fn call(&self, params: Params, correlation_id: CorrelationId) -> ActionResponse {
        let mut params = params;
        let name = take_reserved(&mut params, &self.keys.action);
        let verb = take_reserved(&mut params, &self.keys.method);
        debug!(action = %name, %correlation_id, "dispatching action");
        self.dispatcher.dispatch(&name, &params, &verb, Protocol::Rest)
    }

    pub fn call_from_parts(
        &self,
        query: Option<&str>,
        content_type: Option<&str>,
        body: &[u8],
        correlation_id: CorrelationId,
    ) -> Value {
        let response = match params_from_parts(query, content_type, body) {
            Ok(params) => self.call(params, correlation_id),
            Err(e) => {
                warn!(error = %e, %correlation_id, "rejecting malformed action request");
                ActionResponse::new(
                    ActionCode::UnexpectedError,
                    Some(MALFORMED_REQUEST_MESSAGE.to_string()),
                )
            }
        };
        render(&response)
    }
}

pub fn render(response: &ActionResponse) -> Value {
    serde_json::to_value(response).unwrap_or_else(|e| {
        warn!(error = %e, "action response serialization failed");
        json!({
            "code": ActionCode::UnexpectedError.value(),
            "success": false,
            "message": "Serialization failed.",
            "result": null,
        })
    })
}
