//! Request/response adapter.
//!
//! Reads the handler id and verb from two reserved parameter keys, calls the
//! blocking gate entry point and renders the envelope as a flat JSON object
//! with a `success` flag.

use crate::adapters::params::{params_from_parts, take_reserved};
use crate::domain::config::ParamKeys;
use crate::domain::correlation::CorrelationId;
use crate::domain::handler::{Params, Protocol};
use crate::domain::response::{CommandResponse, ResponseCode};
use crate::gate::Gate;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::warn;

pub const SERIALIZATION_FAILED_MESSAGE: &str = "Serialization failed.";

/// REST-style adapter over the blocking gate entry point
#[derive(Clone)]
pub struct RestAdapter {
    gate: Arc<Gate>,
    keys: ParamKeys,
}

impl RestAdapter {
    pub fn new(gate: Arc<Gate>, keys: ParamKeys) -> Self {
        Self { gate, keys }
    }

    /// Dispatch an already-extracted parameter map
    pub fn call(&self, params: Params, correlation_id: CorrelationId) -> CommandResponse {
        let mut params = params;
        let handler_id = take_reserved(&mut params, &self.keys.command_id);
        let verb = take_reserved(&mut params, &self.keys.method);

        let ctx = self
            .gate
            .context(Protocol::Rest)
            .with_correlation_id(correlation_id);
        self.gate.call_in(&ctx, &handler_id, &params, &verb)
    }

    /// Extract, dispatch and render. Malformed input never reaches the gate.
    pub fn call_from_parts(
        &self,
        query: Option<&str>,
        content_type: Option<&str>,
        body: &[u8],
        correlation_id: CorrelationId,
    ) -> Value {
        match params_from_parts(query, content_type, body) {
            Ok(params) => render(&self.call(params, correlation_id)),
            Err(e) => {
                warn!(error = %e, %correlation_id, "rejecting malformed request");
                render(&CommandResponse::malformed_request())
            }
        }
    }
}

/// Flat mapping of the envelope plus `success`
pub fn render(response: &CommandResponse) -> Value {
    match serde_json::to_value(response) {
        Ok(Value::Object(mut map)) => {
            map.insert("success".into(), Value::Bool(response.is_success()));
            Value::Object(map)
        }
        Ok(_) => serialization_failed(response),
        Err(e) => {
            warn!(error = %e, "envelope serialization failed");
            serialization_failed(response)
        }
    }
}

fn serialization_failed(response: &CommandResponse) -> Value {
    json!({
        "code": ResponseCode::Error.value(),
        "message": SERIALIZATION_FAILED_MESSAGE,
        "result": null,
        "command_id": response.handler_id(),
        "method": response.verb(),
        "success": false,
    })
}
