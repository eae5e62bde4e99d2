//! RPC passthrough adapter.

use crate::domain::correlation::CorrelationId;
use crate::domain::handler::{Params, Protocol};
use crate::domain::response::CommandResponse;
use crate::gate::Gate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// RPC request body
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RpcRequest {
    pub command_id: String,
    pub method: String,
    pub params: Params,
}

/// Passes calls straight to the blocking gate entry point, tagged `rpc`
#[derive(Clone)]
pub struct RpcAdapter {
    gate: Arc<Gate>,
}

impl RpcAdapter {
    pub fn new(gate: Arc<Gate>) -> Self {
        Self { gate }
    }

    pub fn call(&self, request: &RpcRequest, correlation_id: CorrelationId) -> CommandResponse {
        let ctx = self
            .gate
            .context(Protocol::Rpc)
            .with_correlation_id(correlation_id);
        self.gate
            .call_in(&ctx, &request.command_id, &request.params, &request.method)
    }
}
