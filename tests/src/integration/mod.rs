//! Integration flows.

pub mod gateway_flows;
pub mod stream_flows;
