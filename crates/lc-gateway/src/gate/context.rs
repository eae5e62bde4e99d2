//! Per-call context threaded through both gate entry points.

use crate::domain::correlation::CorrelationId;
use crate::domain::handler::Protocol;
use std::time::Duration;
use tokio::time::Instant;

/// Protocol, correlation id and optional deadline of one call
#[derive(Debug, Clone, Copy)]
pub struct CallContext {
    protocol: Protocol,
    correlation_id: CorrelationId,
    deadline: Option<Instant>,
}

impl CallContext {
    /// Context without a deadline
    pub fn new(protocol: Protocol) -> Self {
        Self {
            protocol,
            correlation_id: CorrelationId::new(),
            deadline: None,
        }
    }

    /// Deadline `timeout` from now; a timeout past the clock's range means none
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Instant::now().checked_add(timeout);
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_correlation_id(mut self, id: CorrelationId) -> Self {
        self.correlation_id = id;
        self
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    pub fn correlation_id(&self) -> CorrelationId {
        self.correlation_id
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_expired(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }
}
