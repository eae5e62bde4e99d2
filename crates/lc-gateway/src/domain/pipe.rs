//! Middleware stages run around handler execution.

use crate::domain::error::PipeResult;
use crate::domain::handler::Command;
use crate::domain::response::CommandResponse;
use serde::{Deserialize, Serialize};
use std::cell::OnceCell;
use std::fmt;
use tracing::warn;

/// Outcome of a single pipe run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verdict {
    /// Halt the chain; the pipe's response (or `BAD_REQUEST`) becomes final
    Interrupt,
    /// Proceed; the stage declined or failed silently
    Continue,
    /// Proceed; the stage approved
    Pass,
}

/// Which side of the handler a chain runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Before,
    After,
}

impl Phase {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Before => "before",
            Self::After => "after",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Side-effect slots of one pipe instance.
///
/// Both slots are write-once; a second write is dropped with a warning.
#[derive(Debug, Default)]
pub struct PipeState {
    message: OnceCell<String>,
    response: OnceCell<CommandResponse>,
}

impl PipeState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn message(&self) -> Option<&str> {
        self.message.get().map(String::as_str)
    }

    pub fn set_message(&self, message: impl Into<String>) {
        if self.message.set(message.into()).is_err() {
            warn!("pipe message already set, ignoring second write");
        }
    }

    pub fn response(&self) -> Option<&CommandResponse> {
        self.response.get()
    }

    /// Supply the envelope returned when this pipe interrupts
    pub fn set_response(&self, response: CommandResponse) {
        if self.response.set(response).is_err() {
            warn!("pipe response already set, ignoring second write");
        }
    }

    /// Move the response out once the pipe is done
    pub fn take_response(&mut self) -> Option<CommandResponse> {
        self.response.take()
    }
}

/// A named middleware stage.
///
/// A fresh instance is built for every name on every chain run. `response`
/// is the tentative `SUCCESS` envelope during the after-chain and `None`
/// during the before-chain.
pub trait Pipe: Send {
    fn run(&mut self, cmd: &dyn Command, response: Option<&CommandResponse>)
        -> PipeResult<Verdict>;

    fn state(&self) -> &PipeState;

    fn state_mut(&mut self) -> &mut PipeState;
}
