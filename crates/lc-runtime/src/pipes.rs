//! Logging pipes for the demo catalog.

use lc_gateway::{Command, CommandResponse, Pipe, PipeResult, PipeState, Verdict};
use tracing::info;

pub struct Before {
    state: PipeState,
}

impl Before {
    pub const NAME: &'static str = "Before";

    pub fn create() -> PipeResult<Box<dyn Pipe>> {
        Ok(Box::new(Self {
            state: PipeState::new(),
        }))
    }
}

impl Pipe for Before {
    fn run(&mut self, cmd: &dyn Command, _response: Option<&CommandResponse>) -> PipeResult<Verdict> {
        info!(
            handler_id = cmd.identity().handler_id(),
            verb = cmd.identity().verb(),
            protocol = %cmd.identity().protocol(),
            "before pipe"
        );
        Ok(Verdict::Continue)
    }

    fn state(&self) -> &PipeState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut PipeState {
        &mut self.state
    }
}

pub struct After {
    state: PipeState,
}

impl After {
    pub const NAME: &'static str = "After";

    pub fn create() -> PipeResult<Box<dyn Pipe>> {
        Ok(Box::new(Self {
            state: PipeState::new(),
        }))
    }
}

impl Pipe for After {
    fn run(&mut self, cmd: &dyn Command, response: Option<&CommandResponse>) -> PipeResult<Verdict> {
        info!(
            handler_id = cmd.identity().handler_id(),
            code = response.map(|r| r.code().value()),
            "after pipe"
        );
        Ok(Verdict::Continue)
    }

    fn state(&self) -> &PipeState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut PipeState {
        &mut self.state
    }
}
