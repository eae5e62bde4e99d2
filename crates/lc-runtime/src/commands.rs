//! Demo handlers.

use async_trait::async_trait;
use lc_gateway::{
    Action, ActionCode, ActionState, Command, CommandState, HandlerIdentity, HandlerResult,
    Params, StreamSink,
};
use serde_json::Value;
use tracing::{debug, warn};

/// Messages pushed by [`Bar::async_run`]
pub const BAR_STREAM_MESSAGES: usize = 3;

/// Echo command: `result = "ok:" + x`
pub struct Bar {
    state: CommandState,
}

impl Bar {
    pub fn create(identity: HandlerIdentity) -> HandlerResult<Box<dyn Command>> {
        Ok(Box::new(Self {
            state: CommandState::new(identity),
        }))
    }

    fn echo(&mut self, params: &Params) {
        let x = match params.get("x") {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => String::new(),
        };
        self.state.set_result(format!("ok:{x}"));
    }
}

#[async_trait]
impl Command for Bar {
    fn state(&self) -> &CommandState {
        &self.state
    }

    fn run(&mut self, params: &Params, verb: &str) -> HandlerResult<bool> {
        debug!(verb, "bar run");
        self.echo(params);
        Ok(true)
    }

    async fn async_run(
        &mut self,
        params: &Params,
        verb: &str,
        stream: &mut dyn StreamSink,
    ) -> HandlerResult<bool> {
        debug!(verb, attached = stream.is_attached(), "bar async run");
        self.echo(params);

        for step in 1..=BAR_STREAM_MESSAGES {
            let message = format!("bar {step}/{BAR_STREAM_MESSAGES}");
            if let Err(e) = stream.push(&message).await {
                warn!(error = %e, "bar stream closed early");
                return Ok(false);
            }
        }
        Ok(true)
    }
}

/// Demo action registered as `sub.foo`
pub struct Foo {
    state: ActionState,
}

impl Foo {
    pub const RESULT: &'static str = "Foo action result";
    pub const MESSAGE: &'static str = "Foo action message";

    pub fn create(identity: HandlerIdentity) -> HandlerResult<Box<dyn Action>> {
        Ok(Box::new(Self {
            state: ActionState::new(identity),
        }))
    }
}

impl Action for Foo {
    fn state(&self) -> &ActionState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ActionState {
        &mut self.state
    }

    fn run(&mut self, _params: &Params, _verb: &str) -> HandlerResult<()> {
        self.state.set_code(ActionCode::Success);
        self.state.set_result(Self::RESULT);
        self.state.set_message(Self::MESSAGE);
        Ok(())
    }
}
