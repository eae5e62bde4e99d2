//! Counting test doubles.
//!
//! Every double shares its counters through `Arc`s held by [`Fixture`], so a
//! test can assert that a handler was never constructed or never run.

use async_trait::async_trait;
use lc_gateway::{
    Catalog, Command, CommandResponse, CommandState, Gate, GatewayConfig, HandlerBinding,
    HandlerError, HandlerResult, Params, Phase, Pipe, PipeError, PipeResult,
    PipeState, StreamSink, Verdict,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const PROBE_MODULE: &str = "probes";
pub const PROBE_CLASS: &str = "Probe";

/// Pipe that logs its name and continues
pub const AUDIT: &str = "Audit";
/// Second logging pipe, for ordering checks
pub const TRAIL: &str = "Trail";
/// Interrupts without a response
pub const DENY: &str = "Deny";
/// Interrupts with a `NOT_LOGIN` response
pub const GUARD: &str = "Guard";
/// Returns a pipe fault
pub const BROKEN: &str = "Broken";
/// Logs its name and returns `PASS`
pub const APPROVE: &str = "Approve";

/// Names of pipes in the order they ran, tagged with the phase they saw
pub type PipeLog = Arc<Mutex<Vec<String>>>;

/// Handler driven by the `mode` parameter.
///
/// `ok` sets `"probe:" + verb` and succeeds, `fail` returns false, `fault`
/// returns an error, `panic` panics. `async_run` first pushes `frames`
/// messages.
pub struct Probe {
    state: CommandState,
    runs: Arc<AtomicUsize>,
}

impl Probe {
    fn outcome(&mut self, params: &Params, verb: &str) -> HandlerResult<bool> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        match params.get("mode").and_then(|v| v.as_str()).unwrap_or("ok") {
            "ok" => {
                self.state.set_result(format!("probe:{verb}"));
                Ok(true)
            }
            "fail" => {
                self.state.set_result("partial");
                self.state.set_message("Probe declined.");
                Ok(false)
            }
            "fault" => Err(HandlerError::fault("probe fault")),
            "panic" => panic!("probe panic"),
            other => Err(HandlerError::fault(format!("unknown mode {other}"))),
        }
    }
}

#[async_trait]
impl Command for Probe {
    fn state(&self) -> &CommandState {
        &self.state
    }

    fn run(&mut self, params: &Params, verb: &str) -> HandlerResult<bool> {
        self.outcome(params, verb)
    }

    async fn async_run(
        &mut self,
        params: &Params,
        verb: &str,
        stream: &mut dyn StreamSink,
    ) -> HandlerResult<bool> {
        let frames = params.get("frames").and_then(|v| v.as_u64()).unwrap_or(0);
        for i in 1..=frames {
            stream
                .push(&format!("frame {i}"))
                .await
                .map_err(|e| HandlerError::fault(e.to_string()))?;
        }
        self.outcome(params, verb)
    }
}

struct Logging {
    name: &'static str,
    log: PipeLog,
    verdict: Verdict,
    state: PipeState,
}

impl Pipe for Logging {
    fn run(&mut self, _cmd: &dyn Command, response: Option<&CommandResponse>) -> PipeResult<Verdict> {
        let phase = if response.is_some() { Phase::After } else { Phase::Before };
        if let Ok(mut log) = self.log.lock() {
            log.push(format!("{}:{phase}", self.name));
        }
        Ok(self.verdict)
    }

    fn state(&self) -> &PipeState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut PipeState {
        &mut self.state
    }
}

struct Interrupting {
    with_response: bool,
    state: PipeState,
}

impl Pipe for Interrupting {
    fn run(&mut self, cmd: &dyn Command, _response: Option<&CommandResponse>) -> PipeResult<Verdict> {
        if self.with_response {
            self.state.set_response(CommandResponse::not_login(cmd.identity()));
        }
        Ok(Verdict::Interrupt)
    }

    fn state(&self) -> &PipeState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut PipeState {
        &mut self.state
    }
}

struct Broken {
    state: PipeState,
}

impl Pipe for Broken {
    fn run(&mut self, _cmd: &dyn Command, _response: Option<&CommandResponse>) -> PipeResult<Verdict> {
        Err(PipeError::fault("broken pipe"))
    }

    fn state(&self) -> &PipeState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut PipeState {
        &mut self.state
    }
}

/// Catalog, configuration and counters for one test
pub struct Fixture {
    pub catalog: Catalog,
    pub config: GatewayConfig,
    /// Probe instances built
    pub constructed: Arc<AtomicUsize>,
    /// Probe `run`/`async_run` invocations
    pub runs: Arc<AtomicUsize>,
    pub pipe_log: PipeLog,
}

impl Default for Fixture {
    fn default() -> Self {
        Self::new()
    }
}

impl Fixture {
    pub fn new() -> Self {
        let constructed = Arc::new(AtomicUsize::new(0));
        let runs = Arc::new(AtomicUsize::new(0));
        let pipe_log: PipeLog = Arc::new(Mutex::new(Vec::new()));

        let mut catalog = Catalog::new();
        {
            let constructed = Arc::clone(&constructed);
            let runs = Arc::clone(&runs);
            catalog.register_command(PROBE_MODULE, PROBE_CLASS, move |identity| {
                constructed.fetch_add(1, Ordering::SeqCst);
                Ok(Box::new(Probe {
                    state: CommandState::new(identity),
                    runs: Arc::clone(&runs),
                }))
            });
        }
        for (name, verdict) in [
            (AUDIT, Verdict::Continue),
            (TRAIL, Verdict::Continue),
            (APPROVE, Verdict::Pass),
        ] {
            let log = Arc::clone(&pipe_log);
            catalog.register_pipe(name, move || {
                Ok(Box::new(Logging {
                    name,
                    log: Arc::clone(&log),
                    verdict,
                    state: PipeState::new(),
                }))
            });
        }
        catalog
            .register_pipe(DENY, || {
                Ok(Box::new(Interrupting {
                    with_response: false,
                    state: PipeState::new(),
                }))
            })
            .register_pipe(GUARD, || {
                Ok(Box::new(Interrupting {
                    with_response: true,
                    state: PipeState::new(),
                }))
            })
            .register_pipe(BROKEN, || {
                Ok(Box::new(Broken {
                    state: PipeState::new(),
                }))
            });

        Self {
            catalog,
            config: GatewayConfig::default(),
            constructed,
            runs,
            pipe_log,
        }
    }

    /// Bind `handler_id` to the probe
    pub fn bind(mut self, handler_id: &str) -> Self {
        self.config
            .handlers
            .insert(handler_id.into(), HandlerBinding::new(PROBE_MODULE, PROBE_CLASS));
        self
    }

    pub fn bind_to(mut self, handler_id: &str, binding: HandlerBinding) -> Self {
        self.config.handlers.insert(handler_id.into(), binding);
        self
    }

    pub fn pipes(mut self, handler_id: &str, phase: Phase, names: &[&str]) -> Self {
        self.config.pipes.set(
            handler_id,
            phase,
            names.iter().map(|n| n.to_string()).collect(),
        );
        self
    }

    pub fn gate(&self) -> Gate {
        Gate::new(&self.config, Arc::new(self.catalog.clone()))
    }

    pub fn constructed(&self) -> usize {
        self.constructed.load(Ordering::SeqCst)
    }

    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }

    pub fn pipe_log(&self) -> Vec<String> {
        self.pipe_log.lock().map(|log| log.clone()).unwrap_or_default()
    }
}

/// Parameter map from string pairs
pub fn params(pairs: &[(&str, &str)]) -> Params {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), serde_json::Value::from(*v)))
        .collect()
}
