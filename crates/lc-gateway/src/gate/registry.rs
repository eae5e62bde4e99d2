//! Handler and pipe resolution.
//!
//! The [`Catalog`] maps implementation paths to factories, registered in code
//! at startup. The [`HandlerRegistry`] maps configured handler ids onto
//! catalog paths. Every lookup failure is a typed [`ResolveError`].

use crate::domain::action::Action;
use crate::domain::config::HandlerBinding;
use crate::domain::error::{HandlerResult, PipeResult, ResolveError};
use crate::domain::handler::{Command, HandlerIdentity, Protocol};
use crate::domain::pipe::Pipe;
use crate::gate::panic_message;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::debug;

/// Builds a command for one call
pub type CommandFactory =
    Arc<dyn Fn(HandlerIdentity) -> HandlerResult<Box<dyn Command>> + Send + Sync>;

/// Builds an action for one call
pub type ActionFactory =
    Arc<dyn Fn(HandlerIdentity) -> HandlerResult<Box<dyn Action>> + Send + Sync>;

/// Builds a pipe for one chain run
pub type PipeFactory = Arc<dyn Fn() -> PipeResult<Box<dyn Pipe>> + Send + Sync>;

/// Implementations known to the process.
///
/// Commands are keyed by exact `module.class` path, actions by lower-cased
/// dotted name.
#[derive(Clone, Default)]
pub struct Catalog {
    commands: HashMap<String, CommandFactory>,
    actions: HashMap<String, ActionFactory>,
    pipes: HashMap<String, PipeFactory>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a command under `module.class`
    pub fn register_command<F>(&mut self, module: &str, class: &str, factory: F) -> &mut Self
    where
        F: Fn(HandlerIdentity) -> HandlerResult<Box<dyn Command>> + Send + Sync + 'static,
    {
        let path = format!("{module}.{class}");
        debug!(path = %path, "registered command");
        self.commands.insert(path, Arc::new(factory));
        self
    }

    /// Register an action under its dotted name (matched case-insensitively)
    pub fn register_action<F>(&mut self, name: &str, factory: F) -> &mut Self
    where
        F: Fn(HandlerIdentity) -> HandlerResult<Box<dyn Action>> + Send + Sync + 'static,
    {
        let name = name.to_lowercase();
        debug!(action = %name, "registered action");
        self.actions.insert(name, Arc::new(factory));
        self
    }

    /// Register a pipe under the name used in pipe chains
    pub fn register_pipe<F>(&mut self, name: &str, factory: F) -> &mut Self
    where
        F: Fn() -> PipeResult<Box<dyn Pipe>> + Send + Sync + 'static,
    {
        debug!(pipe = %name, "registered pipe");
        self.pipes.insert(name.to_string(), Arc::new(factory));
        self
    }

    pub fn contains_pipe(&self, name: &str) -> bool {
        self.pipes.contains_key(name)
    }

    /// Construct the command registered at `path`
    pub fn instantiate_command(
        &self,
        path: &str,
        identity: HandlerIdentity,
    ) -> Result<Box<dyn Command>, ResolveError> {
        let Some(factory) = self.commands.get(path) else {
            if self.actions.contains_key(&path.to_lowercase()) {
                return Err(ResolveError::WrongKind {
                    path: path.to_string(),
                    expected: "command",
                });
            }
            return Err(ResolveError::UnknownClass {
                path: path.to_string(),
            });
        };
        build(path, || factory(identity))
    }

    /// Construct the action registered under `name`, case-insensitively
    pub fn instantiate_action(
        &self,
        name: &str,
        identity: HandlerIdentity,
    ) -> Result<Box<dyn Action>, ResolveError> {
        let path = name.to_lowercase();
        let Some(factory) = self.actions.get(&path) else {
            if self.commands.contains_key(name) {
                return Err(ResolveError::WrongKind {
                    path: name.to_string(),
                    expected: "action",
                });
            }
            return Err(ResolveError::UnknownClass { path });
        };
        build(&path, || factory(identity))
    }

    /// Construct a fresh pipe instance
    pub fn instantiate_pipe(&self, name: &str) -> Result<Box<dyn Pipe>, ResolveError> {
        let factory = self
            .pipes
            .get(name)
            .ok_or_else(|| ResolveError::UnknownPipe(name.to_string()))?;
        build(name, || factory())
    }
}

/// Run a factory inside a panic boundary
fn build<T, E, F>(path: &str, factory: F) -> Result<T, ResolveError>
where
    E: std::fmt::Display,
    F: FnOnce() -> Result<T, E>,
{
    match catch_unwind(AssertUnwindSafe(factory)) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(ResolveError::Instantiation {
            path: path.to_string(),
            reason: e.to_string(),
        }),
        Err(payload) => Err(ResolveError::Instantiation {
            path: path.to_string(),
            reason: panic_message(payload.as_ref()),
        }),
    }
}

/// Configured handler ids over a shared catalog.
///
/// Read-only after construction; shared across concurrent calls.
#[derive(Clone)]
pub struct HandlerRegistry {
    bindings: HashMap<String, HandlerBinding>,
    catalog: Arc<Catalog>,
}

impl HandlerRegistry {
    pub fn new(bindings: HashMap<String, HandlerBinding>, catalog: Arc<Catalog>) -> Self {
        Self { bindings, catalog }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn binding(&self, handler_id: &str) -> Option<&HandlerBinding> {
        self.bindings.get(handler_id)
    }

    /// Resolve and construct the handler for one call.
    ///
    /// The protocol allow-list is checked before anything is constructed.
    pub fn resolve_command(
        &self,
        handler_id: &str,
        verb: &str,
        protocol: Protocol,
    ) -> Result<Box<dyn Command>, ResolveError> {
        let binding = self
            .bindings
            .get(handler_id)
            .ok_or_else(|| ResolveError::UnknownHandler(handler_id.to_string()))?;

        if !binding.is_complete() {
            return Err(ResolveError::IncompleteBinding {
                handler_id: handler_id.to_string(),
            });
        }

        if !binding.accepts(protocol) {
            return Err(ResolveError::ProtocolNotSupported {
                handler_id: handler_id.to_string(),
                protocol,
            });
        }

        let identity = HandlerIdentity::new(handler_id, verb, protocol);
        self.catalog.instantiate_command(&binding.path(), identity)
    }
}
