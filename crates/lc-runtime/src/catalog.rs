//! Demo catalog and the configuration that wires it.

use crate::commands::{Bar, Foo};
use crate::pipes::{After, Before};
use lc_gateway::domain::config::DEFAULT_PIPE_KEY;
use lc_gateway::{Catalog, GatewayConfig, HandlerBinding, Phase};

pub const COMMAND_MODULE: &str = "commands";
pub const FOO_ACTION: &str = "sub.foo";

/// Every handler and pipe this binary can serve
pub fn build_catalog() -> Catalog {
    let mut catalog = Catalog::new();
    catalog
        .register_command(COMMAND_MODULE, "Bar", Bar::create)
        .register_action(FOO_ACTION, Foo::create)
        .register_pipe(Before::NAME, Before::create)
        .register_pipe(After::NAME, After::create);
    catalog
}

/// Defaults plus the `bar` binding and the logging pipes on every handler
pub fn demo_config() -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config
        .handlers
        .insert("bar".into(), HandlerBinding::new(COMMAND_MODULE, "Bar"));
    config
        .pipes
        .set(DEFAULT_PIPE_KEY, Phase::Before, vec![Before::NAME.into()]);
    config
        .pipes
        .set(DEFAULT_PIPE_KEY, Phase::After, vec![After::NAME.into()]);
    config
}
