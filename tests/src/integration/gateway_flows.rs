//! # Gateway Flows
//!
//! Resolution, pipe chains and envelope mapping through the blocking entry
//! point, plus the demo catalog from `lc-runtime`.
//!
//! ## Flow Tested:
//!
//! ```text
//! resolve ──→ before chain ──→ handler ──→ after chain ──→ envelope
//!    │              │             │              │
//!    └─ NO_COMMAND  └─ interrupt  └─ FAIL/ERROR  └─ interrupt
//! ```

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::fixtures::{
        params, Fixture, APPROVE, AUDIT, BROKEN, DENY, GUARD, PROBE_CLASS,
        PROBE_MODULE, TRAIL,
    };
    use lc_gateway::domain::config::DEFAULT_PIPE_KEY;
    use lc_gateway::domain::response::PROTOCOL_NOT_SUPPORTED_MESSAGE;
    use lc_gateway::{
        CommandResponse, CorrelationId, Gate, HandlerBinding, HandlerIdentity, Phase, Protocol,
        ResponseCode, RestAdapter,
    };
    use serde_json::Value;

    // =========================================================================
    // RESOLUTION
    // =========================================================================

    #[test]
    fn test_unknown_id_is_no_command_without_construction() {
        let fixture = Fixture::new().bind("probe");
        let gate = fixture.gate();

        for id in ["ghost", "", "PROBE", "probe "] {
            let resp = gate.call(id, &params(&[]), "get");
            assert_eq!(resp.code(), ResponseCode::NoCommand);
            assert_eq!(resp.handler_id(), id);
            assert!(!resp.is_success());
        }
        assert_eq!(fixture.constructed(), 0);
    }

    #[test]
    fn test_unregistered_class_is_no_command() {
        let fixture = Fixture::new()
            .bind_to("typo", HandlerBinding::new(PROBE_MODULE, "Prob"))
            .bind_to("partial", HandlerBinding::new("", PROBE_CLASS));
        let gate = fixture.gate();

        assert_eq!(gate.call("typo", &params(&[]), "").code(), ResponseCode::NoCommand);
        assert_eq!(gate.call("partial", &params(&[]), "").code(), ResponseCode::NoCommand);
        assert_eq!(fixture.constructed(), 0);
    }

    #[test]
    fn test_protocol_allow_list() {
        let fixture = Fixture::new().bind_to(
            "rest_only",
            HandlerBinding::new(PROBE_MODULE, PROBE_CLASS).with_protocols([Protocol::Rest]),
        );
        let gate = Arc::new(fixture.gate());

        let direct = gate.call("rest_only", &params(&[]), "get");
        assert_eq!(direct.code(), ResponseCode::NoCommand);
        assert_eq!(direct.message(), PROTOCOL_NOT_SUPPORTED_MESSAGE);
        assert_eq!(fixture.constructed(), 0);

        let rest = RestAdapter::new(Arc::clone(&gate), fixture.config.params.clone());
        let mut input = params(&[("__method", "get")]);
        input.insert("__command_id".into(), Value::from("rest_only"));
        let resp = rest.call(input, CorrelationId::new());
        assert_eq!(resp.code(), ResponseCode::Success);
        assert_eq!(fixture.constructed(), 1);
    }

    // =========================================================================
    // HANDLER OUTCOMES
    // =========================================================================

    #[test]
    fn test_success_carries_result() {
        let fixture = Fixture::new().bind("probe");
        let resp = fixture.gate().call("probe", &params(&[]), "get");

        assert_eq!(resp.code(), ResponseCode::Success);
        assert_eq!(resp.result(), Some(&Value::from("probe:get")));
        assert_eq!(resp.message(), ResponseCode::Success.default_message());
        assert_eq!(resp.handler_id(), "probe");
        assert_eq!(resp.verb(), "get");
    }

    #[test]
    fn test_fail_skips_after_chain() {
        let fixture = Fixture::new()
            .bind("probe")
            .pipes("probe", Phase::After, &[AUDIT]);
        let resp = fixture.gate().call("probe", &params(&[("mode", "fail")]), "");

        assert_eq!(resp.code(), ResponseCode::Fail);
        assert_eq!(resp.message(), "Probe declined.");
        assert_eq!(fixture.runs(), 1);
        assert!(fixture.pipe_log().is_empty());
    }

    #[test]
    fn test_fault_and_panic_are_error() {
        let fixture = Fixture::new()
            .bind("probe")
            .pipes("probe", Phase::After, &[AUDIT]);
        let gate = fixture.gate();

        for mode in ["fault", "panic"] {
            let resp = gate.call("probe", &params(&[("mode", mode)]), "");
            assert_eq!(resp.code(), ResponseCode::Error, "mode {mode}");
            assert!(resp.result().is_none());
        }
        assert!(fixture.pipe_log().is_empty());
    }

    #[test]
    fn test_repeated_calls_are_identical() {
        let fixture = Fixture::new().bind("probe");
        let gate = fixture.gate();
        let input = params(&[("x", "1")]);

        let first = gate.call("probe", &input, "get");
        let second = gate.call("probe", &input, "get");
        assert_eq!(first, second);
        assert_eq!(fixture.constructed(), 2);

        let missing = gate.call("ghost", &input, "get");
        assert_eq!(missing, gate.call("ghost", &input, "get"));
    }

    #[test]
    fn test_concurrent_calls_get_fresh_instances() {
        let fixture = Fixture::new().bind("probe");
        let gate = Arc::new(fixture.gate());

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let gate = Arc::clone(&gate);
                std::thread::spawn(move || gate.call("probe", &params(&[]), &format!("v{i}")))
            })
            .collect();

        for (i, handle) in handles.into_iter().enumerate() {
            let resp = handle.join().unwrap();
            assert_eq!(resp.code(), ResponseCode::Success);
            assert_eq!(resp.result(), Some(&Value::from(format!("probe:v{i}"))));
        }
        assert_eq!(fixture.constructed(), 8);
    }

    // =========================================================================
    // PIPE CHAINS
    // =========================================================================

    #[test]
    fn test_interrupt_with_response_is_returned_verbatim() {
        let fixture = Fixture::new()
            .bind("probe")
            .pipes("probe", Phase::Before, &[AUDIT, GUARD, TRAIL]);
        let resp = fixture.gate().call("probe", &params(&[]), "get");

        let expected = HandlerIdentity::new("probe", "get", Protocol::Direct);
        assert_eq!(resp, CommandResponse::not_login(&expected));
        assert_eq!(fixture.runs(), 0);
        assert_eq!(fixture.pipe_log(), vec!["Audit:before"]);
    }

    #[test]
    fn test_interrupt_without_response_is_bad_request() {
        let fixture = Fixture::new()
            .bind("probe")
            .pipes("probe", Phase::Before, &[DENY]);
        let resp = fixture.gate().call("probe", &params(&[]), "");

        assert_eq!(resp.code(), ResponseCode::BadRequest);
        assert!(!resp.is_success());
        assert_eq!(fixture.runs(), 0);
    }

    #[test]
    fn test_pipe_fault_is_bad_request() {
        let fixture = Fixture::new()
            .bind("probe")
            .pipes("probe", Phase::Before, &[BROKEN, AUDIT]);
        let resp = fixture.gate().call("probe", &params(&[]), "");

        assert_eq!(resp.code(), ResponseCode::BadRequest);
        assert_eq!(fixture.runs(), 0);
        assert!(fixture.pipe_log().is_empty());
    }

    #[test]
    fn test_after_only_pipe_runs_after() {
        let fixture = Fixture::new()
            .bind("probe")
            .pipes("probe", Phase::After, &[AUDIT]);
        let resp = fixture.gate().call("probe", &params(&[]), "");

        assert_eq!(resp.code(), ResponseCode::Success);
        assert_eq!(fixture.pipe_log(), vec!["Audit:after"]);
    }

    #[test]
    fn test_chains_run_in_configured_order() {
        let fixture = Fixture::new()
            .bind("probe")
            .pipes("probe", Phase::Before, &[TRAIL, APPROVE, AUDIT])
            .pipes("probe", Phase::After, &[AUDIT, TRAIL]);
        let resp = fixture.gate().call("probe", &params(&[]), "");

        assert_eq!(resp.code(), ResponseCode::Success);
        assert_eq!(
            fixture.pipe_log(),
            vec![
                "Trail:before",
                "Approve:before",
                "Audit:before",
                "Audit:after",
                "Trail:after"
            ]
        );
    }

    #[test]
    fn test_default_chain_fallback_is_per_phase() {
        let fixture = Fixture::new()
            .bind("probe")
            .bind("other")
            .pipes(DEFAULT_PIPE_KEY, Phase::Before, &[AUDIT])
            .pipes(DEFAULT_PIPE_KEY, Phase::After, &[AUDIT])
            .pipes("probe", Phase::After, &[TRAIL]);
        let gate = fixture.gate();

        gate.call("probe", &params(&[]), "");
        assert_eq!(fixture.pipe_log(), vec!["Audit:before", "Trail:after"]);

        gate.call("other", &params(&[]), "");
        assert_eq!(&fixture.pipe_log()[2..], &["Audit:before", "Audit:after"]);
    }

    #[test]
    fn test_unknown_pipe_is_skipped() {
        let fixture = Fixture::new()
            .bind("probe")
            .pipes("probe", Phase::Before, &["Missing", AUDIT]);
        let gate = fixture.gate();
        let resp = gate.call("probe", &params(&[]), "");

        assert_eq!(resp.code(), ResponseCode::Success);
        assert_eq!(fixture.pipe_log(), vec!["Audit:before"]);
        assert_eq!(gate.metrics().to_json()["pipes"]["skipped"], 1);
    }

    #[test]
    fn test_after_chain_interrupt_replaces_success() {
        let fixture = Fixture::new()
            .bind("probe")
            .pipes("probe", Phase::After, &[GUARD]);
        let resp = fixture.gate().call("probe", &params(&[]), "");

        assert_eq!(resp.code(), ResponseCode::NotLogin);
        assert_eq!(fixture.runs(), 1);
    }

    // =========================================================================
    // DEMO CATALOG
    // =========================================================================

    fn demo_gate(with_pipes: bool) -> Arc<Gate> {
        let config = if with_pipes {
            lc_runtime::demo_config()
        } else {
            let mut config = lc_gateway::GatewayConfig::default();
            config
                .handlers
                .insert("bar".into(), HandlerBinding::new("commands", "Bar"));
            config
        };
        Arc::new(Gate::new(&config, Arc::new(lc_runtime::build_catalog())))
    }

    #[test]
    fn test_bar_echo_over_rest() {
        for with_pipes in [false, true] {
            let rest = RestAdapter::new(demo_gate(with_pipes), Default::default());
            let body = rest.call_from_parts(
                Some("__command_id=bar&x=5"),
                None,
                b"",
                CorrelationId::new(),
            );
            assert_eq!(body["code"], ResponseCode::Success.value());
            assert_eq!(body["result"], "ok:5");
            assert_eq!(body["success"], true);
        }
    }

    #[test]
    fn test_bar_behind_denying_pipe_never_runs() {
        let fixture = Fixture::new()
            .bind("bar")
            .pipes("bar", Phase::Before, &[DENY]);
        let rest = RestAdapter::new(Arc::new(fixture.gate()), fixture.config.params.clone());
        let body = rest.call_from_parts(
            Some("__command_id=bar&x=5"),
            None,
            b"",
            CorrelationId::new(),
        );

        assert_eq!(body["code"], ResponseCode::BadRequest.value());
        assert_eq!(body["success"], false);
        assert_eq!(fixture.runs(), 0);
    }
}
