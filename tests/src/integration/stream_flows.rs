//! # Stream Flows
//!
//! The streaming adapter over the suspendable gate entry point: handler
//! pushes become `data:` frames and every call ends with exactly one
//! end-of-stream signal.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use bytes::Bytes;
    use lc_gateway::adapters::ChannelTransport;
    use lc_gateway::ports::{ResponseHead, StreamTransport};
    use lc_gateway::{CorrelationId, Gate, Phase, ResponseCode, StreamAdapter, StreamError};
    use serde_json::Value;

    use crate::fixtures::{params, Fixture, AUDIT, DENY};

    #[derive(Debug, PartialEq)]
    enum Event {
        Open(u16),
        Data(String),
        Eof,
    }

    #[derive(Default)]
    struct Recording {
        events: Vec<Event>,
    }

    #[async_trait]
    impl StreamTransport for Recording {
        async fn open(&mut self, head: ResponseHead) -> Result<(), StreamError> {
            self.events.push(Event::Open(head.status.as_u16()));
            Ok(())
        }

        async fn send(&mut self, chunk: Bytes) -> Result<(), StreamError> {
            self.events
                .push(Event::Data(String::from_utf8_lossy(&chunk).into_owned()));
            Ok(())
        }

        async fn eof(&mut self) -> Result<(), StreamError> {
            self.events.push(Event::Eof);
            Ok(())
        }
    }

    fn adapter(fixture: &Fixture) -> (StreamAdapter, Arc<Gate>) {
        let gate = Arc::new(fixture.gate());
        (
            StreamAdapter::new(Arc::clone(&gate), fixture.config.params.clone()),
            gate,
        )
    }

    fn frame(message: &str) -> Event {
        Event::Data(format!("data: {message}\n\n"))
    }

    #[tokio::test]
    async fn test_three_pushes_then_eof() {
        let fixture = Fixture::new().bind("probe");
        let (adapter, _) = adapter(&fixture);

        let mut input = params(&[("command_id", "probe")]);
        input.insert("frames".into(), Value::from(3));
        let stream = adapter
            .call(input, Recording::default(), CorrelationId::new())
            .await;

        assert_eq!(stream.frames_sent(), 3);
        assert_eq!(
            stream.into_transport().events,
            vec![
                Event::Open(200),
                frame("frame 1"),
                frame("frame 2"),
                frame("frame 3"),
                Event::Eof
            ]
        );
    }

    #[tokio::test]
    async fn test_unknown_id_sends_only_eof() {
        let fixture = Fixture::new();
        let (adapter, gate) = adapter(&fixture);

        let stream = adapter
            .call_from_parts(
                Some("command_id=ghost"),
                None,
                b"",
                Recording::default(),
                CorrelationId::new(),
            )
            .await;

        assert_eq!(
            stream.into_transport().events,
            vec![Event::Open(200), Event::Eof]
        );
        assert_eq!(gate.metrics().to_json()["calls"]["no_command"], 1);
    }

    #[tokio::test]
    async fn test_fault_after_frames_still_ends_stream() {
        let fixture = Fixture::new().bind("probe");
        let (adapter, gate) = adapter(&fixture);

        let mut input = params(&[("command_id", "probe"), ("mode", "fault")]);
        input.insert("frames".into(), Value::from(2));
        let stream = adapter
            .call(input, Recording::default(), CorrelationId::new())
            .await;

        let events = stream.into_transport().events;
        assert_eq!(events.len(), 4);
        assert_eq!(events.last(), Some(&Event::Eof));
        assert_eq!(gate.metrics().to_json()["calls"]["error"], 1);
    }

    #[tokio::test]
    async fn test_interrupted_stream_never_runs_handler() {
        let fixture = Fixture::new()
            .bind("probe")
            .pipes("probe", Phase::Before, &[DENY]);
        let (adapter, _) = adapter(&fixture);

        let mut input = params(&[("command_id", "probe")]);
        input.insert("frames".into(), Value::from(3));
        let stream = adapter
            .call(input, Recording::default(), CorrelationId::new())
            .await;

        assert_eq!(
            stream.into_transport().events,
            vec![Event::Open(200), Event::Eof]
        );
        assert_eq!(fixture.runs(), 0);
    }

    #[tokio::test]
    async fn test_after_chain_runs_on_stream_success() {
        let fixture = Fixture::new()
            .bind("probe")
            .pipes("probe", Phase::After, &[AUDIT]);
        let (adapter, _) = adapter(&fixture);

        adapter
            .call(
                params(&[("command_id", "probe")]),
                Recording::default(),
                CorrelationId::new(),
            )
            .await;
        assert_eq!(fixture.pipe_log(), vec!["Audit:after"]);
    }

    #[tokio::test]
    async fn test_malformed_stream_request() {
        let fixture = Fixture::new().bind("probe");
        let (adapter, _) = adapter(&fixture);

        let stream = adapter
            .call_from_parts(
                Some("command_id=probe"),
                Some("application/json"),
                b"{not json",
                Recording::default(),
                CorrelationId::new(),
            )
            .await;

        let events = stream.into_transport().events;
        assert_eq!(events.len(), 3);
        assert_eq!(events[0], Event::Open(400));
        let Event::Data(data) = &events[1] else {
            panic!("expected a data frame, got {:?}", events[1]);
        };
        let body: Value = serde_json::from_str(
            data.trim_start_matches("data: ").trim_end(),
        )
        .unwrap();
        assert_eq!(body["code"], ResponseCode::BadRequest.value());
        assert_eq!(body["success"], false);
        assert_eq!(events[2], Event::Eof);
        assert_eq!(fixture.constructed(), 0);
    }

    #[tokio::test]
    async fn test_direct_async_call_discards_pushes() {
        let fixture = Fixture::new().bind("probe");
        let gate = fixture.gate();

        let mut input = params(&[]);
        input.insert("frames".into(), Value::from(3));
        let resp = gate.async_call("probe", &input, "get", None).await;

        assert_eq!(resp.code(), ResponseCode::Success);
        assert_eq!(gate.metrics().to_json()["streams"]["frames_sent"], 0);
    }

    #[tokio::test]
    async fn test_demo_bar_over_channel_transport() {
        let gate = Arc::new(Gate::new(
            &lc_runtime::demo_config(),
            Arc::new(lc_runtime::build_catalog()),
        ));
        let adapter = StreamAdapter::new(gate, Default::default());
        let (transport, head_rx, mut body_rx) = ChannelTransport::new(8);

        let task = tokio::spawn(async move {
            adapter
                .call_from_parts(
                    Some("command_id=bar&x=5"),
                    None,
                    b"",
                    transport,
                    CorrelationId::new(),
                )
                .await
                .frames_sent()
        });

        let head = head_rx.await.unwrap();
        assert_eq!(head.status.as_u16(), 200);

        let mut frames = Vec::new();
        while let Some(chunk) = body_rx.recv().await {
            frames.push(String::from_utf8(chunk.to_vec()).unwrap());
        }
        assert_eq!(
            frames,
            vec![
                "data: bar 1/3\n\n",
                "data: bar 2/3\n\n",
                "data: bar 3/3\n\n"
            ]
        );
        assert_eq!(task.await.unwrap(), lc_runtime::commands::BAR_STREAM_MESSAGES);
    }
}
