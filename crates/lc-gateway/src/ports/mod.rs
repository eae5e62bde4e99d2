//! Ports between the gate and the transports that drive it.

pub mod outbound;

pub use outbound::{DetachedSink, HeadUpdate, ResponseHead, StreamSink, StreamTransport};
