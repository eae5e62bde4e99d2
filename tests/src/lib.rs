//! # Lightcone Test Suite
//!
//! Cross-crate flows driven through the public API of `lc-gateway` and the
//! demo catalog of `lc-runtime`.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── fixtures.rs       # Counting handlers and pipes
//! └── integration/      # Gateway, stream and HTTP flows
//!     ├── gateway_flows.rs
//!     ├── stream_flows.rs
//!     └── http_flows.rs
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p lc-tests
//!
//! # By category
//! cargo test -p lc-tests integration::gateway_flows
//! cargo test -p lc-tests integration::stream_flows
//! cargo test -p lc-tests integration::http_flows
//! ```

#![allow(dead_code)]

pub mod fixtures;
pub mod integration;
