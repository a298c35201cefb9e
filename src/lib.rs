//! Biobridge - UDP bridge from wearable biosensors to rolling physiological metrics
//!
//! Biobridge listens for biosensor datagrams whose text encoding is not fixed,
//! recovers channel readings through a chain of decoding strategies, and derives
//! rolling metrics on a fixed cadence: listener → decoder chain → channel
//! buffers → metric engine → status snapshot.
//!
//! ## Modules
//!
//! - **Ingestion**: [`listener`], [`decoder`], [`connection`]
//! - **Storage**: [`buffer`]
//! - **Metrics**: [`features`], [`engine`]
//! - **Read side**: [`query`]
//! - **Orchestration**: [`pipeline`], [`context`], [`config`]

pub mod buffer;
pub mod config;
pub mod connection;
pub mod context;
pub mod decoder;
pub mod engine;
pub mod error;
pub mod features;
pub mod listener;
pub mod pipeline;
pub mod query;
pub mod types;

pub use config::BridgeConfig;
pub use context::BridgeContext;
pub use decoder::{DecodeStrategy, Decoded, DecoderChain, PayloadDecoder};
pub use error::BridgeError;
pub use pipeline::{Bridge, BridgeHandle};
pub use types::{BridgeStatus, Channel, ConnectionStatus, MetricsSnapshot, ParseStats, Sample};

/// Bridge version embedded in every status record
pub const BRIDGE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for status records
pub const PRODUCER_NAME: &str = "biobridge";
