//! Error types for the biosensor bridge

use std::net::SocketAddr;
use thiserror::Error;

/// Errors that can occur while configuring or running the bridge
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("Failed to bind UDP listener on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to spawn {0} thread")]
    ThreadSpawn(String),
}

/// Convenience alias used throughout the crate
pub type Result<T> = std::result::Result<T, BridgeError>;
