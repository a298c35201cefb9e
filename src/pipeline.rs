//! Bridge orchestration
//!
//! This module provides the public entry point for running the bridge. It binds
//! the listener, then runs the listener and the metric engine on their own
//! threads over a shared [`BridgeContext`]:
//!
//! ```text
//! UDP ──▶ IngestionListener ──▶ DecoderChain ──▶ ChannelStore
//!                                                    │
//!                      MetricEngine (every 2 s) ◀────┘
//!                           │
//!                           ▼
//!                    MetricsSnapshot ──▶ status()
//! ```

use crate::config::BridgeConfig;
use crate::context::BridgeContext;
use crate::engine::MetricEngine;
use crate::error::{BridgeError, Result};
use crate::listener::IngestionListener;
use crate::query;
use crate::types::BridgeStatus;
use std::net::SocketAddr;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{info, warn};

/// A bound, not yet running bridge
pub struct Bridge {
    context: Arc<BridgeContext>,
    listener: IngestionListener,
}

impl Bridge {
    /// Validate the configuration and bind the UDP listener.
    ///
    /// # Example
    /// ```ignore
    /// let handle = Bridge::bind(BridgeConfig::default())?.spawn()?;
    /// println!("{}", handle.status().to_json()?);
    /// handle.shutdown();
    /// ```
    pub fn bind(config: BridgeConfig) -> Result<Self> {
        config.validate()?;
        let context = Arc::new(BridgeContext::new(config));
        let listener = IngestionListener::bind(context.clone())?;
        Ok(Self { context, listener })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn context(&self) -> &Arc<BridgeContext> {
        &self.context
    }

    /// Start the listener and metric engine threads
    pub fn spawn(self) -> Result<BridgeHandle> {
        let local_addr = self.listener.local_addr()?;
        let Bridge {
            context,
            mut listener,
        } = self;

        let engine = MetricEngine::new(context.clone());
        let engine_thread = thread::Builder::new()
            .name("biobridge-engine".to_string())
            .spawn(move || engine.run())
            .map_err(|_| BridgeError::ThreadSpawn("metric engine".to_string()))?;

        let listener_thread = match thread::Builder::new()
            .name("biobridge-listener".to_string())
            .spawn(move || listener.run())
        {
            Ok(handle) => handle,
            Err(_) => {
                context.request_shutdown();
                let _ = engine_thread.join();
                return Err(BridgeError::ThreadSpawn("listener".to_string()));
            }
        };

        info!(%local_addr, "Bridge running");

        Ok(BridgeHandle {
            context,
            local_addr,
            threads: vec![listener_thread, engine_thread],
        })
    }
}

/// Handle to a running bridge
pub struct BridgeHandle {
    context: Arc<BridgeContext>,
    local_addr: SocketAddr,
    threads: Vec<JoinHandle<()>>,
}

impl BridgeHandle {
    /// Address the listener is bound to
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn context(&self) -> &Arc<BridgeContext> {
        &self.context
    }

    /// Current status record
    pub fn status(&self) -> BridgeStatus {
        query::status(&self.context)
    }

    /// Signal both threads to stop and wait for them.
    ///
    /// The listener notices within one poll interval, the engine within a
    /// fraction of a second.
    pub fn shutdown(mut self) {
        self.stop_and_join();
    }

    fn stop_and_join(&mut self) {
        self.context.request_shutdown();
        for handle in self.threads.drain(..) {
            if handle.join().is_err() {
                warn!("Bridge thread panicked during shutdown");
            }
        }
    }
}

impl Drop for BridgeHandle {
    fn drop(&mut self) {
        self.stop_and_join();
    }
}
