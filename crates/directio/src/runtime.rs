//! Owned runtime for callers that do not run tokio themselves.

use std::future::Future;
use std::io;
use std::sync::Arc;

use directio_config::RuntimeConfig;
use directio_sys::Platform;
use tokio::runtime::{Builder, Handle, Runtime};
use tracing::info;

use crate::Bridge;

/// A multi-thread tokio runtime paired with a [`Bridge`] bound to it.
///
/// Dropping it shuts the runtime down: tasks that have not started are
/// dropped and their callbacks receive `Cancelled`, while running calls are
/// waited for and deliver their own result. Must not be dropped from
/// inside an async context.
#[derive(Debug)]
pub struct BridgeRuntime {
    runtime: Runtime,
    bridge: Bridge,
}

impl BridgeRuntime {
    /// Builds a runtime for the native platform.
    pub fn from_config(config: &RuntimeConfig) -> io::Result<Self> {
        let runtime = build(config)?;
        let bridge = Bridge::new(runtime.handle().clone());
        info!(
            platform = bridge.platform().name(),
            max_blocking_threads = config.max_blocking_threads,
            "bridge runtime started"
        );
        Ok(Self { runtime, bridge })
    }

    /// Builds a runtime that dispatches to `platform`.
    pub fn with_platform(config: &RuntimeConfig, platform: Arc<dyn Platform>) -> io::Result<Self> {
        let runtime = build(config)?;
        let bridge = Bridge::with_platform(runtime.handle().clone(), platform);
        Ok(Self { runtime, bridge })
    }

    pub fn bridge(&self) -> &Bridge {
        &self.bridge
    }

    pub fn handle(&self) -> &Handle {
        self.runtime.handle()
    }

    /// Runs a future to completion on this runtime.
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }
}

fn build(config: &RuntimeConfig) -> io::Result<Runtime> {
    let mut builder = Builder::new_multi_thread();
    builder
        .enable_time()
        .max_blocking_threads(config.max_blocking_threads)
        .thread_name(config.thread_name.clone());
    if let Some(threads) = config.worker_threads {
        builder.worker_threads(threads);
    }
    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use directio_config::DirectIoConfig;

    #[test]
    fn builds_from_default_config() {
        let runtime = BridgeRuntime::from_config(&RuntimeConfig::default()).unwrap();
        assert_eq!(runtime.block_on(async { 2 + 2 }), 4);
        assert!(!runtime.bridge().platform().name().is_empty());
    }

    #[test]
    fn thread_name_is_applied() {
        let config = DirectIoConfig::development().runtime;
        let runtime = BridgeRuntime::from_config(&config).unwrap();
        let name = runtime
            .block_on(runtime.handle().spawn(async {
                std::thread::current().name().map(str::to_owned)
            }))
            .unwrap();
        assert_eq!(name.as_deref(), Some("directio-worker"));
    }
}
