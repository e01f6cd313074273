//! # directio: Direct I/O Support Layer
//!
//! Device introspection and access control for storage code that bypasses
//! the page cache:
//!
//! - **`AlignedBuffer`**: zero-filled memory aligned for `O_DIRECT`
//! - **`Bridge`**: runs blocking device calls on a tokio runtime and reports
//!   each outcome to a callback exactly once
//! - **`OPEN_FLAGS`**: platform values of the direct/sync open flags
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────┐
//! │               directio               │
//! │  ┌─────────┐ ┌────────┐ ┌──────────┐ │
//! │  │ Aligned │ │ Bridge │ │ Bridge   │ │
//! │  │ Buffer  │ │ + Task │ │ Runtime  │ │
//! │  └─────────┘ └───┬────┘ └──────────┘ │
//! └──────────────────┼───────────────────┘
//!                    │ spawn_blocking
//! ┌──────────────────┴───────────────────┐
//! │             directio-sys             │
//! │  Platform: Linux │ Darwin │ FreeBsd  │
//! │            Windows │ Unsupported     │
//! └──────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use directio::{AlignedBuffer, BridgeRuntime, RuntimeConfig};
//!
//! let buf = AlignedBuffer::allocate(4096, 4096)?;
//! assert_eq!(buf.len(), 4096);
//!
//! let runtime = BridgeRuntime::from_config(&RuntimeConfig::default())?;
//! let info = runtime.block_on(runtime.bridge().query(3))?;
//! println!("{} byte sectors", info.logical_sector_size);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod aligned;
mod args;
mod bridge;
mod runtime;
mod task;
pub mod telemetry;

pub use aligned::{AlignedBuffer, MAX_ALIGNMENT, MAX_SIZE, MIN_ALIGNMENT, is_aligned};
pub use args::allocate_from_args;
pub use bridge::{Bridge, Completion};
pub use directio_config::{DirectIoConfig, LoggingConfig, RuntimeConfig};
pub use directio_sys::{
    DeviceInfo, DirectIoError, DirectIoResult, Fd, OPEN_FLAGS, OpenFlags, Operation, PLATFORM,
    Platform,
};
pub use runtime::BridgeRuntime;
pub use task::{TaskHandle, TaskState};
