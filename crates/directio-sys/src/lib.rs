//! # directio-sys: device geometry and exclusive access per platform
//!
//! Blocking, synchronous primitives behind the directio task bridge:
//!
//! - **Device geometry**: logical/physical sector size, total size and serial
//!   number of a block or character device
//! - **Exclusive access**: `flock` advisory locks, Darwin's `F_NOCACHE`,
//!   Windows volume locks
//! - **Open flags**: numeric `O_DIRECT`, `O_DSYNC`, `O_EXCL`, `O_EXLOCK`,
//!   `O_SYNC` for the host platform
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────┐
//! │           directio           │
//! │  (bridge calls PLATFORM.*)   │
//! └──────────────┬───────────────┘
//!                │ &'static dyn Platform
//! ┌──────────────┴───────────────┐
//! │         directio-sys         │
//! │ ┌───────┐┌──────┐┌─────────┐ │
//! │ │ Linux ││Darwin││ FreeBsd │ │
//! │ └───────┘└──────┘└─────────┘ │
//! │ ┌─────────┐┌─────────────┐   │
//! │ │ Windows ││ Unsupported │   │
//! │ └─────────┘└─────────────┘   │
//! └──────────────────────────────┘
//! ```
//!
//! Exactly one family is compiled in and exposed as [`PLATFORM`].

mod device;
mod error;
mod flags;
pub mod platform;

pub use device::{DEVICE_SERIAL_MAX, DeviceInfo, Fd, Operation, serial_to_string};
pub use error::{DirectIoError, DirectIoResult};
pub use flags::{OPEN_FLAGS, OpenFlags};
pub use platform::{NativePlatform, PLATFORM, Platform, Unsupported};
