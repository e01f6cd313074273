//! Descriptor, operation and geometry types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Maximum number of serial number bytes kept from a device.
pub const DEVICE_SERIAL_MAX: usize = 1024;

/// A caller-owned raw file descriptor.
///
/// This layer never duplicates or closes the descriptor. On Windows the
/// value is a C-runtime descriptor that is resolved to its OS handle before
/// each call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fd(i32);

impl Fd {
    /// Wraps a raw descriptor, rejecting negative values.
    pub fn new(raw: i32) -> Option<Self> {
        (raw >= 0).then_some(Self(raw))
    }

    /// Returns the raw descriptor value.
    pub fn raw(self) -> i32 {
        self.0
    }
}

impl fmt::Display for Fd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The four operations every platform family exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Geometry and serial number inquiry.
    QueryBlockDevice,
    /// Unified buffer cache toggle (`F_NOCACHE`).
    SetCacheBypass,
    /// Non-blocking exclusive `flock`.
    SetAdvisoryLock,
    /// `FSCTL_LOCK_VOLUME` / `FSCTL_UNLOCK_VOLUME`.
    SetVolumeLock,
}

impl Operation {
    pub const ALL: [Operation; 4] = [
        Operation::QueryBlockDevice,
        Operation::SetCacheBypass,
        Operation::SetAdvisoryLock,
        Operation::SetVolumeLock,
    ];

    /// Short name used in logs.
    pub fn name(self) -> &'static str {
        match self {
            Self::QueryBlockDevice => "query_block_device",
            Self::SetCacheBypass => "set_cache_bypass",
            Self::SetAdvisoryLock => "set_advisory_lock",
            Self::SetVolumeLock => "set_volume_lock",
        }
    }

    /// Returns true if the operation takes a 0/1 value argument.
    pub fn takes_value(self) -> bool {
        !matches!(self, Self::QueryBlockDevice)
    }

    /// The fixed message for arguments of the wrong shape.
    pub fn bad_arguments(self) -> &'static str {
        if self.takes_value() {
            "bad arguments, expected: (fd, value=0/1, callback)"
        } else {
            "bad arguments, expected: (fd, callback)"
        }
    }

    /// The fixed rejection message on platforms lacking the operation.
    pub fn unsupported(self) -> &'static str {
        match self {
            Self::QueryBlockDevice => "only supported on linux, mac os, freebsd and windows",
            Self::SetCacheBypass => "only supported on mac os",
            Self::SetAdvisoryLock => "not supported on windows",
            Self::SetVolumeLock => "only supported on windows",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Geometry of a block or character device.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    /// Smallest addressable unit reported to the OS, in bytes.
    pub logical_sector_size: u64,
    /// Underlying write granularity in bytes. Virtual devices may report 0.
    pub physical_sector_size: u64,
    /// Total device size in bytes.
    pub size: u64,
    /// Device serial number, empty where the platform exposes none.
    pub serial_number: String,
}

impl DeviceInfo {
    /// Builds a `DeviceInfo`, normalising the raw serial number bytes.
    pub fn new(
        logical_sector_size: u64,
        physical_sector_size: u64,
        size: u64,
        raw_serial: &[u8],
    ) -> Self {
        Self {
            logical_sector_size,
            physical_sector_size,
            size,
            serial_number: serial_to_string(raw_serial),
        }
    }
}

/// Truncates to [`DEVICE_SERIAL_MAX`], strips leading and trailing ASCII
/// spaces and decodes as UTF-8 (lossy).
pub fn serial_to_string(raw: &[u8]) -> String {
    let raw = &raw[..raw.len().min(DEVICE_SERIAL_MAX)];
    let start = raw.iter().position(|&b| b != b' ').unwrap_or(raw.len());
    let end = raw.iter().rposition(|&b| b != b' ').map_or(start, |i| i + 1);
    String::from_utf8_lossy(&raw[start..end]).into_owned()
}
