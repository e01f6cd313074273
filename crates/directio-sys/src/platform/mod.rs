//! Platform capability dispatch.
//!
//! The [`Platform`] trait abstracts the four device operations so that the
//! task bridge is written once:
//! - Darwin-like (`macos`, `ios`): disk ioctls, `F_NOCACHE`, `flock`
//! - FreeBSD-like: disk ioctls with `DIOCGIDENT` serials, `flock`
//! - Linux-like: block ioctls with SCSI generic serials, `flock`
//! - Windows: `DeviceIoControl` geometry and volume locks
//!
//! Each family overrides only the operations it supports. The defaults
//! return the operation's fixed rejection, so the calling surface is the same
//! everywhere.

use std::fmt;

use crate::{DeviceInfo, DirectIoError, DirectIoResult, Fd, Operation};

#[cfg(any(
    target_os = "linux",
    target_os = "android",
    target_os = "macos",
    target_os = "ios",
    target_os = "freebsd",
))]
mod ioc;
#[cfg(any(
    target_os = "linux",
    target_os = "android",
    target_os = "macos",
    target_os = "ios",
    target_os = "freebsd",
))]
mod unix;

#[cfg(target_os = "freebsd")]
mod freebsd;
#[cfg(any(target_os = "linux", target_os = "android"))]
mod linux;
#[cfg(any(target_os = "macos", target_os = "ios"))]
mod macos;
#[cfg(windows)]
mod windows;

#[cfg(target_os = "freebsd")]
pub use freebsd::FreeBsd;
#[cfg(any(target_os = "linux", target_os = "android"))]
pub use linux::Linux;
#[cfg(any(target_os = "macos", target_os = "ios"))]
pub use macos::Darwin;
#[cfg(windows)]
pub use windows::Windows;

/// Device operations for one platform family.
///
/// All methods are blocking and are meant to run on a worker thread.
/// Implementations touch nothing but the given descriptor.
pub trait Platform: Send + Sync + fmt::Debug {
    /// Human-readable family name.
    fn name(&self) -> &'static str;

    /// Operations this family implements.
    fn capabilities(&self) -> &'static [Operation];

    /// Returns true if `op` is implemented.
    fn supports(&self, op: Operation) -> bool {
        self.capabilities().contains(&op)
    }

    /// Fails with the fixed rejection unless `op` is implemented.
    fn ensure_supported(&self, op: Operation) -> DirectIoResult<()> {
        if self.supports(op) {
            Ok(())
        } else {
            Err(DirectIoError::UnsupportedPlatform(op.unsupported()))
        }
    }

    /// Reads sector sizes, total size and serial number of a device.
    fn query_block_device(&self, fd: Fd) -> DirectIoResult<DeviceInfo> {
        _ = fd;
        Err(DirectIoError::UnsupportedPlatform(
            Operation::QueryBlockDevice.unsupported(),
        ))
    }

    /// Disables (`true`) or re-enables (`false`) the unified buffer cache.
    fn set_cache_bypass(&self, fd: Fd, enabled: bool) -> DirectIoResult<()> {
        _ = (fd, enabled);
        Err(DirectIoError::UnsupportedPlatform(
            Operation::SetCacheBypass.unsupported(),
        ))
    }

    /// Takes (`true`) or releases (`false`) a non-blocking exclusive lock.
    fn set_advisory_lock(&self, fd: Fd, enabled: bool) -> DirectIoResult<()> {
        _ = (fd, enabled);
        Err(DirectIoError::UnsupportedPlatform(
            Operation::SetAdvisoryLock.unsupported(),
        ))
    }

    /// Locks (`true`) or unlocks (`false`) the volume behind the descriptor.
    fn set_volume_lock(&self, fd: Fd, enabled: bool) -> DirectIoResult<()> {
        _ = (fd, enabled);
        Err(DirectIoError::UnsupportedPlatform(
            Operation::SetVolumeLock.unsupported(),
        ))
    }
}

/// Family used on targets with no known device interface.
#[derive(Debug, Default, Clone, Copy)]
pub struct Unsupported;

impl Platform for Unsupported {
    fn name(&self) -> &'static str {
        "unsupported"
    }

    fn capabilities(&self) -> &'static [Operation] {
        &[]
    }
}

/// The family compiled in for this target.
#[cfg(any(target_os = "linux", target_os = "android"))]
pub type NativePlatform = Linux;
/// The family compiled in for this target.
#[cfg(any(target_os = "macos", target_os = "ios"))]
pub type NativePlatform = Darwin;
/// The family compiled in for this target.
#[cfg(target_os = "freebsd")]
pub type NativePlatform = FreeBsd;
/// The family compiled in for this target.
#[cfg(windows)]
pub type NativePlatform = Windows;
/// The family compiled in for this target.
#[cfg(not(any(
    windows,
    target_os = "linux",
    target_os = "android",
    target_os = "macos",
    target_os = "ios",
    target_os = "freebsd",
)))]
pub type NativePlatform = Unsupported;

/// Process-wide handle to the native family.
pub static PLATFORM: &dyn Platform = &NativePlatform {};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_rejects_everything_with_fixed_messages() {
        let fd = Fd::new(0).unwrap();
        let platform = Unsupported;
        for op in Operation::ALL {
            assert_eq!(
                platform.ensure_supported(op),
                Err(DirectIoError::UnsupportedPlatform(op.unsupported()))
            );
        }
        assert_eq!(
            platform.set_cache_bypass(fd, true).unwrap_err().to_string(),
            "only supported on mac os"
        );
        assert_eq!(
            platform.set_volume_lock(fd, true).unwrap_err().to_string(),
            "only supported on windows"
        );
        assert_eq!(
            platform.set_advisory_lock(fd, true).unwrap_err().to_string(),
            "not supported on windows"
        );
    }

    #[test]
    fn selected_platform_always_queries_devices() {
        #[cfg(any(
            windows,
            target_os = "linux",
            target_os = "android",
            target_os = "macos",
            target_os = "ios",
            target_os = "freebsd",
        ))]
        assert!(PLATFORM.supports(Operation::QueryBlockDevice));
        assert!(!PLATFORM.name().is_empty());
    }

    #[cfg(any(
        target_os = "linux",
        target_os = "android",
        target_os = "macos",
        target_os = "ios",
        target_os = "freebsd",
    ))]
    #[test]
    fn unix_families_lock_with_flock() {
        assert!(PLATFORM.supports(Operation::SetAdvisoryLock));
        assert!(!PLATFORM.supports(Operation::SetVolumeLock));
    }

    #[cfg(windows)]
    #[test]
    fn windows_locks_volumes() {
        assert!(PLATFORM.supports(Operation::SetVolumeLock));
        assert!(!PLATFORM.supports(Operation::SetAdvisoryLock));
        assert!(!PLATFORM.supports(Operation::SetCacheBypass));
    }
}
