//! Darwin disks: `DKIOC*` geometry, `F_NOCACHE` and `flock`.
//!
//! Darwin exposes no serial number through these calls, so it is left empty.
#![allow(unsafe_code)]

use super::ioc::ior;
use super::{Platform, unix};
use crate::{DeviceInfo, DirectIoError, DirectIoResult, Fd, Operation};

const DKIOCGETBLOCKSIZE: u64 = ior(b'd', 24, size_of::<u32>());
const DKIOCGETBLOCKCOUNT: u64 = ior(b'd', 25, size_of::<u64>());
const DKIOCGETPHYSICALBLOCKSIZE: u64 = ior(b'd', 77, size_of::<u32>());

/// Darwin-like family.
#[derive(Debug, Default, Clone, Copy)]
pub struct Darwin;

impl Platform for Darwin {
    fn name(&self) -> &'static str {
        "mac os"
    }

    fn capabilities(&self) -> &'static [Operation] {
        &[
            Operation::QueryBlockDevice,
            Operation::SetCacheBypass,
            Operation::SetAdvisoryLock,
        ]
    }

    fn query_block_device(&self, fd: Fd) -> DirectIoResult<DeviceInfo> {
        unix::ensure_device(fd)?;

        let mut logical: u32 = 0;
        let mut physical: u32 = 0;
        let mut blocks: u64 = 0;
        unix::ioctl(fd, DKIOCGETBLOCKSIZE, &mut logical, "DKIOCGETBLOCKSIZE failed")?;
        unix::ioctl(
            fd,
            DKIOCGETPHYSICALBLOCKSIZE,
            &mut physical,
            "DKIOCGETPHYSICALBLOCKSIZE failed",
        )?;
        unix::ioctl(fd, DKIOCGETBLOCKCOUNT, &mut blocks, "DKIOCGETBLOCKCOUNT failed")?;

        let size = u64::from(logical)
            .checked_mul(blocks)
            .ok_or(DirectIoError::os("DKIOCGETBLOCKCOUNT overflow"))?;
        Ok(DeviceInfo::new(
            u64::from(logical),
            u64::from(physical),
            size,
            &[],
        ))
    }

    /// Sets `F_NOCACHE`. Pages already in the cache are not purged.
    fn set_cache_bypass(&self, fd: Fd, enabled: bool) -> DirectIoResult<()> {
        // SAFETY: F_NOCACHE takes an int argument and only flags the descriptor.
        let rc = unsafe { libc::fcntl(fd.raw(), libc::F_NOCACHE, i32::from(enabled)) };
        if rc == 0 {
            return Ok(());
        }
        let errno = std::io::Error::last_os_error().raw_os_error();
        let call = if errno == Some(libc::EBADF) {
            "EBADF: bad file descriptor, fcntl"
        } else {
            "unexpected error, fcntl"
        };
        Err(DirectIoError::Os { call, errno })
    }

    fn set_advisory_lock(&self, fd: Fd, enabled: bool) -> DirectIoResult<()> {
        unix::set_advisory_lock(fd, enabled)
    }
}

#[cfg(test)]
mod tests {
    use std::os::fd::AsRawFd;

    use super::*;

    #[test]
    fn cache_bypass_toggles_on_regular_file() {
        let file = tempfile::tempfile().unwrap();
        let fd = Fd::new(file.as_raw_fd()).unwrap();
        Darwin.set_cache_bypass(fd, true).unwrap();
        Darwin.set_cache_bypass(fd, false).unwrap();
    }

    #[test]
    fn cache_bypass_on_bad_descriptor() {
        let err = Darwin
            .set_cache_bypass(Fd::new(i32::MAX).unwrap(), true)
            .unwrap_err();
        assert_eq!(err.to_string(), "EBADF: bad file descriptor, fcntl");
    }

    #[test]
    fn regular_file_is_not_a_device() {
        let file = tempfile::tempfile().unwrap();
        let err = Darwin
            .query_block_device(Fd::new(file.as_raw_fd()).unwrap())
            .unwrap_err();
        assert_eq!(err.to_string(), "fd is not a block or character device");
    }
}
