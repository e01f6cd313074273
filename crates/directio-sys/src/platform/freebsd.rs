//! FreeBSD disks: `DIOC*` geometry and `DIOCGIDENT` serials.

use std::ffi::c_uint;

use super::ioc::ior;
use super::{Platform, unix};
use crate::{DeviceInfo, DirectIoError, DirectIoResult, Fd, Operation};

/// `DISK_IDENT_SIZE` from `<sys/disk.h>`.
const DISK_IDENT_SIZE: usize = 256;

const DIOCGSECTORSIZE: u64 = ior(b'd', 128, size_of::<c_uint>());
const DIOCGMEDIASIZE: u64 = ior(b'd', 129, size_of::<libc::off_t>());
const DIOCGIDENT: u64 = ior(b'd', 137, DISK_IDENT_SIZE);
const DIOCGSTRIPESIZE: u64 = ior(b'd', 139, size_of::<libc::off_t>());

/// FreeBSD-like family.
#[derive(Debug, Default, Clone, Copy)]
pub struct FreeBsd;

impl Platform for FreeBsd {
    fn name(&self) -> &'static str {
        "freebsd"
    }

    fn capabilities(&self) -> &'static [Operation] {
        &[Operation::QueryBlockDevice, Operation::SetAdvisoryLock]
    }

    fn query_block_device(&self, fd: Fd) -> DirectIoResult<DeviceInfo> {
        unix::ensure_device(fd)?;

        let mut logical: c_uint = 0;
        let mut stripe: libc::off_t = 0;
        let mut size: libc::off_t = 0;
        unix::ioctl(fd, DIOCGSECTORSIZE, &mut logical, "DIOCGSECTORSIZE failed")?;
        unix::ioctl(fd, DIOCGSTRIPESIZE, &mut stripe, "DIOCGSTRIPESIZE failed")?;
        let physical =
            u64::try_from(stripe).map_err(|_| DirectIoError::os("physical_sector < 0"))?;
        unix::ioctl(fd, DIOCGMEDIASIZE, &mut size, "DIOCGMEDIASIZE failed")?;
        let size = u64::try_from(size).map_err(|_| DirectIoError::os("size < 0"))?;

        let mut ident = [0u8; DISK_IDENT_SIZE];
        unix::ioctl(fd, DIOCGIDENT, &mut ident, "DIOCGIDENT failed")?;
        let len = ident.iter().position(|&b| b == 0).unwrap_or(ident.len());

        Ok(DeviceInfo::new(u64::from(logical), physical, size, &ident[..len]))
    }

    fn set_advisory_lock(&self, fd: Fd, enabled: bool) -> DirectIoResult<()> {
        unix::set_advisory_lock(fd, enabled)
    }
}
