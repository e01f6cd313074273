//! Linux block devices: `BLK*` ioctls plus a SCSI generic INQUIRY for the
//! unit serial number.
#![allow(unsafe_code)]

use std::ffi::{c_int, c_uint, c_void};

use tracing::warn;

use super::ioc::{io, ior};
use super::{Platform, unix};
use crate::{DEVICE_SERIAL_MAX, DeviceInfo, DirectIoError, DirectIoResult, Fd, Operation};

const BLKSSZGET: u64 = io(0x12, 104);
const BLKPBSZGET: u64 = io(0x12, 123);
const BLKGETSIZE64: u64 = ior(0x12, 114, size_of::<usize>());

const SG_GET_VERSION_NUM: u64 = 0x2282;
const SG_IO: u64 = 0x2285;
const SG_DXFER_FROM_DEV: c_int = -3;
const SG_INFO_OK_MASK: c_uint = 0x1;
const SG_INFO_OK: c_uint = 0x0;
const SG_MIN_VERSION: c_int = 30000;

/// INQUIRY, EVPD=1, page 0x80 (unit serial number).
const INQUIRY_PAGE: u8 = 0x80;
const INQUIRY_LEN: usize = 255;
const SENSE_LEN: usize = 32;
const SG_TIMEOUT_MS: c_uint = 5000;

/// `sg_io_hdr_t` from `<scsi/sg.h>`.
#[repr(C)]
struct SgIoHdr {
    interface_id: c_int,
    dxfer_direction: c_int,
    cmd_len: u8,
    mx_sb_len: u8,
    iovec_count: u16,
    dxfer_len: c_uint,
    dxferp: *mut c_void,
    cmdp: *mut u8,
    sbp: *mut u8,
    timeout: c_uint,
    flags: c_uint,
    pack_id: c_int,
    usr_ptr: *mut c_void,
    status: u8,
    masked_status: u8,
    msg_status: u8,
    sb_len_wr: u8,
    host_status: u16,
    driver_status: u16,
    resid: c_int,
    duration: c_uint,
    info: c_uint,
}

/// Linux-like family.
#[derive(Debug, Default, Clone, Copy)]
pub struct Linux;

impl Platform for Linux {
    fn name(&self) -> &'static str {
        "linux"
    }

    fn capabilities(&self) -> &'static [Operation] {
        &[Operation::QueryBlockDevice, Operation::SetAdvisoryLock]
    }

    fn query_block_device(&self, fd: Fd) -> DirectIoResult<DeviceInfo> {
        unix::ensure_device(fd)?;

        // The argument types follow the kernel: int, unsigned int, u64.
        let mut logical: c_int = 0;
        let mut physical: c_uint = 0;
        let mut size: u64 = 0;
        unix::ioctl(fd, BLKSSZGET, &mut logical, "BLKSSZGET failed")?;
        let logical =
            u64::try_from(logical).map_err(|_| DirectIoError::os("logical_sector < 0"))?;
        unix::ioctl(fd, BLKPBSZGET, &mut physical, "BLKPBSZGET failed")?;
        unix::ioctl(fd, BLKGETSIZE64, &mut size, "BLKGETSIZE64 failed")?;

        let serial = read_serial(fd)?;
        Ok(DeviceInfo::new(logical, u64::from(physical), size, &serial))
    }

    fn set_advisory_lock(&self, fd: Fd, enabled: bool) -> DirectIoResult<()> {
        unix::set_advisory_lock(fd, enabled)
    }
}

/// Reads the unit serial number VPD page through the SCSI generic driver.
fn read_serial(fd: Fd) -> DirectIoResult<Vec<u8>> {
    let mut version: c_int = 0;
    unix::ioctl(fd, SG_GET_VERSION_NUM, &mut version, "SG_GET_VERSION_NUM failed")?;
    if version < SG_MIN_VERSION {
        return Err(DirectIoError::os("SG_GET_VERSION_NUM < 30000"));
    }

    let mut response = [0u8; INQUIRY_LEN];
    let mut command: [u8; 6] = [0x12, 0x01, INQUIRY_PAGE, 0x00, INQUIRY_LEN as u8, 0x00];
    let mut sense = [0u8; SENSE_LEN];
    let mut hdr = SgIoHdr {
        interface_id: c_int::from(b'S'),
        dxfer_direction: SG_DXFER_FROM_DEV,
        cmd_len: command.len() as u8,
        mx_sb_len: SENSE_LEN as u8,
        iovec_count: 0,
        dxfer_len: INQUIRY_LEN as c_uint,
        dxferp: response.as_mut_ptr().cast(),
        cmdp: command.as_mut_ptr(),
        sbp: sense.as_mut_ptr(),
        timeout: SG_TIMEOUT_MS,
        flags: 0,
        pack_id: 0,
        usr_ptr: std::ptr::null_mut(),
        status: 0,
        masked_status: 0,
        msg_status: 0,
        sb_len_wr: 0,
        host_status: 0,
        driver_status: 0,
        resid: 0,
        duration: 0,
        info: 0,
    };
    unix::ioctl(fd, SG_IO, &mut hdr, "SG_IO failed")?;

    if (hdr.info & SG_INFO_OK_MASK) != SG_INFO_OK {
        return Err(DirectIoError::os("SG_INFO_OK_MASK failed"));
    }
    if hdr.masked_status != 0 {
        warn!(
            status = hdr.status,
            masked_status = hdr.masked_status,
            "SCSI INQUIRY check condition"
        );
        return Err(DirectIoError::os("io_hdr.masked_status was non-zero"));
    }
    if hdr.host_status != 0 {
        warn!(host_status = hdr.host_status, "SCSI INQUIRY host error");
        return Err(DirectIoError::os("io_hdr.host_status was non-zero"));
    }
    if hdr.driver_status != 0 {
        warn!(driver_status = hdr.driver_status, "SCSI INQUIRY driver error");
        return Err(DirectIoError::os("io_hdr.driver_status was non_zero"));
    }

    serial_from_vpd(&response)
}

/// Extracts the serial from a unit serial number VPD page.
///
/// Byte 1 is the page code, byte 3 the page length, the serial follows at
/// byte 4. The length is clamped to what was actually transferred.
fn serial_from_vpd(page: &[u8]) -> DirectIoResult<Vec<u8>> {
    if page.get(1) != Some(&INQUIRY_PAGE) {
        return Err(DirectIoError::os("dxferp[1] != 0x80"));
    }
    let declared = page.get(3).map_or(0, |&len| usize::from(len));
    let serial = page.get(4..).unwrap_or_default();
    Ok(serial[..declared.min(serial.len()).min(DEVICE_SERIAL_MAX)].to_vec())
}
