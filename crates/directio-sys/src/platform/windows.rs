//! Windows: storage property and drive geometry queries, volume locks.
//!
//! Windows has no generic way to assert that a handle is a device, so the
//! geometry query goes straight to `DeviceIoControl`. No serial is read.
#![allow(unsafe_code)]

use std::ffi::c_void;
use std::mem::MaybeUninit;

use windows_sys::Win32::Foundation::{HANDLE, INVALID_HANDLE_VALUE};
use windows_sys::Win32::System::IO::DeviceIoControl;
use windows_sys::Win32::System::Ioctl::{
    DISK_GEOMETRY_EX, FSCTL_LOCK_VOLUME, FSCTL_UNLOCK_VOLUME, IOCTL_DISK_GET_DRIVE_GEOMETRY_EX,
    IOCTL_STORAGE_QUERY_PROPERTY, PropertyStandardQuery, STORAGE_ACCESS_ALIGNMENT_DESCRIPTOR,
    STORAGE_PROPERTY_QUERY, StorageAccessAlignmentProperty,
};

use super::Platform;
use crate::{DeviceInfo, DirectIoError, DirectIoResult, Fd, Operation};

/// Windows family.
#[derive(Debug, Default, Clone, Copy)]
pub struct Windows;

impl Platform for Windows {
    fn name(&self) -> &'static str {
        "windows"
    }

    fn capabilities(&self) -> &'static [Operation] {
        &[Operation::QueryBlockDevice, Operation::SetVolumeLock]
    }

    fn query_block_device(&self, fd: Fd) -> DirectIoResult<DeviceInfo> {
        let handle = os_handle(fd)?;

        // SAFETY: all-zero is a valid bit pattern for these plain C structs.
        let mut query: STORAGE_PROPERTY_QUERY = unsafe { MaybeUninit::zeroed().assume_init() };
        query.PropertyId = StorageAccessAlignmentProperty;
        query.QueryType = PropertyStandardQuery;
        // SAFETY: as above.
        let mut alignment: STORAGE_ACCESS_ALIGNMENT_DESCRIPTOR =
            unsafe { MaybeUninit::zeroed().assume_init() };
        // SAFETY: as above.
        let mut geometry: DISK_GEOMETRY_EX = unsafe { MaybeUninit::zeroed().assume_init() };

        device_io_control(
            handle,
            IOCTL_STORAGE_QUERY_PROPERTY,
            Some(&query),
            Some(&mut alignment),
            "IOCTL_STORAGE_QUERY_PROPERTY failed",
        )?;
        device_io_control::<(), _>(
            handle,
            IOCTL_DISK_GET_DRIVE_GEOMETRY_EX,
            None,
            Some(&mut geometry),
            "IOCTL_DISK_GET_DRIVE_GEOMETRY_EX failed",
        )?;

        let size =
            u64::try_from(geometry.DiskSize).map_err(|_| DirectIoError::os("size < 0"))?;
        Ok(DeviceInfo::new(
            u64::from(alignment.BytesPerLogicalSector),
            u64::from(alignment.BytesPerPhysicalSector),
            size,
            &[],
        ))
    }

    /// Fails while the volume holds system files, a page file, or has any
    /// other open handle.
    fn set_volume_lock(&self, fd: Fd, enabled: bool) -> DirectIoResult<()> {
        let handle = os_handle(fd)?;
        let (code, call) = if enabled {
            (FSCTL_LOCK_VOLUME, "FSCTL_LOCK_VOLUME failed")
        } else {
            (FSCTL_UNLOCK_VOLUME, "FSCTL_UNLOCK_VOLUME failed")
        };
        device_io_control::<(), ()>(handle, code, None, None, call)
    }
}

/// Resolves a C-runtime descriptor to its OS handle.
fn os_handle(fd: Fd) -> DirectIoResult<HANDLE> {
    // SAFETY: _get_osfhandle validates the descriptor and returns -1 if it is
    // not open.
    let handle = unsafe { libc::get_osfhandle(fd.raw()) } as HANDLE;
    if handle == INVALID_HANDLE_VALUE {
        return Err(DirectIoError::os("EBADF: bad file descriptor"));
    }
    Ok(handle)
}

fn device_io_control<I, O>(
    handle: HANDLE,
    code: u32,
    input: Option<&I>,
    output: Option<&mut O>,
    call: &'static str,
) -> DirectIoResult<()> {
    let (in_ptr, in_len) = match input {
        Some(input) => (std::ptr::from_ref(input).cast::<c_void>(), size_of::<I>()),
        None => (std::ptr::null(), 0),
    };
    let (out_ptr, out_len) = match output {
        Some(output) => (std::ptr::from_mut(output).cast::<c_void>(), size_of::<O>()),
        None => (std::ptr::null_mut(), 0),
    };
    let mut returned: u32 = 0;
    // SAFETY: the buffers are valid for their stated sizes for the whole
    // synchronous call; no OVERLAPPED is used.
    let ok = unsafe {
        DeviceIoControl(
            handle,
            code,
            in_ptr,
            in_len as u32,
            out_ptr,
            out_len as u32,
            &mut returned,
            std::ptr::null_mut(),
        )
    };
    if ok == 0 {
        return Err(DirectIoError::last_os_error(call));
    }
    Ok(())
}
