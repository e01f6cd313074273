//! Aligned buffers for direct I/O.
//!
//! `O_DIRECT` (and unbuffered I/O elsewhere) requires the memory handed to the
//! kernel to start on a sector boundary. `Vec<u8>` only guarantees byte
//! alignment, so [`AlignedBuffer`] allocates through `std::alloc` with an
//! explicit [`Layout`] and frees with the same layout on drop.
#![allow(unsafe_code)]

use std::alloc::{self, Layout};
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::ptr::NonNull;
use std::slice;

use bytes::Bytes;
use directio_sys::{DirectIoError, DirectIoResult};

/// Largest buffer that may be requested, in bytes.
pub const MAX_SIZE: usize = i32::MAX as usize;

/// Smallest accepted alignment, in bytes.
pub const MIN_ALIGNMENT: usize = 8;

/// Largest accepted alignment (4 MiB).
pub const MAX_ALIGNMENT: usize = 4 * 1024 * 1024;

/// A zero-filled, heap-allocated region whose start address is a multiple of
/// the requested alignment.
///
/// The region is released exactly once: when the buffer is dropped, or, after
/// [`AlignedBuffer::into_bytes`], when the last `Bytes` handle is dropped.
pub struct AlignedBuffer {
    ptr: NonNull<u8>,
    layout: Layout,
}

// SAFETY: the buffer uniquely owns its allocation and exposes it only through
// `&self`/`&mut self` borrows.
unsafe impl Send for AlignedBuffer {}
// SAFETY: shared access only hands out `&[u8]`.
unsafe impl Sync for AlignedBuffer {}

impl AlignedBuffer {
    /// Allocates `size` zeroed bytes starting on an `alignment` boundary.
    ///
    /// Arguments are checked in a fixed order and the first violation is
    /// reported as [`DirectIoError::InvalidArgument`].
    pub fn allocate(size: usize, alignment: usize) -> DirectIoResult<Self> {
        let layout = validate(size, alignment)?;

        // SAFETY: `validate` guarantees a non-zero size.
        let ptr = unsafe { alloc::alloc_zeroed(layout) };
        let ptr = NonNull::new(ptr).ok_or(DirectIoError::OutOfMemory)?;
        debug_assert!(is_aligned(ptr.as_ptr(), alignment));

        Ok(Self { ptr, layout })
    }

    /// Returns the length of the buffer in bytes.
    pub fn len(&self) -> usize {
        self.layout.size()
    }

    /// Always false: zero-sized buffers cannot be allocated.
    pub fn is_empty(&self) -> bool {
        self.layout.size() == 0
    }

    /// Returns the alignment the buffer was allocated with.
    pub fn alignment(&self) -> usize {
        self.layout.align()
    }

    pub fn as_ptr(&self) -> *const u8 {
        self.ptr.as_ptr()
    }

    pub fn as_mut_ptr(&mut self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    /// Returns the buffer contents as a slice.
    pub fn as_slice(&self) -> &[u8] {
        // SAFETY: `ptr` points to `layout.size()` initialised (zeroed) bytes
        // owned by `self` for the lifetime of the borrow.
        unsafe { slice::from_raw_parts(self.ptr.as_ptr(), self.layout.size()) }
    }

    /// Returns the buffer contents as a mutable slice.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        // SAFETY: as for `as_slice`; `&mut self` guarantees exclusive access.
        unsafe { slice::from_raw_parts_mut(self.ptr.as_ptr(), self.layout.size()) }
    }

    /// Freezes the buffer into reference-counted `Bytes` without copying.
    ///
    /// Alignment is preserved; the region is freed when the last clone drops.
    pub fn into_bytes(self) -> Bytes {
        Bytes::from_owner(self)
    }
}

impl Drop for AlignedBuffer {
    fn drop(&mut self) {
        // SAFETY: `ptr` was returned by `alloc_zeroed` with this exact layout
        // and is not used after this point.
        unsafe { alloc::dealloc(self.ptr.as_ptr(), self.layout) };
    }
}

impl Deref for AlignedBuffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl DerefMut for AlignedBuffer {
    fn deref_mut(&mut self) -> &mut [u8] {
        self.as_mut_slice()
    }
}

impl AsRef<[u8]> for AlignedBuffer {
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl AsMut<[u8]> for AlignedBuffer {
    fn as_mut(&mut self) -> &mut [u8] {
        self.as_mut_slice()
    }
}

impl fmt::Debug for AlignedBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlignedBuffer")
            .field("ptr", &self.ptr)
            .field("len", &self.len())
            .field("alignment", &self.alignment())
            .finish()
    }
}

/// Returns true if `ptr` is a multiple of `alignment`.
pub fn is_aligned(ptr: *const u8, alignment: usize) -> bool {
    alignment != 0 && ptr.addr() % alignment == 0
}

fn validate(size: usize, alignment: usize) -> DirectIoResult<Layout> {
    let invalid = DirectIoError::InvalidArgument;

    if size == 0 {
        return Err(invalid("size must not be 0"));
    }
    if size > MAX_SIZE {
        return Err(invalid("size must be at most 2147483647 bytes"));
    }
    if alignment == 0 {
        return Err(invalid("alignment must not be 0"));
    }
    if !alignment.is_power_of_two() {
        return Err(invalid("alignment must be a power of 2"));
    }
    if alignment < MIN_ALIGNMENT {
        return Err(invalid("alignment must be at least 8 bytes"));
    }
    if alignment > MAX_ALIGNMENT {
        return Err(invalid("alignment must be at most 4194304 bytes"));
    }
    if alignment < size_of::<*const u8>() {
        return Err(invalid("alignment must be at least as large as a pointer"));
    }

    Layout::from_size_align(size, alignment).map_err(|_| invalid("bad alignment argument"))
}
