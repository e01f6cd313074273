//! ioctl request encoding.
//!
//! Only the read-direction encoders are needed: every control call here
//! copies a value out of the kernel.

/// Encodes a Linux `_IOR(ty, nr, size)` request.
#[cfg(any(target_os = "linux", target_os = "android"))]
pub const fn ior(ty: u8, nr: u8, size: usize) -> u64 {
    #[cfg(any(
        target_arch = "powerpc",
        target_arch = "powerpc64",
        target_arch = "mips",
        target_arch = "mips64",
        target_arch = "sparc",
        target_arch = "sparc64",
    ))]
    const READ: u64 = 2 << 29;
    #[cfg(not(any(
        target_arch = "powerpc",
        target_arch = "powerpc64",
        target_arch = "mips",
        target_arch = "mips64",
        target_arch = "sparc",
        target_arch = "sparc64",
    )))]
    const READ: u64 = 2 << 30;

    READ | ((size as u64) << 16) | ((ty as u64) << 8) | nr as u64
}

/// Encodes a Linux `_IO(ty, nr)` request.
#[cfg(any(target_os = "linux", target_os = "android"))]
pub const fn io(ty: u8, nr: u8) -> u64 {
    ((ty as u64) << 8) | nr as u64
}

/// Encodes a BSD `_IOR(group, num, len)` request.
#[cfg(any(target_os = "macos", target_os = "ios", target_os = "freebsd"))]
pub const fn ior(group: u8, num: u8, len: usize) -> u64 {
    const IOC_OUT: u64 = 0x4000_0000;
    const IOCPARM_MASK: u64 = 0x1fff;

    IOC_OUT | (((len as u64) & IOCPARM_MASK) << 16) | ((group as u64) << 8) | num as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(all(target_os = "linux", target_arch = "x86_64"))]
    #[test]
    fn linux_block_requests() {
        assert_eq!(io(0x12, 104), 0x1268);
        assert_eq!(io(0x12, 123), 0x127b);
        assert_eq!(ior(0x12, 114, 8), 0x8008_1272);
    }

    #[cfg(any(target_os = "macos", target_os = "ios"))]
    #[test]
    fn darwin_disk_requests() {
        assert_eq!(ior(b'd', 24, 4), 0x4004_6418);
        assert_eq!(ior(b'd', 25, 8), 0x4008_6419);
        assert_eq!(ior(b'd', 77, 4), 0x4004_644d);
    }

    #[cfg(target_os = "freebsd")]
    #[test]
    fn freebsd_disk_requests() {
        assert_eq!(ior(b'd', 128, 4), 0x4004_6480);
        assert_eq!(ior(b'd', 129, 8), 0x4008_6481);
        assert_eq!(ior(b'd', 137, 256), 0x4100_6489);
    }
}
