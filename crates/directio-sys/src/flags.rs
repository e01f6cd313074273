//! Open-flag constants for direct, synchronized and exclusive I/O.
//!
//! The values are what the host platform's `open` expects. A flag the
//! platform does not have is reported as `0`, so `flags | OPEN_FLAGS.exlock`
//! is always safe to compute.
//!
//! Some libc builds have shipped a wrong `O_DIRECT` for particular Linux
//! architectures, so those architectures use the kernel's own value.

/// Symbolic open flags mapped to this platform's numeric values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenFlags {
    /// Bypass the page cache (`O_DIRECT` / `FILE_FLAG_NO_BUFFERING`).
    pub direct: i32,
    /// Synchronized data-only writes (`O_DSYNC`).
    pub dsync: i32,
    /// Fail if the file exists (`O_EXCL`).
    pub excl: i32,
    /// Take an exclusive lock on open (`O_EXLOCK` / share mode 0).
    pub exlock: i32,
    /// Synchronized data and metadata writes (`O_SYNC`).
    pub sync: i32,
}

/// The process-wide flag table.
pub static OPEN_FLAGS: OpenFlags = OpenFlags::current();

impl OpenFlags {
    /// Flags for the platform this crate was built for.
    pub const fn current() -> Self {
        Self {
            direct: values::O_DIRECT,
            dsync: values::O_DSYNC,
            excl: values::O_EXCL,
            exlock: values::O_EXLOCK,
            sync: values::O_SYNC,
        }
    }

    /// `(name, value)` pairs in export order.
    pub fn entries(&self) -> [(&'static str, i32); 5] {
        [
            ("O_DIRECT", self.direct),
            ("O_DSYNC", self.dsync),
            ("O_EXCL", self.excl),
            ("O_EXLOCK", self.exlock),
            ("O_SYNC", self.sync),
        ]
    }

    /// Looks a flag up by its symbolic name.
    pub fn get(&self, name: &str) -> Option<i32> {
        self.entries()
            .into_iter()
            .find_map(|(n, v)| (n == name).then_some(v))
    }
}

impl Default for OpenFlags {
    fn default() -> Self {
        Self::current()
    }
}

// Windows values are the C-runtime mapping onto CreateFile flags:
// O_DIRECT > FILE_FLAG_NO_BUFFERING, O_DSYNC and O_SYNC > FILE_FLAG_WRITE_THROUGH,
// O_EXLOCK > share mode 0.
#[cfg(windows)]
mod values {
    pub const O_DIRECT: i32 = 0x0200_0000;
    pub const O_DSYNC: i32 = 0x0400_0000;
    pub const O_EXCL: i32 = 0x0400;
    pub const O_EXLOCK: i32 = 0x1000_0000;
    pub const O_SYNC: i32 = 0x0800_0000;
}

#[cfg(any(target_os = "linux", target_os = "android"))]
mod values {
    #[cfg(target_arch = "arm")]
    pub const O_DIRECT: i32 = 0x10000;
    #[cfg(target_arch = "m68k")]
    pub const O_DIRECT: i32 = 0x10000;
    #[cfg(any(target_arch = "mips", target_arch = "mips64"))]
    pub const O_DIRECT: i32 = 0x08000;
    #[cfg(any(target_arch = "powerpc", target_arch = "powerpc64"))]
    pub const O_DIRECT: i32 = 0x20000;
    #[cfg(any(target_arch = "s390x", target_arch = "x86_64"))]
    pub const O_DIRECT: i32 = 0x04000;
    #[cfg(not(any(
        target_arch = "arm",
        target_arch = "m68k",
        target_arch = "mips",
        target_arch = "mips64",
        target_arch = "powerpc",
        target_arch = "powerpc64",
        target_arch = "s390x",
        target_arch = "x86_64",
    )))]
    pub const O_DIRECT: i32 = libc::O_DIRECT;

    pub const O_DSYNC: i32 = libc::O_DSYNC;
    pub const O_EXCL: i32 = libc::O_EXCL;
    pub const O_EXLOCK: i32 = 0;
    pub const O_SYNC: i32 = libc::O_SYNC;
}

// Darwin has no O_DIRECT; cache bypass is per descriptor via F_NOCACHE.
#[cfg(any(target_os = "macos", target_os = "ios"))]
mod values {
    pub const O_DIRECT: i32 = 0;
    pub const O_DSYNC: i32 = libc::O_DSYNC;
    pub const O_EXCL: i32 = libc::O_EXCL;
    pub const O_EXLOCK: i32 = libc::O_EXLOCK;
    pub const O_SYNC: i32 = libc::O_SYNC;
}

#[cfg(target_os = "freebsd")]
mod values {
    pub const O_DIRECT: i32 = libc::O_DIRECT;
    pub const O_DSYNC: i32 = libc::O_DSYNC;
    pub const O_EXCL: i32 = libc::O_EXCL;
    pub const O_EXLOCK: i32 = libc::O_EXLOCK;
    pub const O_SYNC: i32 = libc::O_SYNC;
}

#[cfg(not(any(
    windows,
    target_os = "linux",
    target_os = "android",
    target_os = "macos",
    target_os = "ios",
    target_os = "freebsd",
)))]
mod values {
    pub const O_DIRECT: i32 = 0;
    pub const O_DSYNC: i32 = 0;
    pub const O_EXCL: i32 = 0;
    pub const O_EXLOCK: i32 = 0;
    pub const O_SYNC: i32 = 0;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_are_in_export_order() {
        let names: Vec<_> = OPEN_FLAGS.entries().iter().map(|(n, _)| *n).collect();
        assert_eq!(names, ["O_DIRECT", "O_DSYNC", "O_EXCL", "O_EXLOCK", "O_SYNC"]);
    }

    #[test]
    fn lookup_by_name() {
        assert_eq!(OPEN_FLAGS.get("O_EXCL"), Some(OPEN_FLAGS.excl));
        assert_eq!(OPEN_FLAGS.get("O_BOGUS"), None);
    }

    #[test]
    fn values_are_non_negative() {
        for (name, value) in OPEN_FLAGS.entries() {
            assert!(value >= 0, "{name} = {value}");
        }
    }

    #[cfg(all(target_os = "linux", target_arch = "x86_64"))]
    #[test]
    fn linux_x86_64_values() {
        assert_eq!(OPEN_FLAGS.direct, 0x4000);
        assert_eq!(OPEN_FLAGS.excl, libc::O_EXCL);
        assert_eq!(OPEN_FLAGS.exlock, 0);
    }

    #[cfg(any(target_os = "linux", target_os = "macos", target_os = "freebsd"))]
    #[test]
    fn excl_is_set_where_available() {
        assert_ne!(OPEN_FLAGS.excl, 0);
        assert_ne!(OPEN_FLAGS.sync, 0);
    }
}
