//! Calls shared by the Unix families: device check, `ioctl`, `flock`.
#![allow(unsafe_code)]

use std::mem::MaybeUninit;

use crate::{DirectIoError, DirectIoResult, Fd};

/// Fails unless `fd` refers to a block or character device.
///
/// FreeBSD exposes disks only as character devices, Linux as block devices.
/// Both are accepted.
pub fn ensure_device(fd: Fd) -> DirectIoResult<()> {
    let mut st = MaybeUninit::<libc::stat>::zeroed();
    // SAFETY: `st` is a writable `stat` buffer for the duration of the call.
    if unsafe { libc::fstat(fd.raw(), st.as_mut_ptr()) } == -1 {
        return Err(DirectIoError::last_os_error("fstat failed"));
    }
    // SAFETY: fstat succeeded, so the buffer is initialised.
    let st = unsafe { st.assume_init() };

    let kind = st.st_mode & libc::S_IFMT;
    if kind != libc::S_IFBLK && kind != libc::S_IFCHR {
        return Err(DirectIoError::InvalidDescriptor(
            "fd is not a block or character device",
        ));
    }
    Ok(())
}

/// Issues a control call that copies a `T` out of the kernel.
///
/// `request` must encode an argument of type `T`; `call` names the failure.
pub fn ioctl<T>(fd: Fd, request: u64, arg: &mut T, call: &'static str) -> DirectIoResult<()> {
    // SAFETY: `arg` is an exclusively borrowed, properly sized `T` for the
    // request, so the kernel writes stay in bounds.
    let rc = unsafe { libc::ioctl(fd.raw(), request as _, std::ptr::from_mut(arg)) };
    if rc != 0 {
        return Err(DirectIoError::last_os_error(call));
    }
    Ok(())
}

/// Takes (`true`) or releases (`false`) a non-blocking exclusive `flock`.
///
/// The lock lives with the open file description, so it goes away when the
/// caller closes the descriptor or the process exits.
pub fn set_advisory_lock(fd: Fd, enabled: bool) -> DirectIoResult<()> {
    let operation = if enabled {
        libc::LOCK_EX | libc::LOCK_NB
    } else {
        libc::LOCK_UN
    };
    // SAFETY: flock only inspects the descriptor number.
    if unsafe { libc::flock(fd.raw(), operation) } == 0 {
        return Ok(());
    }
    Err(flock_error(std::io::Error::last_os_error().raw_os_error()))
}

fn flock_error(errno: Option<i32>) -> DirectIoError {
    let call = match errno {
        Some(libc::EWOULDBLOCK) => return DirectIoError::AlreadyLocked,
        Some(libc::EBADF) => "EBADF, fd is an invalid file descriptor",
        Some(libc::EINTR) => "EINTR, the call was interrupted by a signal",
        Some(libc::EINVAL) => "EINVAL, fd does not refer to a file",
        Some(libc::ENOTSUP) => "ENOTSUP, fd is not of the correct type",
        _ => "unable to obtain an exclusive lock",
    };
    DirectIoError::Os { call, errno }
}

#[cfg(test)]
mod tests {
    use std::fs::File;
    use std::os::fd::AsRawFd;

    use test_case::test_case;

    use super::*;

    fn fd_of(file: &File) -> Fd {
        Fd::new(file.as_raw_fd()).unwrap()
    }

    #[test_case(libc::EBADF, "EBADF, fd is an invalid file descriptor")]
    #[test_case(libc::EINTR, "EINTR, the call was interrupted by a signal")]
    #[test_case(libc::EINVAL, "EINVAL, fd does not refer to a file")]
    #[test_case(libc::ENOTSUP, "ENOTSUP, fd is not of the correct type")]
    #[test_case(libc::EIO, "unable to obtain an exclusive lock")]
    fn flock_errors_are_named(errno: i32, message: &str) {
        let err = flock_error(Some(errno));
        assert_eq!(err.to_string(), message);
        assert_eq!(err.raw_os_error(), Some(errno));
    }

    #[test]
    fn would_block_means_already_locked() {
        assert_eq!(
            flock_error(Some(libc::EWOULDBLOCK)),
            DirectIoError::AlreadyLocked
        );
    }

    #[test]
    fn regular_file_is_not_a_device() {
        let file = tempfile::tempfile().unwrap();
        assert_eq!(
            ensure_device(fd_of(&file)),
            Err(DirectIoError::InvalidDescriptor(
                "fd is not a block or character device"
            ))
        );
    }

    #[test]
    fn dev_null_is_a_character_device() {
        let file = File::open("/dev/null").unwrap();
        assert_eq!(ensure_device(fd_of(&file)), Ok(()));
    }

    #[test]
    fn fstat_failure_is_named() {
        let err = ensure_device(Fd::new(i32::MAX).unwrap()).unwrap_err();
        assert_eq!(err.to_string(), "fstat failed");
        assert_eq!(err.raw_os_error(), Some(libc::EBADF));
    }

    #[test]
    fn exclusive_lock_excludes_second_descriptor() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("locked.dat");
        std::fs::write(&path, b"data").unwrap();
        let first = File::open(&path).unwrap();
        let second = File::open(&path).unwrap();

        set_advisory_lock(fd_of(&first), true).unwrap();
        assert_eq!(
            set_advisory_lock(fd_of(&second), true),
            Err(DirectIoError::AlreadyLocked)
        );

        set_advisory_lock(fd_of(&first), false).unwrap();
        set_advisory_lock(fd_of(&second), true).unwrap();
        set_advisory_lock(fd_of(&second), false).unwrap();
    }

    #[test]
    fn lock_on_bad_descriptor() {
        let err = set_advisory_lock(Fd::new(i32::MAX).unwrap(), true).unwrap_err();
        assert_eq!(err.to_string(), "EBADF, fd is an invalid file descriptor");
    }
}
