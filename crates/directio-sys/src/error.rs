//! Error types shared by every directio layer.

/// Result type for directio operations.
pub type DirectIoResult<T> = Result<T, DirectIoError>;

/// Errors raised by the allocator, the platform routines and the task bridge.
///
/// The display text of every variant is the exact, fixed message callers
/// match on. Platform failures always name the call or condition that failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DirectIoError {
    /// Wrong arity, type or range. Raised before any work is queued.
    #[error("{0}")]
    BadArguments(&'static str),

    /// An allocator argument was rejected.
    #[error("{0}")]
    InvalidArgument(&'static str),

    /// The allocator could not satisfy the request.
    #[error("insufficient memory")]
    OutOfMemory,

    /// The operation does not exist on this platform.
    #[error("{0}")]
    UnsupportedPlatform(&'static str),

    /// The descriptor does not refer to a device.
    #[error("{0}")]
    InvalidDescriptor(&'static str),

    /// A non-blocking exclusive lock is held elsewhere.
    #[error("EWOULDBLOCK, the file is already locked")]
    AlreadyLocked,

    /// An underlying platform call failed.
    #[error("{call}")]
    Os {
        /// Names the failing call or condition.
        call: &'static str,
        /// `errno` (or `GetLastError`) captured right after the failure.
        errno: Option<i32>,
    },

    /// The unit of work did not run to completion.
    #[error("async work was cancelled")]
    Cancelled,
}

impl DirectIoError {
    /// Creates an `Os` error, capturing the calling thread's last OS error.
    pub fn last_os_error(call: &'static str) -> Self {
        Self::Os {
            call,
            errno: std::io::Error::last_os_error().raw_os_error(),
        }
    }

    /// Creates an `Os` error for a failed sanity check on a returned value.
    pub fn os(call: &'static str) -> Self {
        Self::Os { call, errno: None }
    }

    /// Returns true for errors raised synchronously on bad input.
    pub fn is_argument_error(&self) -> bool {
        matches!(self, Self::BadArguments(_) | Self::InvalidArgument(_))
    }

    /// Returns true for errors reported by the operating system.
    pub fn is_os_error(&self) -> bool {
        matches!(
            self,
            Self::Os { .. } | Self::AlreadyLocked | Self::InvalidDescriptor(_)
        )
    }

    /// Returns true if the work was cancelled before completing.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Returns the captured OS error code, if any.
    pub fn raw_os_error(&self) -> Option<i32> {
        match self {
            Self::Os { errno, .. } => *errno,
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_the_bare_message() {
        assert_eq!(
            DirectIoError::os("BLKSSZGET failed").to_string(),
            "BLKSSZGET failed"
        );
        assert_eq!(
            DirectIoError::AlreadyLocked.to_string(),
            "EWOULDBLOCK, the file is already locked"
        );
        assert_eq!(
            DirectIoError::Cancelled.to_string(),
            "async work was cancelled"
        );
        assert_eq!(DirectIoError::OutOfMemory.to_string(), "insufficient memory");
    }

    #[test]
    fn classification() {
        assert!(DirectIoError::BadArguments("x").is_argument_error());
        assert!(DirectIoError::InvalidArgument("x").is_argument_error());
        assert!(DirectIoError::AlreadyLocked.is_os_error());
        assert!(!DirectIoError::UnsupportedPlatform("x").is_os_error());
        assert!(DirectIoError::Cancelled.is_cancelled());
    }

    #[test]
    fn raw_os_error_only_on_os_variant() {
        let err = DirectIoError::Os {
            call: "SG_IO failed",
            errno: Some(5),
        };
        assert_eq!(err.raw_os_error(), Some(5));
        assert_eq!(DirectIoError::AlreadyLocked.raw_os_error(), None);
    }
}
