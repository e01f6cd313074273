//! Validation of dynamically typed arguments.
//!
//! Hosts that marshal calls from a dynamic language hand over a list of JSON
//! values. Every entry point checks arity and types here, synchronously,
//! before any work is queued.

use directio_sys::{DirectIoError, DirectIoResult, Operation};
use serde_json::Value;

use crate::AlignedBuffer;

const ALLOCATE_BAD_ARGUMENTS: &str = "bad arguments, expected: (size, alignment)";

/// Reads a non-negative integral number no larger than `i32::MAX`.
///
/// Floats are accepted when they hold an integral value, as a host number
/// type would be.
pub(crate) fn int_arg(value: &Value) -> Option<i32> {
    let n = value.as_f64()?;
    if !n.is_finite() || n < 0.0 || n.fract() != 0.0 || n > f64::from(i32::MAX) {
        return None;
    }
    Some(n as i32)
}

/// Allocates an [`AlignedBuffer`] from `(size, alignment)` arguments.
pub fn allocate_from_args(args: &[Value]) -> DirectIoResult<AlignedBuffer> {
    let bad = || DirectIoError::BadArguments(ALLOCATE_BAD_ARGUMENTS);
    let [size, alignment] = args else {
        return Err(bad());
    };
    let size = int_arg(size).ok_or_else(bad)?;
    let alignment = int_arg(alignment).ok_or_else(bad)?;
    AlignedBuffer::allocate(size as usize, alignment as usize)
}

/// A validated `(fd)` or `(fd, value)` argument list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Request {
    pub fd: i32,
    pub enabled: bool,
}

impl Request {
    pub fn parse(op: Operation, args: &[Value]) -> DirectIoResult<Self> {
        let bad = || DirectIoError::BadArguments(op.bad_arguments());

        if op.takes_value() {
            let [fd, value] = args else {
                return Err(bad());
            };
            let fd = int_arg(fd).ok_or_else(bad)?;
            let enabled = match int_arg(value) {
                Some(0) => false,
                Some(1) => true,
                _ => return Err(bad()),
            };
            Ok(Self { fd, enabled })
        } else {
            let [fd] = args else {
                return Err(bad());
            };
            let fd = int_arg(fd).ok_or_else(bad)?;
            Ok(Self { fd, enabled: false })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use test_case::test_case;

    #[test_case(json!(0), Some(0); "zero")]
    #[test_case(json!(4096), Some(4096); "integer")]
    #[test_case(json!(512.0), Some(512); "integral float")]
    #[test_case(json!(i32::MAX), Some(i32::MAX); "largest")]
    #[test_case(json!(i64::from(i32::MAX) + 1), None; "too large")]
    #[test_case(json!(-1), None; "negative")]
    #[test_case(json!(1.5), None; "fractional")]
    #[test_case(json!("4096"), None; "string")]
    #[test_case(json!(null), None; "null")]
    #[test_case(json!(true), None; "boolean")]
    fn int_argument(value: Value, expected: Option<i32>) {
        assert_eq!(int_arg(&value), expected);
    }

    #[test_case(&[]; "no arguments")]
    #[test_case(&[json!(4096)]; "one argument")]
    #[test_case(&[json!(4096), json!(4096), json!(1)]; "three arguments")]
    #[test_case(&[json!("4096"), json!(4096)]; "string size")]
    #[test_case(&[json!(4096), json!(-8)]; "negative alignment")]
    fn allocate_rejects_bad_shapes(args: &[Value]) {
        let err = allocate_from_args(args).unwrap_err();
        assert_eq!(err.to_string(), ALLOCATE_BAD_ARGUMENTS);
    }

    #[test]
    fn allocate_forwards_to_allocator() {
        let buf = allocate_from_args(&[json!(1024), json!(512)]).unwrap();
        assert_eq!(buf.len(), 1024);
        assert_eq!(buf.alignment(), 512);

        let err = allocate_from_args(&[json!(0), json!(512)]).unwrap_err();
        assert_eq!(err.to_string(), "size must not be 0");
    }

    #[test]
    fn parse_fd_only() {
        let op = Operation::QueryBlockDevice;
        assert_eq!(
            Request::parse(op, &[json!(3)]).unwrap(),
            Request {
                fd: 3,
                enabled: false
            }
        );
        for args in [vec![], vec![json!(3), json!(1)], vec![json!("3")]] {
            assert_eq!(
                Request::parse(op, &args).unwrap_err().to_string(),
                "bad arguments, expected: (fd, callback)"
            );
        }
    }

    #[test_case(json!(0), Some(false); "off")]
    #[test_case(json!(1), Some(true); "on")]
    #[test_case(json!(2), None; "two")]
    #[test_case(json!(true), None; "boolean is not a number")]
    #[test_case(json!(0.5), None; "half")]
    fn parse_value(value: Value, expected: Option<bool>) {
        let result = Request::parse(Operation::SetAdvisoryLock, &[json!(5), value]);
        match expected {
            Some(enabled) => assert_eq!(result.unwrap(), Request { fd: 5, enabled }),
            None => assert_eq!(
                result.unwrap_err().to_string(),
                "bad arguments, expected: (fd, value=0/1, callback)"
            ),
        }
    }
}
