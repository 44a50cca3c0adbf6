/*!
 * Variadic Argument Bridge
 *
 * `va_start` / `va_arg` / `va_end` over an explicit argument slice.
 *
 * Call sites pass their variable arguments as `VaArg` values, built with the
 * `va_args!` macro so the C default argument promotions apply (narrow
 * integers widen to `int`, `float` widens to `double`). The callee walks them
 * with an `ArgList`, naming the expected type at each step.
 *
 * The expected types must match the promoted call-site types argument for
 * argument; that is the caller's obligation. The bridge still checks what it
 * can: a request that is not a same-width reinterpretation of the stored
 * value fails with `InvalidArgument`, and types that C promotes away (`f32`,
 * `i8`, `u16`, ...) cannot be requested at all.
 */

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::errors::{PosixError, PosixResult};

/// One promoted variadic argument
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum VaArg {
    Int(i32),
    UInt(u32),
    Long(i64),
    ULong(u64),
    Double(f64),
    Ptr(usize),
}

impl VaArg {
    pub fn type_name(&self) -> &'static str {
        match self {
            VaArg::Int(_) => "int",
            VaArg::UInt(_) => "unsigned int",
            VaArg::Long(_) => "long",
            VaArg::ULong(_) => "unsigned long",
            VaArg::Double(_) => "double",
            VaArg::Ptr(_) => "pointer",
        }
    }
}

impl fmt::Display for VaArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VaArg::Int(v) => write!(f, "{}", v),
            VaArg::UInt(v) => write!(f, "{}", v),
            VaArg::Long(v) => write!(f, "{}", v),
            VaArg::ULong(v) => write!(f, "{}", v),
            VaArg::Double(v) => write!(f, "{}", v),
            VaArg::Ptr(v) => write!(f, "{:#x}", v),
        }
    }
}

macro_rules! promote {
    ($($from:ty => $variant:ident as $to:ty),* $(,)?) => {
        $(
            impl From<$from> for VaArg {
                #[inline]
                fn from(v: $from) -> Self {
                    VaArg::$variant(v as $to)
                }
            }
        )*
    };
}

promote! {
    i8 => Int as i32,
    i16 => Int as i32,
    i32 => Int as i32,
    u8 => Int as i32,
    u16 => Int as i32,
    u32 => UInt as u32,
    i64 => Long as i64,
    isize => Long as i64,
    u64 => ULong as u64,
    f32 => Double as f64,
    f64 => Double as f64,
}

impl From<bool> for VaArg {
    #[inline]
    fn from(v: bool) -> Self {
        VaArg::Int(v as i32)
    }
}

impl From<usize> for VaArg {
    /// `usize` travels as a pointer-sized value
    #[inline]
    fn from(v: usize) -> Self {
        VaArg::Ptr(v)
    }
}

impl<T> From<*const T> for VaArg {
    #[inline]
    fn from(p: *const T) -> Self {
        VaArg::Ptr(p as usize)
    }
}

impl<T> From<*mut T> for VaArg {
    #[inline]
    fn from(p: *mut T) -> Self {
        VaArg::Ptr(p as usize)
    }
}

/// Types `ArgList::arg` can produce
///
/// Implemented only for types that survive the default promotions.
pub trait FromVaArg: Sized {
    const TYPE_NAME: &'static str;

    fn from_va_arg(arg: VaArg) -> Option<Self>;
}

impl FromVaArg for i32 {
    const TYPE_NAME: &'static str = "int";

    fn from_va_arg(arg: VaArg) -> Option<Self> {
        match arg {
            VaArg::Int(v) => Some(v),
            VaArg::UInt(v) => Some(v as i32),
            _ => None,
        }
    }
}

impl FromVaArg for u32 {
    const TYPE_NAME: &'static str = "unsigned int";

    fn from_va_arg(arg: VaArg) -> Option<Self> {
        match arg {
            VaArg::UInt(v) => Some(v),
            VaArg::Int(v) => Some(v as u32),
            _ => None,
        }
    }
}

impl FromVaArg for i64 {
    const TYPE_NAME: &'static str = "long";

    fn from_va_arg(arg: VaArg) -> Option<Self> {
        match arg {
            VaArg::Long(v) => Some(v),
            VaArg::ULong(v) => Some(v as i64),
            VaArg::Ptr(v) => Some(v as i64),
            _ => None,
        }
    }
}

impl FromVaArg for u64 {
    const TYPE_NAME: &'static str = "unsigned long";

    fn from_va_arg(arg: VaArg) -> Option<Self> {
        match arg {
            VaArg::ULong(v) => Some(v),
            VaArg::Long(v) => Some(v as u64),
            VaArg::Ptr(v) => Some(v as u64),
            _ => None,
        }
    }
}

impl FromVaArg for f64 {
    const TYPE_NAME: &'static str = "double";

    fn from_va_arg(arg: VaArg) -> Option<Self> {
        match arg {
            VaArg::Double(v) => Some(v),
            _ => None,
        }
    }
}

impl FromVaArg for usize {
    const TYPE_NAME: &'static str = "pointer";

    fn from_va_arg(arg: VaArg) -> Option<Self> {
        match arg {
            VaArg::Ptr(v) => Some(v),
            VaArg::Long(v) => Some(v as usize),
            VaArg::ULong(v) => Some(v as usize),
            _ => None,
        }
    }
}

/// Collect call-site arguments into a `Vec<VaArg>`, applying promotions
///
/// ```
/// use posix_compat::va_args;
/// use posix_compat::varargs::VaArg;
///
/// let args = va_args![1u8, 2.5f32, -3i64];
/// assert_eq!(args, vec![VaArg::Int(1), VaArg::Double(2.5), VaArg::Long(-3)]);
/// ```
#[macro_export]
macro_rules! va_args {
    () => {
        ::std::vec::Vec::<$crate::varargs::VaArg>::new()
    };
    ($($arg:expr),+ $(,)?) => {
        ::std::vec![$($crate::varargs::VaArg::from($arg)),+]
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Cursor {
    #[default]
    Idle,
    Started,
    Ended,
}

/// `va_list`
///
/// Must be started exactly once before the first `arg` and ended exactly
/// once after the last; any other order is reported as `InvalidArgument`.
#[derive(Debug, Clone, Default)]
pub struct ArgList {
    cursor: Cursor,
    origin: u32,
    pos: usize,
    args: Vec<VaArg>,
}

impl ArgList {
    pub fn new() -> Self {
        Self::default()
    }

    /// `va_start`: `origin` identifies the last fixed parameter of the call site
    pub fn start(&mut self, origin: u32, rest: impl Into<Vec<VaArg>>) -> PosixResult<()> {
        if self.cursor == Cursor::Started {
            return Err(PosixError::invalid("va_start on an active argument list"));
        }
        self.cursor = Cursor::Started;
        self.origin = origin;
        self.pos = 0;
        self.args = rest.into();
        Ok(())
    }

    /// `va_arg`: take the next argument as `T`
    pub fn arg<T: FromVaArg>(&mut self) -> PosixResult<T> {
        self.ensure_started("va_arg")?;

        let Some(&next) = self.args.get(self.pos) else {
            return Err(PosixError::invalid(format!(
                "va_arg past the last argument (index {})",
                self.pos
            )));
        };

        let value = T::from_va_arg(next).ok_or_else(|| {
            PosixError::invalid(format!(
                "va_arg type mismatch at index {}: requested {}, passed {}",
                self.pos,
                T::TYPE_NAME,
                next.type_name()
            ))
        })?;
        self.pos += 1;
        Ok(value)
    }

    /// `va_end`
    pub fn end(&mut self) -> PosixResult<()> {
        self.ensure_started("va_end")?;
        self.cursor = Cursor::Ended;
        self.origin = 0;
        self.pos = 0;
        self.args.clear();
        Ok(())
    }

    /// `va_copy`: duplicate `src` including its position
    ///
    /// The copy is independent and must be ended on its own.
    pub fn copy_from(&mut self, src: &ArgList) -> PosixResult<()> {
        src.ensure_started("va_copy")?;
        if self.cursor == Cursor::Started {
            return Err(PosixError::invalid("va_copy into an active argument list"));
        }
        *self = src.clone();
        Ok(())
    }

    /// Arguments not yet consumed, for forwarding to a `v*` callee
    pub fn args(&self) -> PosixResult<&[VaArg]> {
        self.ensure_started("va_args")?;
        Ok(&self.args[self.pos..])
    }

    #[inline]
    pub fn origin(&self) -> u32 {
        self.origin
    }

    fn ensure_started(&self, op: &str) -> PosixResult<()> {
        match self.cursor {
            Cursor::Started => Ok(()),
            Cursor::Idle => Err(PosixError::invalid(format!("{} before va_start", op))),
            Cursor::Ended => Err(PosixError::invalid(format!("{} after va_end", op))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_promotions() {
        assert_eq!(VaArg::from(b'x'), VaArg::Int(120));
        assert_eq!(VaArg::from(-2i16), VaArg::Int(-2));
        assert_eq!(VaArg::from(true), VaArg::Int(1));
        assert_eq!(VaArg::from(1.5f32), VaArg::Double(1.5));
        assert_eq!(VaArg::from(7u32), VaArg::UInt(7));
    }

    #[test]
    fn test_walk_arguments() {
        let mut va = ArgList::new();
        va.start(2, va_args![10i32, 2.5f64, 99u64]).unwrap();

        assert_eq!(va.origin(), 2);
        assert_eq!(va.arg::<i32>().unwrap(), 10);
        assert_eq!(va.args().unwrap(), &[VaArg::Double(2.5), VaArg::ULong(99)]);
        assert_eq!(va.arg::<f64>().unwrap(), 2.5);
        assert_eq!(va.arg::<u64>().unwrap(), 99);
        assert!(va.arg::<i32>().is_err());
        va.end().unwrap();
    }

    #[test]
    fn test_same_width_reinterpretation() {
        let mut va = ArgList::new();
        va.start(0, va_args![-1i32, 0x1000usize]).unwrap();
        assert_eq!(va.arg::<u32>().unwrap(), u32::MAX);
        assert_eq!(va.arg::<u64>().unwrap(), 0x1000);
        va.end().unwrap();
    }

    #[test]
    fn test_mismatch_does_not_advance() {
        let mut va = ArgList::new();
        va.start(0, va_args![3.0f64]).unwrap();

        let err = va.arg::<i32>().unwrap_err();
        assert!(matches!(err, PosixError::InvalidArgument(ref m) if m.contains("double")));
        assert_eq!(va.arg::<f64>().unwrap(), 3.0);
    }

    #[test]
    fn test_protocol_misuse() {
        let mut va = ArgList::new();
        assert!(va.arg::<i32>().is_err());
        assert!(va.end().is_err());

        va.start(0, va_args![1i32]).unwrap();
        assert!(va.start(0, va_args![]).is_err());
        va.end().unwrap();

        assert!(va.arg::<i32>().is_err());
        assert!(va.end().is_err());
        // Restart after end is allowed
        va.start(1, va_args![5i32]).unwrap();
        assert_eq!(va.arg::<i32>().unwrap(), 5);
    }

    #[test]
    fn test_copy_is_independent() {
        let mut src = ArgList::new();
        src.start(0, va_args![1i32, 2i32, 3i32]).unwrap();
        src.arg::<i32>().unwrap();

        let mut dst = ArgList::new();
        dst.copy_from(&src).unwrap();
        assert_eq!(dst.arg::<i32>().unwrap(), 2);
        assert_eq!(dst.arg::<i32>().unwrap(), 3);
        dst.end().unwrap();

        assert_eq!(src.arg::<i32>().unwrap(), 2);
        src.end().unwrap();
    }
}
