//! Status codes

use std::fmt;

/// 32-bit status code returned across the interface boundary.
///
/// Negative values are failures. The type doubles as the error type of the
/// safe wrappers, so `Result<T, HResult>` never carries a success code.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
#[error("{}", describe(.0))]
pub struct HResult(pub i32);

/// Success
pub const S_OK: HResult = HResult(0);
/// Success, with a "false" answer
pub const S_FALSE: HResult = HResult(1);
/// Not implemented
pub const E_NOTIMPL: HResult = HResult(0x8000_4001_u32 as i32);
/// The object does not support the requested interface
pub const E_NOINTERFACE: HResult = HResult(0x8000_4002_u32 as i32);
/// A required pointer argument was null
pub const E_POINTER: HResult = HResult(0x8000_4003_u32 as i32);
/// Unspecified failure
pub const E_FAIL: HResult = HResult(0x8000_4005_u32 as i32);
/// Allocation failed
pub const E_OUTOFMEMORY: HResult = HResult(0x8007_000e_u32 as i32);
/// The class does not support aggregation for this request
pub const CLASS_E_NOAGGREGATION: HResult = HResult(0x8004_0110_u32 as i32);

const NAMES: &[(HResult, &str)] = &[
    (S_OK, "S_OK"),
    (S_FALSE, "S_FALSE"),
    (E_NOTIMPL, "E_NOTIMPL"),
    (E_NOINTERFACE, "E_NOINTERFACE"),
    (E_POINTER, "E_POINTER"),
    (E_FAIL, "E_FAIL"),
    (E_OUTOFMEMORY, "E_OUTOFMEMORY"),
    (CLASS_E_NOAGGREGATION, "CLASS_E_NOAGGREGATION"),
];

fn describe(code: &i32) -> String {
    let hr = HResult(*code);
    match hr.name() {
        Some(name) => format!("{} ({:#010x})", name, code),
        None => format!("HRESULT {:#010x}", code),
    }
}

impl HResult {
    /// Raw code
    pub const fn code(self) -> i32 {
        self.0
    }

    /// Whether the code reports success
    pub const fn succeeded(self) -> bool {
        self.0 >= 0
    }

    /// Whether the code reports failure
    pub const fn failed(self) -> bool {
        self.0 < 0
    }

    /// `Ok(())` for success codes, `Err(self)` otherwise
    pub fn ok(self) -> Result<(), HResult> {
        if self.succeeded() {
            Ok(())
        } else {
            Err(self)
        }
    }

    /// Symbolic name of a well-known code
    pub fn name(self) -> Option<&'static str> {
        NAMES.iter().find(|(hr, _)| *hr == self).map(|(_, name)| *name)
    }
}

impl fmt::Debug for HResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HResult({})", describe(&self.0))
    }
}
