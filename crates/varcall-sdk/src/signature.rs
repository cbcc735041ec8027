//! Call signatures
//!
//! The dispatch engine treats a signature as an opaque, immutable key: it
//! hashes and compares it to intern call sites and hands it to the stub
//! generator, nothing more. Generators read the parameter list to decide how
//! (and whether) to marshal.

use std::fmt;

/// Type of a parameter or return value at the native boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    /// No value (return position only)
    Void,
    /// Signed 8-bit integer
    I8,
    /// Unsigned 8-bit integer
    U8,
    /// Signed 16-bit integer
    I16,
    /// Unsigned 16-bit integer
    U16,
    /// Signed 32-bit integer
    I32,
    /// Unsigned 32-bit integer
    U32,
    /// Signed 64-bit integer
    I64,
    /// Unsigned 64-bit integer
    U64,
    /// Pointer-sized address
    Pointer,
    /// 32-bit float
    F32,
    /// 64-bit float
    F64,
    /// Aggregate passed by value
    Struct {
        /// Size in bytes
        size: u32,
        /// Alignment in bytes
        align: u32,
    },
}

impl ValueType {
    /// Whether values of this type travel in floating-point registers
    pub const fn is_float(self) -> bool {
        matches!(self, ValueType::F32 | ValueType::F64)
    }

    /// Whether this is a by-value aggregate
    pub const fn is_aggregate(self) -> bool {
        matches!(self, ValueType::Struct { .. })
    }

    /// Size in bytes on the current target
    pub const fn size(self) -> usize {
        match self {
            ValueType::Void => 0,
            ValueType::I8 | ValueType::U8 => 1,
            ValueType::I16 | ValueType::U16 => 2,
            ValueType::I32 | ValueType::U32 | ValueType::F32 => 4,
            ValueType::I64 | ValueType::U64 | ValueType::F64 => 8,
            ValueType::Pointer => std::mem::size_of::<usize>(),
            ValueType::Struct { size, .. } => size as usize,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Void => f.write_str("void"),
            ValueType::I8 => f.write_str("i8"),
            ValueType::U8 => f.write_str("u8"),
            ValueType::I16 => f.write_str("i16"),
            ValueType::U16 => f.write_str("u16"),
            ValueType::I32 => f.write_str("i32"),
            ValueType::U32 => f.write_str("u32"),
            ValueType::I64 => f.write_str("i64"),
            ValueType::U64 => f.write_str("u64"),
            ValueType::Pointer => f.write_str("ptr"),
            ValueType::F32 => f.write_str("f32"),
            ValueType::F64 => f.write_str("f64"),
            ValueType::Struct { size, align } => write!(f, "struct<{}, {}>", size, align),
        }
    }
}

/// Calling convention of the native target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallConv {
    /// Platform C convention, fixed arity
    C,
    /// Platform system convention (same as C everywhere but 32-bit Windows)
    System,
    /// C convention with a variable tail
    Variadic {
        /// Parameters before the ellipsis
        fixed: u16,
    },
}

/// Signature of a vararg or indirect native call site
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallSignature {
    conv: CallConv,
    params: Vec<ValueType>,
    ret: ValueType,
}

impl CallSignature {
    /// Create a signature with an explicit calling convention
    pub fn new(conv: CallConv, params: Vec<ValueType>, ret: ValueType) -> Self {
        if let CallConv::Variadic { fixed } = conv {
            debug_assert!(fixed as usize <= params.len());
        }
        CallSignature { conv, params, ret }
    }

    /// Fixed-arity C signature
    pub fn c(params: Vec<ValueType>, ret: ValueType) -> Self {
        Self::new(CallConv::C, params, ret)
    }

    /// Variadic signature as seen at one call site: the first `fixed`
    /// parameters are declared, the rest are this site's variable tail.
    pub fn variadic(fixed: u16, params: Vec<ValueType>, ret: ValueType) -> Self {
        Self::new(CallConv::Variadic { fixed }, params, ret)
    }

    /// Calling convention
    pub fn conv(&self) -> CallConv {
        self.conv
    }

    /// All parameters passed at the call site
    pub fn params(&self) -> &[ValueType] {
        &self.params
    }

    /// Return type
    pub fn ret(&self) -> ValueType {
        self.ret
    }

    /// Whether the target is variadic
    pub fn is_variadic(&self) -> bool {
        matches!(self.conv, CallConv::Variadic { .. })
    }

    /// Number of declared (non-variadic) parameters
    pub fn fixed_param_count(&self) -> usize {
        match self.conv {
            CallConv::Variadic { fixed } => fixed as usize,
            _ => self.params.len(),
        }
    }

    /// Number of parameters in the variable tail
    pub fn variadic_param_count(&self) -> usize {
        self.params.len() - self.fixed_param_count()
    }

    /// Whether any parameter or the return value is a by-value aggregate
    pub fn has_aggregates(&self) -> bool {
        self.ret.is_aggregate() || self.params.iter().any(|p| p.is_aggregate())
    }

    /// Number of floating-point parameters
    pub fn float_param_count(&self) -> usize {
        self.params.iter().filter(|p| p.is_float()).count()
    }

    /// Number of integer/pointer parameters
    pub fn integer_param_count(&self) -> usize {
        self.params
            .iter()
            .filter(|p| !p.is_float() && !p.is_aggregate())
            .count()
    }
}

impl fmt::Display for CallSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            if i == self.fixed_param_count() && self.is_variadic() {
                f.write_str("... ")?;
            }
            write!(f, "{}", param)?;
        }
        if self.is_variadic() && self.variadic_param_count() == 0 {
            if !self.params.is_empty() {
                f.write_str(", ")?;
            }
            f.write_str("...")?;
        }
        write!(f, ") -> {}", self.ret)
    }
}
