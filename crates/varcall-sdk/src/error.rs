//! Error types for the varcall ABI

/// Result type returned by stub generators
pub type GenerationResult<T> = Result<T, GenerationError>;

/// Failure reported by a stub generator.
///
/// The dispatch engine never caches a failure and never retries; the error
/// reaches the original caller unchanged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    /// The generator could not allocate memory for the stub
    #[error("Out of memory while generating stub: {0}")]
    OutOfMemory(String),

    /// The signature needs marshaling the generator does not implement
    #[error("Unsupported signature: {0}")]
    UnsupportedSignature(String),

    /// The hidden argument does not denote a callable target
    #[error("Unresolved target: {0}")]
    UnresolvedTarget(String),

    /// Generator-specific failure
    #[error("{0}")]
    Generator(String),
}

impl From<String> for GenerationError {
    fn from(s: String) -> Self {
        GenerationError::Generator(s)
    }
}

impl From<&str> for GenerationError {
    fn from(s: &str) -> Self {
        GenerationError::Generator(s.to_string())
    }
}

/// Errors raised when encoding a hidden argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// Method descriptors must leave bit 0 free for the tag
    #[error("Method descriptor {0:#x} is not 2-byte aligned")]
    MisalignedMethod(usize),

    /// The top bit would be shifted out by the native tag
    #[error("Native target {0:#x} does not fit in a tagged word")]
    NativeAddressOverflow(usize),

    /// Null is neither a method nor a native target
    #[error("Null call target")]
    NullTarget,
}
