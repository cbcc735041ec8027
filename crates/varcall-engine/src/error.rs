//! Engine error types

use varcall_sdk::{CallSiteKind, EntryPoint, GenerationError};

/// Failure of one slow-path resolution, propagated unchanged to the caller
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    /// The stub generator reported a failure
    #[error(transparent)]
    Generation(#[from] GenerationError),

    /// The generator returned an entry point the target cannot execute
    #[error("Generator returned misaligned entry point {entry} for {kind} site {site:#x}")]
    InvalidEntryPoint {
        /// Address of the call-site descriptor
        site: usize,
        /// Site kind
        kind: CallSiteKind,
        /// The rejected entry point
        entry: EntryPoint,
    },
}

/// Errors raised while setting up a bridge
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// Config file could not be read
    #[error("Failed to read config {path}: {source}")]
    ConfigIo {
        /// Path that was attempted
        path: String,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// Config document is not valid
    #[error("Invalid config: {0}")]
    ConfigParse(#[from] toml::de::Error),
}
