//! Error kinds for tfgraph operations

use strum_macros::{Display, IntoStaticStr};

/// The kind of error that occurred.
///
/// Callers match on the kind to decide between skipping a handler, aborting one
/// provider's pipeline, or giving up on the whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoStaticStr, Display)]
#[non_exhaustive]
pub enum ErrorKind {
    // =========================================================================
    // General errors
    // =========================================================================
    /// An unexpected error occurred - catch-all for unhandled cases
    Unexpected,

    /// Invalid argument passed to function
    InvalidArgument,

    /// Internal invariant violation
    InvariantViolation,

    // =========================================================================
    // Pipeline errors
    // =========================================================================
    /// A handler's structural precondition does not hold (e.g. no parent of the
    /// expected type exists). Recoverable: the handler is skipped.
    MissingResource,

    /// A handler produced (or was about to produce) nodes without required metadata.
    MetadataInconsistency,

    // =========================================================================
    // Provider errors
    // =========================================================================
    /// Provider detection was required to be unambiguous and was not
    ProviderDetection,

    /// No provider registered under the requested name or alias
    UnknownProvider,

    /// A provider name or alias collides with a registered provider
    ProviderConflict,

    /// Registration attempted after detection or a pipeline run started
    RegistrySealed,

    /// Invalid provider configuration or handler declaration
    ConfigInvalid,

    // =========================================================================
    // File/IO errors
    // =========================================================================
    /// File not found
    FileNotFound,

    /// IO operation failed
    IoFailed,

    // =========================================================================
    // Serialization errors
    // =========================================================================
    /// Serialization failed
    SerializationFailed,

    /// Deserialization failed
    DeserializationFailed,
}

impl ErrorKind {
    /// Returns the error kind as a static string
    pub fn as_str(&self) -> &'static str {
        (*self).into()
    }

    /// Errors a pipeline can recover from by skipping the failing handler.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ErrorKind::MissingResource)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_display() {
        assert_eq!(ErrorKind::MissingResource.to_string(), "MissingResource");
        assert_eq!(ErrorKind::ConfigInvalid.as_str(), "ConfigInvalid");
    }

    #[test]
    fn test_recoverable_kinds() {
        assert!(ErrorKind::MissingResource.is_recoverable());
        assert!(!ErrorKind::MetadataInconsistency.is_recoverable());
        assert!(!ErrorKind::ConfigInvalid.is_recoverable());
    }
}
