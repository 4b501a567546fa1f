//! Error types for hub protocol decoding.
//!
//! Every error raised while decoding is local to a single `feed` call: the
//! assembler resets, the offending bytes are attached to the error, and the
//! next chunk is processed from a clean state.
//!
//! ## Error Categories
//!
//! - **Framing Errors**: Checksum mismatch, malformed escapes, truncated frames
//! - **Structural Errors**: TLV or record lengths that overrun their container
//! - **Config Errors**: Invalid or unreadable configuration
//! - **I/O Errors**: Failures reported by a chunk source
//!
//! Unknown page or advertisement subtypes are not errors at all; they are
//! dropped so newer hub firmware keeps working with older hosts.
//!
//! ```rust
//! use sensorhub::{ErrorKind, HubError};
//!
//! let error = HubError::framing("checksum mismatch", vec![0x7E, 0x01, 0x7F]);
//! assert_eq!(error.kind(), ErrorKind::Framing);
//! assert_eq!(error.offending_bytes(), Some(&[0x7E, 0x01, 0x7F][..]));
//! ```

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for hub operations.
pub type Result<T, E = HubError> = std::result::Result<T, E>;

/// Main error type for hub decoding.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum HubError {
    #[error("Framing error: {reason}")]
    Framing { reason: String, bytes: Vec<u8> },

    #[error("Structural error in {context}: {details}")]
    Structural { context: String, details: String, bytes: Vec<u8> },

    #[error("Invalid configuration: {reason}")]
    Config {
        reason: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Chunk source I/O error")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("Operation timed out after {duration:?}")]
    Timeout { duration: Duration },
}

/// Coarse classification of a [`HubError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Framing,
    Structural,
    Config,
    Io,
    Timeout,
}

impl HubError {
    /// Helper constructor for framing errors.
    pub fn framing(reason: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        HubError::Framing { reason: reason.into(), bytes: bytes.into() }
    }

    /// Helper constructor for structural errors.
    pub fn structural(
        context: impl Into<String>,
        details: impl Into<String>,
        bytes: impl Into<Vec<u8>>,
    ) -> Self {
        HubError::Structural {
            context: context.into(),
            details: details.into(),
            bytes: bytes.into(),
        }
    }

    /// Helper constructor for configuration errors.
    pub fn config(reason: impl Into<String>) -> Self {
        HubError::Config { reason: reason.into(), path: None, source: None }
    }

    /// Helper constructor for configuration errors tied to a file.
    pub fn config_file(
        path: PathBuf,
        reason: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        HubError::Config { reason: reason.into(), path: Some(path), source: Some(source) }
    }

    /// Attach the merged frame bytes to a structural error raised deeper down.
    pub fn with_bytes(self, frame: &[u8]) -> Self {
        match self {
            HubError::Structural { context, details, .. } => {
                HubError::Structural { context, details, bytes: frame.to_vec() }
            }
            HubError::Framing { reason, .. } => HubError::Framing { reason, bytes: frame.to_vec() },
            other => other,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            HubError::Framing { .. } => ErrorKind::Framing,
            HubError::Structural { .. } => ErrorKind::Structural,
            HubError::Config { .. } => ErrorKind::Config,
            HubError::Io { .. } => ErrorKind::Io,
            HubError::Timeout { .. } => ErrorKind::Timeout,
        }
    }

    /// Bytes that triggered the error, when the error came out of decoding.
    pub fn offending_bytes(&self) -> Option<&[u8]> {
        match self {
            HubError::Framing { bytes, .. } | HubError::Structural { bytes, .. } => {
                Some(bytes.as_slice())
            }
            _ => None,
        }
    }

    /// Returns whether this error is potentially recoverable through retry.
    ///
    /// Decode errors are never retried: the bytes are gone and the assembler
    /// has already resynchronised.
    pub fn is_retryable(&self) -> bool {
        match self {
            HubError::Io { .. } => true,
            HubError::Timeout { .. } => true,
            HubError::Framing { .. } => false,
            HubError::Structural { .. } => false,
            HubError::Config { .. } => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
          #[test]
          fn decode_errors_carry_their_bytes(
            reason in ".*",
            bytes in prop::collection::vec(any::<u8>(), 0..64)
          ) {
            let framing = HubError::framing(reason.clone(), bytes.clone());
            prop_assert!(framing.to_string().contains(&reason));
            prop_assert_eq!(framing.offending_bytes(), Some(bytes.as_slice()));

            let structural = HubError::structural("tlv walk", reason.clone(), bytes.clone());
            prop_assert!(structural.to_string().contains("tlv walk"));
            prop_assert_eq!(structural.offending_bytes(), Some(bytes.as_slice()));
          }
        }
    }

    #[test]
    fn kinds_and_retry_classification() {
        let io: HubError = std::io::Error::other("port closed").into();
        assert_eq!(io.kind(), ErrorKind::Io);
        assert!(io.is_retryable());
        assert!(io.offending_bytes().is_none());

        let framing = HubError::framing("bad checksum", vec![1, 2]);
        assert_eq!(framing.kind(), ErrorKind::Framing);
        assert!(!framing.is_retryable());

        let config = HubError::config("perimeter must be positive");
        assert_eq!(config.kind(), ErrorKind::Config);
        assert!(!config.is_retryable());
    }

    #[test]
    fn with_bytes_replaces_record_bytes_with_frame() {
        let err = HubError::structural("ble record", "overrun", vec![9]);
        let err = err.with_bytes(&[1, 2, 3]);
        assert_eq!(err.offending_bytes(), Some(&[1, 2, 3][..]));
    }

    #[test]
    fn error_traits_validation() {
        fn assert_send_sync_static<T: Send + Sync + 'static>() {}
        assert_send_sync_static::<HubError>();
    }
}
