//! Unified error type for daopub.
//!
//! Every module funnels its failures into [`Error`]. The variants follow the
//! failure modes of a publishing run: a missing call number directory, remote
//! metadata that cannot be fetched or parsed, an external converter exiting
//! non-zero, filesystem failures, and invariant violations around the shared
//! EAD document.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

/// Unified error type covering all failure modes in daopub.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A required directory or entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of entity (e.g. "call number directory").
        entity: String,
        /// The identifier or path that was looked up.
        id: String,
    },

    /// Descriptive metadata could not be fetched or lacked required nodes.
    #[error("Metadata unavailable for {id}: {reason}")]
    MetadataUnavailable {
        /// Component or collection id the lookup was for.
        id: String,
        /// Human-readable cause.
        reason: String,
    },

    /// An external converter, transform or PDF assembler failed.
    #[error("Tool error [{tool}]: {message}")]
    ExternalTool {
        /// Name of the tool that failed.
        tool: String,
        /// Exit code, when the process ran to completion.
        status: Option<i32>,
        /// Captured standard error of the process.
        stderr: String,
        /// Human-readable error description.
        message: String,
    },

    /// A filesystem operation failed.
    #[error("IO error at {}: {source}", path.display())]
    FileSystem {
        /// The path being operated on.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A document changed underneath a serialized read-modify-write.
    ///
    /// EAD mutations are serialized per collection, so observing this means
    /// another process wrote the file during the run.
    #[error("Concurrent modification of {}", path.display())]
    ConcurrentMutation {
        /// The document that changed.
        path: PathBuf,
    },

    /// An XML document could not be parsed.
    #[error("Invalid document {}: {message}", path.display())]
    InvalidDocument {
        /// Path or URL of the document.
        path: PathBuf,
        /// Parser message.
        message: String,
    },

    /// Image renumbering stopped partway through a batch.
    #[error(
        "Sequencing stopped at {}: {reason} (last assigned index {last_assigned})",
        file.display()
    )]
    Sequence {
        /// Source file that could not be moved.
        file: PathBuf,
        /// Highest index present in the destination when the batch stopped.
        last_assigned: u32,
        /// Human-readable cause.
        reason: String,
    },

    /// Configuration or argument validation failed.
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Stable, serializable label for an [`Error`] variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    MetadataUnavailable,
    ExternalToolFailure,
    FileSystemError,
    ConcurrentMutationConflict,
    InvalidDocument,
    SequenceFailure,
    Validation,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::MetadataUnavailable => "metadata_unavailable",
            ErrorKind::ExternalToolFailure => "external_tool_failure",
            ErrorKind::FileSystemError => "file_system_error",
            ErrorKind::ConcurrentMutationConflict => "concurrent_mutation_conflict",
            ErrorKind::InvalidDocument => "invalid_document",
            ErrorKind::SequenceFailure => "sequence_failure",
            ErrorKind::Validation => "validation",
        };
        f.write_str(label)
    }
}

impl Error {
    /// The kind label of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NotFound { .. } => ErrorKind::NotFound,
            Error::MetadataUnavailable { .. } => ErrorKind::MetadataUnavailable,
            Error::ExternalTool { .. } => ErrorKind::ExternalToolFailure,
            Error::FileSystem { .. } => ErrorKind::FileSystemError,
            Error::ConcurrentMutation { .. } => ErrorKind::ConcurrentMutationConflict,
            Error::InvalidDocument { .. } => ErrorKind::InvalidDocument,
            Error::Sequence { .. } => ErrorKind::SequenceFailure,
            Error::Validation(_) => ErrorKind::Validation,
        }
    }

    /// Convenience constructor for [`Error::NotFound`].
    pub fn not_found(entity: impl Into<String>, id: impl fmt::Display) -> Self {
        Error::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Convenience constructor for [`Error::MetadataUnavailable`].
    pub fn metadata(id: impl fmt::Display, reason: impl Into<String>) -> Self {
        Error::MetadataUnavailable {
            id: id.to_string(),
            reason: reason.into(),
        }
    }

    /// Convenience constructor for an [`Error::ExternalTool`] that never
    /// produced an exit status (spawn failure, timeout).
    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Error::ExternalTool {
            tool: tool.into(),
            status: None,
            stderr: String::new(),
            message: message.into(),
        }
    }

    /// Convenience constructor for [`Error::FileSystem`].
    pub fn fs(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::FileSystem {
            path: path.into(),
            source,
        }
    }

    /// Convenience constructor for [`Error::InvalidDocument`].
    pub fn invalid_document(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Error::InvalidDocument {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Convenience constructor for [`Error::Validation`].
    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation(message.into())
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Attach the offending path to a bare `std::io::Result`.
pub trait IoResultExt<T> {
    /// Convert an I/O error into [`Error::FileSystem`] for `path`.
    fn at_path(self, path: impl AsRef<Path>) -> Result<T>;
}

impl<T> IoResultExt<T> for std::io::Result<T> {
    fn at_path(self, path: impl AsRef<Path>) -> Result<T> {
        self.map_err(|source| Error::fs(path.as_ref(), source))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_display() {
        let err = Error::not_found("call number directory", "C9999");
        assert_eq!(err.to_string(), "call number directory not found: C9999");
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn metadata_display() {
        let err = Error::metadata("C0022/c0031", "no unittitle");
        assert_eq!(
            err.to_string(),
            "Metadata unavailable for C0022/c0031: no unittitle"
        );
        assert_eq!(err.kind(), ErrorKind::MetadataUnavailable);
    }

    #[test]
    fn tool_display() {
        let err = Error::tool("java", "timed out after 5s");
        assert_eq!(err.to_string(), "Tool error [java]: timed out after 5s");
        assert_eq!(err.kind(), ErrorKind::ExternalToolFailure);
    }

    #[test]
    fn io_result_ext_keeps_path() {
        let io: std::io::Result<()> = Err(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "denied",
        ));
        let err = io.at_path("/srv/eads/mss/C0022.EAD.xml").unwrap_err();
        match &err {
            Error::FileSystem { path, .. } => {
                assert_eq!(path, Path::new("/srv/eads/mss/C0022.EAD.xml"))
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.to_string().contains("denied"));
    }

    #[test]
    fn sequence_display_reports_last_index() {
        let err = Error::Sequence {
            file: PathBuf::from("/in/batch/scan_07.jp2"),
            last_assigned: 9,
            reason: "destination exists".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("scan_07.jp2"));
        assert!(msg.contains("last assigned index 9"));
    }

    #[test]
    fn kind_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorKind::ExternalToolFailure).unwrap();
        assert_eq!(json, "\"external_tool_failure\"");
        assert_eq!(ErrorKind::FileSystemError.to_string(), "file_system_error");
    }
}
