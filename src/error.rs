//! Error type shared by the codec layer, the worker and the session.
//!
//! Per-file failures inside a running batch are flattened into
//! [`ConversionError`](crate::job::ConversionError) using this type's
//! `Display` text, so messages here are written for end users.

use std::path::PathBuf;

use libwebp_sys::WebPEncodingError;

/// Errors produced while preparing or running a conversion.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The source file does not exist.
    #[error("file not found")]
    NotFound,

    /// The source file exists but holds no bytes.
    #[error("source file is empty")]
    EmptySource,

    /// A filesystem operation failed.
    #[error("{action} {}: {source}", path.display())]
    Io {
        /// What was being attempted, e.g. "failed to read".
        action: &'static str,
        /// The path the operation was applied to.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The image could not be decoded.
    #[error("cannot decode image: {0}")]
    Decode(#[from] image::ImageError),

    /// The WebP input could not be decoded by libwebp.
    #[error("cannot decode WebP data")]
    WebPDecode,

    /// Animated WebP input is not supported as a conversion source.
    #[error("animated WebP input is not supported")]
    AnimatedWebP,

    /// The pixel buffer is not in a layout the encoder accepts.
    #[error("unsupported pixel layout: {0}")]
    UnsupportedLayout(String),

    /// libwebp rejected the encoder configuration.
    #[error("invalid encoder configuration")]
    InvalidConfig,

    /// libwebp failed while encoding.
    #[error("WebP encoding failed: {0:?}")]
    Encode(WebPEncodingError),

    /// Quality must lie in `1..=100`.
    #[error("quality must be between 1 and 100, got {0}")]
    InvalidQuality(u8),

    /// A job needs at least one file.
    #[error("no files to convert")]
    EmptyQueue,

    /// A conversion is already running in this session.
    #[error("a conversion is already running")]
    Busy,
}

impl Error {
    /// Wrap an I/O error, mapping a missing file to [`Error::NotFound`].
    pub(crate) fn io(action: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            return Self::NotFound;
        }

        Self::Io {
            action,
            path: path.into(),
            source,
        }
    }
}

/// Result alias using the crate [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_missing_file_maps_to_not_found() {
        let err = Error::io("failed to read", "a.png", io::Error::from(io::ErrorKind::NotFound));
        assert!(matches!(err, Error::NotFound));
        assert_eq!(err.to_string(), "file not found");
    }

    #[test]
    fn test_other_io_errors_keep_path_and_action() {
        let err = Error::io(
            "failed to read",
            "dir/a.png",
            io::Error::from(io::ErrorKind::PermissionDenied),
        );
        let msg = err.to_string();
        assert!(msg.starts_with("failed to read dir/a.png"), "{msg}");
    }
}
