#![allow(non_shorthand_field_patterns)]
#![doc = "Error handling primitives shared across the injector crate."]
// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
//
// SPDX-License-Identifier: MIT

//! The derive emitted by [`masterror::Error`] expands pattern matches that
//! trigger the `non_shorthand_field_patterns` lint. The lint is disabled for
//! the module to keep the generated implementations warning-free.
//!
//! Most failures in the injection pipeline are recovered locally and never
//! reach a caller. The variants below surface where a caller can act on them:
//! loading settings, writing the stored template, or evaluating a malformed
//! selector.

use std::path::{Path, PathBuf};

/// Unified error type returned by the library and the CLI.
#[derive(Debug, masterror::Error)]
pub enum Error {
    /// Wraps I/O errors raised while reading or writing local files.
    #[error("failed to access {path:?}: {source}")]
    Io {
        /// Location of the file being accessed.
        path:   PathBuf,
        /// Underlying I/O error.
        source: std::io::Error
    },
    /// Wraps YAML decoding errors for engine settings.
    #[error("failed to parse settings: {source}")]
    Parse {
        /// Source decoding error from serde_yaml.
        source: serde_yaml::Error
    },
    /// Returned when a value violates documented invariants.
    #[error("invalid configuration: {message}")]
    Validation {
        /// Human readable message describing the validation problem.
        message: String
    },
    /// Wraps JSON encoding and decoding errors.
    #[error("failed to process JSON: {source}")]
    Serialize {
        /// Underlying serde_json error.
        source: serde_json::Error
    },
    /// Returned when a workspace template cannot be rendered.
    #[error("template error: {message}")]
    Template {
        /// Human readable message describing the template problem.
        message: String
    },
    /// Returned when a CSS or XPath selector cannot be evaluated.
    #[error("invalid selector {selector:?}: {message}")]
    Selector {
        /// Selector source text.
        selector: String,
        /// Human readable message describing the parse failure.
        message:  String
    },
    /// Returned when the backing key-value store is unavailable or fails.
    #[error("storage error: {message}")]
    Store {
        /// Human readable message describing the storage failure.
        message: String
    },
    /// Wraps URL parsing errors.
    #[error("invalid URL: {source}")]
    Url {
        /// Underlying parse error reported by the url crate.
        source: url::ParseError
    }
}

impl Error {
    /// Constructs a validation error from the provided message.
    pub fn validation<M>(message: M) -> Self
    where
        M: Into<String>
    {
        Self::Validation {
            message: message.into()
        }
    }

    /// Constructs a template error from the provided message.
    pub fn template<M>(message: M) -> Self
    where
        M: Into<String>
    {
        Self::Template {
            message: message.into()
        }
    }

    /// Constructs a storage error from the provided message.
    pub fn store<M>(message: M) -> Self
    where
        M: Into<String>
    {
        Self::Store {
            message: message.into()
        }
    }

    /// Constructs a selector error for the given selector text.
    ///
    /// # Parameters
    ///
    /// * `selector` - Source text of the selector that failed to parse.
    /// * `message` - Human-readable description of the failure.
    pub fn selector<S, M>(selector: S, message: M) -> Self
    where
        S: Into<String>,
        M: Into<String>
    {
        Self::Selector {
            selector: selector.into(),
            message:  message.into()
        }
    }

    /// Formats the error for diagnostics without the variant name.
    ///
    /// The returned string matches the [`std::fmt::Display`] implementation.
    pub fn to_display_string(&self) -> String {
        format!("{self}")
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(source: serde_yaml::Error) -> Self {
        Self::Parse {
            source
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(source: serde_json::Error) -> Self {
        Self::Serialize {
            source
        }
    }
}

impl From<url::ParseError> for Error {
    fn from(source: url::ParseError) -> Self {
        Self::Url {
            source
        }
    }
}

/// Creates an [`Error::Io`] variant capturing the failing path and source.
///
/// # Parameters
///
/// * `path` - Location of the file that triggered the error.
/// * `source` - I/O error reported by the operating system.
pub fn io_error(path: &Path, source: std::io::Error) -> Error {
    Error::Io {
        path: path.to_path_buf(),
        source
    }
}
