//! Public error type for the ledger.
//!
//! Internally the crate works with `anyhow` errors (`Re<T>`). At the boundary of a public
//! operation the error is classified with an `ErrorType` via `IntoResult::pub_result` so that a
//! caller can tell a storage failure from a rejected input.

use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Display, Formatter};

/// The result type used inside the crate.
pub(crate) type Re<T> = anyhow::Result<T>;

/// The result type of every public ledger operation.
pub type Result<T> = std::result::Result<T, Error>;

/// The category of failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    /// The store could not be opened or provisioned. Fatal to the session.
    Initialization,
    /// A single read, insert or upsert failed. The collection is unchanged.
    Storage,
    /// Input was rejected before any store mutation.
    Validation,
    /// The configuration file or home directory is missing or invalid.
    Config,
    /// A file outside the store (invoice, backup, CSV) could not be read or written.
    Io,
}

serde_plain::derive_display_from_serialize!(ErrorType);
serde_plain::derive_fromstr_from_deserialize!(ErrorType);

/// An error carrying its `ErrorType` and the underlying cause chain.
pub struct Error {
    error_type: ErrorType,
    inner: anyhow::Error,
}

impl Error {
    pub(crate) fn new(error_type: ErrorType, inner: impl Into<anyhow::Error>) -> Self {
        Self {
            error_type,
            inner: inner.into(),
        }
    }

    /// Creates a `Validation` error with the given message.
    pub(crate) fn validation(message: impl Display) -> Self {
        Self::new(ErrorType::Validation, anyhow::anyhow!("{message}"))
    }

    pub fn error_type(&self) -> ErrorType {
        self.error_type
    }

    pub fn is_validation(&self) -> bool {
        self.error_type == ErrorType::Validation
    }

    pub fn is_storage(&self) -> bool {
        self.error_type == ErrorType::Storage
    }
}

impl Debug for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} error: {:?}", self.error_type, self.inner)
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} error: {:#}", self.error_type, self.inner)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        let inner: &(dyn std::error::Error + 'static) = self.inner.as_ref();
        Some(inner)
    }
}

/// Converts an internal result into a public `Result` with the given `ErrorType`.
pub(crate) trait IntoResult<T> {
    fn pub_result(self, error_type: ErrorType) -> Result<T>;
}

impl<T, E> IntoResult<T> for std::result::Result<T, E>
where
    E: Into<anyhow::Error>,
{
    fn pub_result(self, error_type: ErrorType) -> Result<T> {
        self.map_err(|e| Error::new(error_type, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_pub_result_keeps_type_and_context() {
        let r: Re<()> = Err(anyhow::anyhow!("disk full")).context("Unable to insert supplier");
        let e = r.pub_result(ErrorType::Storage).unwrap_err();
        assert!(e.is_storage());
        let message = e.to_string();
        assert!(message.starts_with("storage error"));
        assert!(message.contains("Unable to insert supplier"));
        assert!(message.contains("disk full"));
    }

    #[test]
    fn test_validation_constructor() {
        let e = Error::validation("supplier name is required");
        assert_eq!(e.error_type(), ErrorType::Validation);
        assert!(e.to_string().contains("supplier name is required"));
    }

    #[test]
    fn test_source_chain_starts_at_outermost_context() {
        let r: Re<()> = Err(anyhow::anyhow!("disk full")).context("Unable to insert supplier");
        let e = r.pub_result(ErrorType::Storage).unwrap_err();

        let mut chain = Vec::new();
        let mut source = std::error::Error::source(&e);
        while let Some(cause) = source {
            chain.push(cause.to_string());
            source = cause.source();
        }
        assert_eq!(chain, vec!["Unable to insert supplier", "disk full"]);
    }
}
