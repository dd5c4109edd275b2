/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::fmt;

/// A boxed error that is `Send` and `Sync`.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors returned by the harness runtime.
///
/// These cover everything that prevents tests from running at all — bad
/// configuration, an unreachable server, missing data files, log sink I/O.
/// Individual test failures are not errors; they become FAIL records, see
/// [`crate::runner::TestFailure`].
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    source: BoxError,
}

/// General categories of harness errors.
#[derive(Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// Required configuration is missing or unparsable
    Config,

    /// The server under test could not be reached or rejected the credentials
    ServerUnreachable,

    /// A test payload could not be produced
    Data,

    /// I/O errors
    IOError,

    /// Some kind of internal runtime issue (task failure, serialization, etc)
    RuntimeError,
}

impl Error {
    /// Creates a new harness [`Error`] from a known kind of error as well as
    /// an arbitrary error source.
    pub fn new<E>(kind: ErrorKind, err: E) -> Error
    where
        E: Into<BoxError>,
    {
        Error {
            kind,
            source: err.into(),
        }
    }

    /// Returns the corresponding [`ErrorKind`] for this error.
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ErrorKind::Config => write!(f, "invalid configuration"),
            ErrorKind::ServerUnreachable => write!(f, "server under test unreachable"),
            ErrorKind::Data => write!(f, "test data unavailable"),
            ErrorKind::IOError => write!(f, "I/O error"),
            ErrorKind::RuntimeError => write!(f, "runtime error"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.source.as_ref())
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Self::new(ErrorKind::IOError, value)
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(value: tokio::task::JoinError) -> Self {
        Self::new(ErrorKind::RuntimeError, value)
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        Self::new(ErrorKind::RuntimeError, value)
    }
}

pub(crate) fn invalid_config<E>(err: E) -> Error
where
    E: Into<BoxError>,
{
    Error::new(ErrorKind::Config, err)
}

pub(crate) fn server_unreachable<E>(err: E) -> Error
where
    E: Into<BoxError>,
{
    Error::new(ErrorKind::ServerUnreachable, err)
}

pub(crate) fn data_unavailable<E>(err: E) -> Error
where
    E: Into<BoxError>,
{
    Error::new(ErrorKind::Data, err)
}

/// Render an error and its full cause chain into one line.
///
/// Used for the `error` field of FAIL records, where the chain is the only
/// context an operator gets.
pub(crate) fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut out = err.to_string();
    let mut cause = err.source();
    while let Some(err) = cause {
        out.push_str(": ");
        out.push_str(&err.to_string());
        cause = err.source();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_chain_includes_all_causes() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err = Error::new(ErrorKind::Data, io);
        let rendered = error_chain(&err);
        assert!(rendered.starts_with("test data unavailable"));
        assert!(rendered.contains("no such file"));
    }

    #[test]
    fn kind_is_preserved() {
        let err = invalid_config("SERVER_ENDPOINT must be set");
        assert_eq!(err.kind(), &ErrorKind::Config);
    }
}
