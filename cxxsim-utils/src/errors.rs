//! Errors generated by the compiler.

use std::fmt;

/// Convenience wrapper representing a fallible computation.
pub type SimResult<T> = Result<T, Error>;

/// Errors surfaced to the user. Invariant violations that indicate a bug
/// upstream of the backend are asserts, not `Error`s.
pub enum Error {
    /// A construct the backend cannot translate.
    Unsupported(String),
    /// The input file is invalid in some way.
    InvalidFile(String),
    /// An output stream could not be written.
    WriteError(String),
    /// The input netlist could not be parsed.
    Parse(String),
    /// Miscellaneous configuration error.
    Misc(String),
}

impl Error {
    pub fn unsupported<S: ToString>(msg: S) -> Self {
        Error::Unsupported(msg.to_string())
    }

    pub fn invalid_file<S: ToString>(msg: S) -> Self {
        Error::InvalidFile(msg.to_string())
    }

    pub fn write_error<S: ToString>(msg: S) -> Self {
        Error::WriteError(msg.to_string())
    }

    pub fn parse<S: ToString>(msg: S) -> Self {
        Error::Parse(msg.to_string())
    }

    pub fn misc<S: ToString>(msg: S) -> Self {
        Error::Misc(msg.to_string())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Unsupported(msg) => write!(f, "unsupported: {}", msg),
            Error::InvalidFile(msg) => write!(f, "invalid file: {}", msg),
            Error::WriteError(msg) => write!(f, "write error: {}", msg),
            Error::Parse(msg) => write!(f, "parse error: {}", msg),
            Error::Misc(msg) => write!(f, "{}", msg),
        }
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::WriteError(err.to_string())
    }
}

impl From<std::fmt::Error> for Error {
    fn from(err: std::fmt::Error) -> Self {
        Error::WriteError(err.to_string())
    }
}
