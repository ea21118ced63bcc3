//
// Copyright (c) tsfdb contributors
// See License.txt for details
use thiserror::Error as ThisError;

pub type Result<T> = std::result::Result<T, Error>;

/// The two HTTP-style codes the facade ever returns, per the KV layout and
/// query contract: bad input is `400`, anything relating to the store being
/// unavailable or misconfigured is `503`.
#[derive(ThisError, Debug)]
pub enum Error {
    #[error("{0}")]
    Input(#[from] InputError),

    #[error("{0}")]
    NotReady(#[from] NotReadyError),

    #[error("StoreError# {0}")]
    Store(#[from] sled::Error),

    #[error("StoreError# {0}")]
    Transaction(String),
}

#[derive(ThisError, Debug)]
pub enum InputError {
    #[error("{0}")]
    BadTimeExpression(String),
    #[error("No metrics for regex: \"{0}\" were found")]
    EmptyRegexResult(String),
    #[error("invalid pattern: {0}")]
    InvalidPattern(String),
}

#[derive(ThisError, Debug)]
pub enum NotReadyError {
    #[error("{0} directory doesn't exist.")]
    MissingDirectory(String),
}

impl Error {
    /// Maps this error onto the two-code envelope described in the KV facade's
    /// error handling design: `InputError` is `400`, everything else is `503`.
    pub fn status_code(&self) -> u16 {
        match self {
            Error::Input(_) => 400,
            Error::NotReady(_) => 503,
            Error::Store(_) => 503,
            Error::Transaction(_) => 503,
        }
    }

    pub fn description(&self) -> String {
        self.to_string()
    }
}

impl<T> From<sled::transaction::TransactionError<T>> for Error
where
    T: std::fmt::Display,
{
    fn from(e: sled::transaction::TransactionError<T>) -> Self {
        Error::Transaction(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_input_errors_to_400() {
        let err = Error::from(InputError::EmptyRegexResult("cpu.*".into()));
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn maps_store_errors_to_503() {
        let err = Error::from(NotReadyError::MissingDirectory("metric_per_hour".into()));
        assert_eq!(err.status_code(), 503);
    }
}
