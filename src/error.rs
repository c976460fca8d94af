//! Typed error hierarchy for the endpoint-contracts crate.
//!
//! Two families of failure exist and they are kept apart on purpose:
//!
//! - [`ContractError`] aborts a run before anything is dispatched. It covers
//!   malformed contract configuration: an unreadable suite file, bad TOML, an
//!   unset environment variable, an invalid path expression, a header that
//!   cannot be sent, and so on.
//! - [`TransportError`] describes a request that was dispatched but produced
//!   no HTTP response (DNS, TCP, TLS, per-call timeout). The runner turns it
//!   into an error verdict for that one contract; it never aborts the suite.
//!
//! Assertion failures are not errors at all. They are collected into the
//! [`Verdict`](crate::verdict::Verdict).

use std::path::PathBuf;

/// Errors that stop a run before dispatch.
#[derive(Debug, thiserror::Error)]
pub enum ContractError {
    /// Suite-level configuration problem (missing base URL, unknown
    /// contract selected on the command line, etc.).
    #[error("configuration error: {0}")]
    Config(String),

    /// A single contract failed validation.
    #[error("invalid contract '{name}': {message}")]
    InvalidContract {
        /// Contract name as declared in the suite.
        name: String,
        /// What was wrong with it.
        message: String,
    },

    /// A JSON path expression could not be parsed.
    #[error("invalid JSON path '{path}': {message}")]
    InvalidPath {
        /// The expression as written.
        path: String,
        /// Parser diagnostic.
        message: String,
    },

    /// A `${VAR}` reference names a variable that is not set.
    #[error("environment variable '{0}' is not set")]
    MissingVariable(String),

    /// The suite file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// File that was being read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The suite file is not valid TOML or does not match the schema.
    #[error("failed to parse suite: {0}")]
    Toml(#[from] toml::de::Error),

    /// The HTTP client itself could not be constructed (TLS backend init).
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

/// Transport-level failures: the request never produced an HTTP status.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The per-call request timeout elapsed.
    #[error("request timed out: {0}")]
    Timeout(#[source] reqwest::Error),

    /// Connection could not be established (refused, DNS, TLS).
    #[error("connection failed: {0}")]
    Connect(#[source] reqwest::Error),

    /// Any other failure while sending or reading the body.
    #[error("request failed: {0}")]
    Request(#[source] reqwest::Error),

    /// The contract's JSON body could not be serialised.
    #[error("failed to encode request body: {0}")]
    Encode(#[source] serde_json::Error),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout(err)
        } else if err.is_connect() {
            TransportError::Connect(err)
        } else {
            TransportError::Request(err)
        }
    }
}

/// Convenience alias used throughout the library.
pub type Result<T> = std::result::Result<T, ContractError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn invalid_contract_displays_name_and_message() {
        let err = ContractError::InvalidContract {
            name: "roles without token".to_string(),
            message: "path must be relative".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("roles without token"));
        assert!(msg.contains("path must be relative"));
    }

    #[test]
    fn missing_variable_names_the_variable() {
        let err = ContractError::MissingVariable("PORTAL_TOKEN".to_string());
        assert!(err.to_string().contains("PORTAL_TOKEN"));
    }

    #[test]
    fn io_error_chains_source() {
        let err = ContractError::Io {
            path: PathBuf::from("suite.toml"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        assert!(err.to_string().contains("suite.toml"));
        assert!(err.source().is_some(), "Io should chain the io::Error");
    }

    #[test]
    fn toml_error_converts_via_from() {
        let parse_err = toml::from_str::<toml::Value>("= broken").unwrap_err();
        let err: ContractError = parse_err.into();
        assert!(err.to_string().contains("failed to parse suite"));
        assert!(err.source().is_some());
    }

    #[test]
    fn encode_error_chains_serde_source() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = TransportError::Encode(json_err);
        assert!(err.to_string().starts_with("failed to encode request body"));
        assert!(err.source().is_some());
    }

    #[test]
    fn errors_are_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ContractError>();
        assert_send_sync::<TransportError>();
    }
}
