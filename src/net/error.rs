//! Failure taxonomy for one fetch cycle.
//!
//! None of these are fatal: the cycle is dropped, state stays as it was, and
//! the next timer tick tries again.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    /// Connection refused, reset, DNS failure, ...
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with a non-2xx status.
    #[error("{endpoint} returned {status}")]
    Status {
        endpoint: &'static str,
        status: reqwest::StatusCode,
    },

    /// The body was not the JSON shape we expect.
    #[error("malformed payload from {endpoint}: {source}")]
    Malformed {
        endpoint: &'static str,
        #[source]
        source: serde_json::Error,
    },
}
