//! Error types for the store boundary and the pairing handshake.
//!
//! The engine itself has no error type: malformed raw values degrade to
//! zeros or named defaults instead of failing.

use reqwest::StatusCode;
use thiserror::Error;

/// Errors from the document store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The requested document does not exist (e.g. an unknown user id).
    #[error("not found: {0}")]
    NotFound(String),

    /// The request never completed (DNS, TLS, connect, timeout).
    #[error("connection error: {0}")]
    Connection(#[from] reqwest::Error),

    /// The store answered with a non-success status other than 404.
    #[error("request failed with {status}: {body}")]
    Request { status: StatusCode, body: String },
}

/// Errors from the device-pairing handshake.
#[derive(Debug, Error)]
pub enum PairingError {
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The watch task ended before a device wrote its user id.
    #[error("pairing watch closed before a device connected")]
    Closed,
}

/// An unrecognized chart-range selector.
#[derive(Debug, Error)]
#[error("unrecognized time range: {0:?} (expected a day count or \"all\")")]
pub struct ParseRangeError(pub String);
