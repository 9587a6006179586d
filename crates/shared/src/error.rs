use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error payload carried by non-2xx responses from the customers API.
///
/// The client treats `code` as opaque. Client-side failures (transport,
/// decoding) are expressed with the same shape so that every failure can be
/// stored and rendered the same way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{message}")]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}
