//! API request handlers

mod bindings;
mod catalog;
mod health;
mod instances;

pub use bindings::*;
pub use catalog::*;
pub use health::*;
pub use instances::*;

use axum::body::Bytes;
use serde::de::DeserializeOwned;

use crate::error::BrokerError;

/// Decode a JSON request body; an empty body reads as the default value
pub(crate) fn parse_body<T: DeserializeOwned + Default>(body: &Bytes) -> Result<T, BrokerError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| BrokerError::MalformedBody(e.to_string()))
}
