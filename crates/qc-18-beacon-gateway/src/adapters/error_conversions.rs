//! Error conversions into the client-facing [`ApiError`].
//!
//! Component errors stay free of HTTP concerns; the status code each one
//! maps to is decided here.

use crate::codec::EnvelopeError;
use crate::dispatch::VersionError;
use crate::domain::ApiError;
use crate::events::RelayError;
use crate::ports::UpstreamError;
use crate::state::StateFetchError;

impl From<StateFetchError> for ApiError {
    fn from(e: StateFetchError) -> Self {
        match e {
            StateFetchError::InvalidId(_) | StateFetchError::FutureSlot { .. } => {
                ApiError::bad_request(e.to_string())
            }
            StateFetchError::RootNotFound { .. } => ApiError::not_found(e.to_string()),
            StateFetchError::Provider(_) => ApiError::internal(e.to_string()),
        }
    }
}

impl From<EnvelopeError> for ApiError {
    fn from(e: EnvelopeError) -> Self {
        ApiError::internal(e.to_string())
    }
}

impl From<VersionError> for ApiError {
    fn from(e: VersionError) -> Self {
        ApiError::internal(e.to_string())
    }
}

impl From<UpstreamError> for ApiError {
    fn from(e: UpstreamError) -> Self {
        ApiError::internal(e.to_string())
    }
}

impl From<RelayError> for ApiError {
    fn from(e: RelayError) -> Self {
        ApiError::internal(e.to_string())
    }
}

impl From<std::io::Error> for ApiError {
    fn from(e: std::io::Error) -> Self {
        ApiError::internal(e.to_string())
    }
}
