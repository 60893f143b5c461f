use std::fmt;

use thiserror::Error;

/// Errors raised by source connectors.
///
/// [`ConnectorError::class`] reduces every variant to the four-way
/// taxonomy used for reporting.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectorError {
    /// The upstream service answered with HTTP 429.
    #[error("rate limit exceeded for {url}")]
    RateLimited {
        /// Request URL.
        url: String,
    },
    /// Timeouts or 5xx responses persisted across every retry.
    #[error("service unavailable at {url}: {reason}")]
    ServiceUnavailable {
        /// Request URL.
        url: String,
        /// Last failure observed.
        reason: String,
    },
    /// The upstream service rejected the request with a 4xx status.
    #[error("invalid request to {url} (HTTP {status}): {message}")]
    InvalidParameter {
        /// Request URL.
        url: String,
        /// HTTP status code.
        status: u16,
        /// Truncated response body.
        message: String,
    },
    /// Any other transport failure.
    #[error("request to {url} failed: {message}")]
    Other {
        /// Request URL.
        url: String,
        /// Transport error text.
        message: String,
    },
    /// The response could not be decoded into features.
    #[error("failed to decode response: {message}")]
    Decode {
        /// Decoder error text.
        message: String,
    },
    /// The source has no data for the requested area.
    #[error("no data found for area {area:?}")]
    NotFound {
        /// Requested area name.
        area: String,
    },
}

/// Coarse classification of [`ConnectorError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectorErrorClass {
    /// See [`ConnectorError::RateLimited`].
    RateLimited,
    /// See [`ConnectorError::ServiceUnavailable`].
    ServiceUnavailable,
    /// See [`ConnectorError::InvalidParameter`].
    InvalidParameter,
    /// Everything else.
    Other,
}

impl ConnectorError {
    /// Classify the error.
    #[must_use]
    pub const fn class(&self) -> ConnectorErrorClass {
        match self {
            Self::RateLimited { .. } => ConnectorErrorClass::RateLimited,
            Self::ServiceUnavailable { .. } => ConnectorErrorClass::ServiceUnavailable,
            Self::InvalidParameter { .. } => ConnectorErrorClass::InvalidParameter,
            Self::Other { .. } | Self::Decode { .. } | Self::NotFound { .. } => {
                ConnectorErrorClass::Other
            }
        }
    }

    /// Shorthand for a decode failure.
    #[must_use]
    pub fn decode(message: impl fmt::Display) -> Self {
        Self::Decode {
            message: message.to_string(),
        }
    }
}

impl fmt::Display for ConnectorErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::RateLimited => "rate_limited",
            Self::ServiceUnavailable => "service_unavailable",
            Self::InvalidParameter => "invalid_parameter",
            Self::Other => "connector_other",
        })
    }
}
