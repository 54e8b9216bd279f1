use std::time::Duration;

/// Errors returned by the backend HTTP endpoints (`/api`, `/api/topology`).
/// A 401 anywhere is the global unauthorized interrupt; everything else is
/// swallowed or degrades a derived flag.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    #[error("unauthorized")]
    Unauthorized,
    #[error("server returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("network error: {0}")]
    Network(String),
    #[error("invalid response body: {0}")]
    Decode(String),
    #[error("timeout after {0:?}")]
    Timeout(Duration),
}

impl ApiError {
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            401 => Self::Unauthorized,
            _ => Self::Status { status, body },
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }

    /// Short classification string for logging.
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::Unauthorized => "unauthorized",
            Self::Status { .. } => "status",
            Self::Network(_) => "network",
            Self::Decode(_) => "decode",
            Self::Timeout(_) => "timeout",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("transport is not connected")]
    NotConnected,
    #[error("transport closed")]
    Closed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_status_maps_401_to_unauthorized() {
        assert!(ApiError::from_status(401, "nope".into()).is_unauthorized());
        assert!(!ApiError::from_status(403, "forbidden".into()).is_unauthorized());
        assert_eq!(
            ApiError::from_status(500, "boom".into()),
            ApiError::Status {
                status: 500,
                body: "boom".into()
            }
        );
    }

    #[test]
    fn error_kind_strings() {
        assert_eq!(ApiError::Unauthorized.error_kind(), "unauthorized");
        assert_eq!(ApiError::Network("reset".into()).error_kind(), "network");
        assert_eq!(ApiError::Timeout(Duration::from_secs(5)).error_kind(), "timeout");
    }

    #[test]
    fn display_includes_status() {
        let err = ApiError::from_status(502, "bad gateway".into());
        assert_eq!(err.to_string(), "server returned 502: bad gateway");
    }
}
