use thiserror::Error;

/// Why a remote fetch did not produce a usable payload.
///
/// All variants are recoverable: the cache manager falls back to stale or
/// bundled content instead of surfacing them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("Network unavailable: {0}")]
    NetworkUnavailable(String),

    #[error("Remote returned HTTP {status}")]
    RemoteHttp { status: u16 },

    #[error("Malformed payload: {0}")]
    MalformedPayload(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if let Some(status) = e.status() {
            FetchError::RemoteHttp {
                status: status.as_u16(),
            }
        } else if e.is_decode() {
            FetchError::MalformedPayload(e.to_string())
        } else {
            FetchError::NetworkUnavailable(e.to_string())
        }
    }
}

impl FetchError {
    pub fn from_status(status: reqwest::StatusCode) -> Self {
        FetchError::RemoteHttp {
            status: status.as_u16(),
        }
    }
}
