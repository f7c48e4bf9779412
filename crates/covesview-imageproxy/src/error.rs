use thiserror::Error;

/// Errors specific to serving an image proxy request. Kept distinct from
/// [`covesview_core::error::AppError`] because the proxy's failure modes
/// map onto HTTP statuses differently from the rest of the AppView's RPC
/// surface (plain-text bodies, 502s for upstream failures, etc.) — see
/// [`ImageProxyError::status_code`].
#[derive(Debug, Error)]
pub enum ImageProxyError {
    #[error("unknown preset")]
    UnknownPreset,
    #[error("malformed cid")]
    MalformedCid,
    #[error("could not resolve did: {0}")]
    DidUnresolved(String),
    #[error("blob not found")]
    BlobNotFound,
    #[error("upstream data server unreachable: {0}")]
    Upstream(String),
    #[error("could not decode image: {0}")]
    Decode(String),
    #[error("could not encode image: {0}")]
    Encode(String),
    #[error("cache io error: {0}")]
    Cache(String),
}

pub type ImageProxyResult<T> = Result<T, ImageProxyError>;

impl ImageProxyError {
    /// The HTTP status this error should be served as, per spec 4.9's error
    /// table.
    pub fn status_code(&self) -> u16 {
        match self {
            ImageProxyError::UnknownPreset | ImageProxyError::MalformedCid => 400,
            ImageProxyError::DidUnresolved(_) | ImageProxyError::Upstream(_) => 502,
            ImageProxyError::BlobNotFound => 404,
            ImageProxyError::Decode(_) => 400,
            ImageProxyError::Encode(_) | ImageProxyError::Cache(_) => 500,
        }
    }
}
