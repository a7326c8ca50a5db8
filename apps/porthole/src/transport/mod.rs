use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use url::Url;

pub mod http;
pub mod mock;

pub use http::HttpTransport;
pub use mock::{MockHost, MockTransport};

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{method} {url} returned {status}")]
    HttpStatus {
        method: &'static str,
        url: Url,
        status: reqwest::StatusCode,
    },
    #[error("invalid url '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("transport closed")]
    Closed,
    #[error("{0}")]
    Other(String),
}

/// HTTP endpoints of a console host.
#[async_trait]
pub trait ConsoleTransport: Send + Sync {
    /// Posts an encoded event bag.
    async fn send_events(&self, payload: &str) -> Result<(), TransportError>;

    /// Long-polls the update endpoint and returns the raw response body.
    async fn poll_update(&self) -> Result<String, TransportError>;

    /// Fetches a sprite sheet. `url` is absolute.
    async fn fetch_image(&self, url: &Url) -> Result<Bytes, TransportError>;
}

/// The flush endpoint: the update URL with the EVENT_BAG marker appended.
pub fn event_url(update_url: &Url) -> Url {
    let mut url = update_url.clone();
    url.query_pairs_mut()
        .append_pair("event", &crate::protocol::EVENT_BAG.to_string());
    url
}

/// Resolves a possibly relative image URL against the update URL.
pub fn resolve_image_url(update_url: &Url, image_url: &str) -> Result<Url, TransportError> {
    update_url
        .join(image_url)
        .map_err(|source| TransportError::InvalidUrl {
            url: image_url.to_string(),
            source,
        })
}
