//! Metadata and stream retrieval seam.
//!
//! [`MediaProvider`] abstracts the remote collaborator that resolves a video
//! ID to [`VideoMetadata`] and opens variant byte streams, enabling
//! testability. [`HttpMediaProvider`] is the production implementation: it
//! queries a JSON metadata resolver endpoint and opens variant URLs over
//! HTTP with a configured redirect limit.

use bytes::Bytes;
use futures::StreamExt;
use futures::stream::BoxStream;
use url::Url;

use crate::config::RequestConfig;
use crate::error::{Error, Result, TransferError};
use crate::types::{Quality, StreamVariant, VideoMetadata};

/// An open media byte stream plus its declared content length.
pub struct MediaStream {
    /// Content length declared by the transport, when known
    pub content_length: Option<u64>,
    /// The byte stream itself
    pub stream: BoxStream<'static, std::result::Result<Bytes, TransferError>>,
}

/// Abstraction over metadata retrieval and stream opening.
#[async_trait::async_trait]
pub trait MediaProvider: Send + Sync {
    /// Fetch metadata for `video_id` at the given quality hint.
    async fn fetch_metadata(&self, video_id: &str, quality: Quality) -> Result<VideoMetadata>;

    /// Open the byte stream of a previously selected variant.
    async fn open_stream(&self, variant: &StreamVariant) -> Result<MediaStream>;
}

/// Production [`MediaProvider`] backed by an HTTP metadata resolver.
#[derive(Debug)]
pub struct HttpMediaProvider {
    client: reqwest::Client,
    metadata_base: Url,
}

impl HttpMediaProvider {
    /// Create a provider for the resolver at `metadata_url`, honoring the
    /// configured redirect limit.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the URL does not parse, or a
    /// network error when the HTTP client cannot be constructed.
    pub fn new(metadata_url: &str, request: &RequestConfig) -> Result<Self> {
        let metadata_base = Url::parse(metadata_url).map_err(|e| Error::Config {
            message: format!("invalid metadata URL '{}': {}", metadata_url, e),
            key: Some("request.metadata_url".to_string()),
        })?;
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::limited(request.max_redirects))
            .build()?;
        Ok(Self {
            client,
            metadata_base,
        })
    }

    fn metadata_endpoint(&self, video_id: &str) -> Result<Url> {
        let mut url = self.metadata_base.clone();
        url.path_segments_mut()
            .map_err(|_| Error::Config {
                message: format!("metadata URL '{}' cannot carry a path", self.metadata_base),
                key: Some("request.metadata_url".to_string()),
            })?
            .push(video_id);
        Ok(url)
    }
}

#[async_trait::async_trait]
impl MediaProvider for HttpMediaProvider {
    async fn fetch_metadata(&self, video_id: &str, quality: Quality) -> Result<VideoMetadata> {
        let mut url = self.metadata_endpoint(video_id)?;
        url.query_pairs_mut()
            .append_pair("quality", &quality.to_string());

        let metadata = self
            .client
            .get(url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| Error::Metadata {
                video_id: video_id.to_string(),
                reason: e.to_string(),
            })?
            .json::<VideoMetadata>()
            .await
            .map_err(|e| Error::Metadata {
                video_id: video_id.to_string(),
                reason: format!("malformed metadata response: {}", e),
            })?;

        tracing::debug!(
            video_id = %video_id,
            variants = metadata.variants.len(),
            duration_secs = metadata.duration_secs,
            "Fetched video metadata"
        );
        Ok(metadata)
    }

    async fn open_stream(&self, variant: &StreamVariant) -> Result<MediaStream> {
        let response = self
            .client
            .get(&variant.url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| TransferError::Network(e.to_string()))?;

        let content_length = response.content_length();
        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| TransferError::Network(e.to_string())))
            .boxed();

        Ok(MediaStream {
            content_length,
            stream,
        })
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_endpoint_appends_the_video_id() {
        let provider = HttpMediaProvider::new(
            "https://resolver.example/api/videos",
            &RequestConfig::default(),
        )
        .unwrap();
        let url = provider.metadata_endpoint("dQw4w9WgXcQ").unwrap();
        assert_eq!(url.as_str(), "https://resolver.example/api/videos/dQw4w9WgXcQ");
    }

    #[test]
    fn invalid_metadata_url_is_a_config_error() {
        let err = HttpMediaProvider::new("not a url", &RequestConfig::default()).unwrap_err();
        match err {
            Error::Config { key, .. } => {
                assert_eq!(key.as_deref(), Some("request.metadata_url"));
            }
            other => panic!("expected Config error, got: {:?}", other),
        }
    }
}
