//! HTTP downloader built on reqwest.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use tracing::{debug, warn};

use crate::blob::{capacity_hint, Blob};
use crate::config::PipelineConfig;
use crate::error::{IngestError, IngestResult};
use crate::progress::Progress;
use crate::queue::{RemoteDescriptor, RequestOptions};
use crate::BoxFuture;

use super::auth::{authorized_options, AuthHeader, TokenProvider};
use super::{ProgressCallback, RemoteFetcher};

/// Downloads files over HTTP(S), reporting progress per chunk.
pub struct HttpFetcher {
    client: Client,
    timeout: Duration,
    auth_header: AuthHeader,
    tokens: Option<Arc<dyn TokenProvider>>,
}

impl HttpFetcher {
    /// Create a fetcher using the configured timeout and auth scheme.
    pub fn new(config: &PipelineConfig) -> IngestResult<Self> {
        let client = Client::builder()
            .timeout(config.fetch_timeout)
            .build()
            .map_err(|e| IngestError::Client(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            timeout: config.fetch_timeout,
            auth_header: config.auth_header.clone(),
            tokens: None,
        })
    }

    /// Use a token provider for entries that require authentication.
    pub fn with_token_provider(mut self, tokens: Arc<dyn TokenProvider>) -> Self {
        self.tokens = Some(tokens);
        self
    }

    /// Request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn header_map(options: &RequestOptions) -> Result<HeaderMap, String> {
        let mut headers = HeaderMap::new();
        for (name, value) in &options.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| format!("invalid header name {}: {}", name, e))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| format!("invalid header value for {}: {}", name, e))?;
            headers.insert(name, value);
        }
        Ok(headers)
    }

    async fn download(
        &self,
        remote: &RemoteDescriptor,
        on_progress: &ProgressCallback,
    ) -> Result<Vec<u8>, String> {
        let options = authorized_options(
            &remote.options,
            remote.requires_auth_token,
            &self.auth_header,
            self.tokens.as_deref(),
        );
        let headers = Self::header_map(&options)?;

        let mut response = self
            .client
            .get(&remote.url)
            .headers(headers)
            .send()
            .await
            .map_err(|e| format!("request failed: {}", e))?;

        if !response.status().is_success() {
            return Err(format!("HTTP {}", response.status()));
        }

        let total = response.content_length();
        let mut body = Vec::with_capacity(capacity_hint(total.unwrap_or(0)));
        on_progress(Progress::from_bytes(0, total));

        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| format!("failed to read response: {}", e))?
        {
            body.extend_from_slice(&chunk);
            on_progress(Progress::from_bytes(body.len() as u64, total));
        }

        Ok(body)
    }
}

impl RemoteFetcher for HttpFetcher {
    fn fetch<'a>(
        &'a self,
        name: &'a str,
        remote: &'a RemoteDescriptor,
        on_progress: ProgressCallback,
    ) -> BoxFuture<'a, IngestResult<Blob>> {
        Box::pin(async move {
            match self.download(remote, &on_progress).await {
                Ok(body) => {
                    debug!(name = %name, url = %remote.url, bytes = body.len(), "Download complete");
                    Ok(Blob::new(name, body))
                }
                Err(reason) => {
                    warn!(name = %name, url = %remote.url, reason = %reason, "Download failed");
                    Err(IngestError::FetchFailure)
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::StaticToken;

    #[test]
    fn test_new_uses_config_timeout() {
        let config = PipelineConfig::default().with_fetch_timeout(Duration::from_secs(12));
        let fetcher = HttpFetcher::new(&config).unwrap();
        assert_eq!(fetcher.timeout(), Duration::from_secs(12));
    }

    #[test]
    fn test_header_map() {
        let options = RequestOptions::default()
            .with_header("Authorization", "Bearer abc")
            .with_header("X-Trace", "1");
        let headers = HttpFetcher::header_map(&options).unwrap();

        assert_eq!(headers["authorization"], "Bearer abc");
        assert_eq!(headers["x-trace"], "1");
    }

    #[test]
    fn test_header_map_rejects_invalid_name() {
        let options = RequestOptions::default().with_header("bad header", "x");
        assert!(HttpFetcher::header_map(&options).is_err());
    }

    #[tokio::test]
    async fn test_unreachable_host_is_generic_failure() {
        let config = PipelineConfig::default().with_fetch_timeout(Duration::from_secs(2));
        let fetcher = HttpFetcher::new(&config)
            .unwrap()
            .with_token_provider(Arc::new(StaticToken::new("abc")));
        let remote = RemoteDescriptor {
            url: "http://127.0.0.1:9/missing.vti".to_string(),
            options: RequestOptions::default(),
            requires_auth_token: true,
        };

        let err = fetcher
            .fetch("missing.vti", &remote, Box::new(|_: Progress| {}))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Failed to download file");
    }

    #[tokio::test]
    async fn test_oversized_content_length_fails_cleanly() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 1024];
            let _ = socket.read(&mut request).await;
            let _ = socket
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 35184372088832\r\n\r\npartial")
                .await;
        });

        let config = PipelineConfig::default().with_fetch_timeout(Duration::from_secs(5));
        let fetcher = HttpFetcher::new(&config).unwrap();
        let remote = RemoteDescriptor {
            url: format!("http://{}/huge.json", addr),
            options: RequestOptions::default(),
            requires_auth_token: false,
        };

        let result = fetcher
            .fetch("huge.json", &remote, Box::new(|_: Progress| {}))
            .await;
        assert!(matches!(result, Err(IngestError::FetchFailure)));
    }
}
