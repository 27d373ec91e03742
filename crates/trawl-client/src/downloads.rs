//! Client for the upstream downloads record store.
//!
//! Each call fetches a single page with `GET <base>/downloads?limit=<n>&page=<m>`,
//! authorized with the caller's bearer credential. The client never retries:
//! a failed page is reported to the caller as-is.
//!
//! # Response handling
//!
//! - **2xx with a JSON array body**: decoded into a [`Page`]
//! - **204 No Content**: [`PageFetch::NoContent`], the exhaustion signal
//! - **Non-2xx**: [`ClientError::UpstreamStatus`] mirroring status and reason
//! - **2xx with any other body**: [`ClientError::DecodeError`]
//!
//! The total record count is read from a configurable header
//! (`X-Total-Count` by default) and passed through verbatim.

use async_trait::async_trait;
use hyper::ext::ReasonPhrase;
use log::{debug, error};
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap};
use secrecy::{ExposeSecret, SecretString};

use trawl_common::{Page, Record, UpstreamConfig};

use crate::error::ClientError;
use crate::{PageFetch, RecordStore, build_http_client};

/// reqwest-backed [`RecordStore`] for the downloads collection.
///
/// The client is cheaply cloneable and can be shared across requests.
#[derive(Debug, Clone)]
pub struct DownloadsClient {
    client: reqwest::Client,
    downloads_url: url::Url,
    total_count_header: String,
}

impl DownloadsClient {
    /// Create a client from the upstream configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL cannot be parsed or the HTTP client
    /// fails to build.
    pub fn new(config: &UpstreamConfig) -> Result<Self, ClientError> {
        let raw = format!("{}/downloads", config.base_url.trim_end_matches('/'));
        let downloads_url = url::Url::parse(&raw).map_err(|e| {
            ClientError::ConfigurationError(format!("Invalid base URL '{}': {e}", config.base_url))
        })?;

        let client = build_http_client(config.timeout(), config.connect_timeout())?;

        Ok(Self {
            client,
            downloads_url,
            total_count_header: config.total_count_header.clone(),
        })
    }

    /// The URL requested for a given page.
    #[must_use]
    pub fn page_url(&self, limit: u32, page: u32) -> url::Url {
        let mut url = self.downloads_url.clone();
        url.query_pairs_mut()
            .append_pair("limit", &limit.to_string())
            .append_pair("page", &page.to_string());
        url
    }

    fn total_count(&self, headers: &HeaderMap) -> Option<String> {
        headers
            .get(self.total_count_header.as_str())
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
    }
}

#[async_trait]
impl RecordStore for DownloadsClient {
    async fn fetch_page(
        &self,
        token: &SecretString,
        limit: u32,
        page: u32,
    ) -> Result<PageFetch, ClientError> {
        let url = self.page_url(limit, page);
        debug!("GET {url}");

        let response = self
            .client
            .get(url)
            .header(AUTHORIZATION, format!("Bearer {}", token.expose_secret()))
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            error!(
                "Record store request for page {page} failed with status {}",
                status.as_u16()
            );
            let reason = response
                .extensions()
                .get::<ReasonPhrase>()
                .and_then(|reason| std::str::from_utf8(reason.as_bytes()).ok());
            return Err(ClientError::upstream(status, reason));
        }

        let total_count = self.total_count(response.headers());

        if status == StatusCode::NO_CONTENT {
            debug!("Record store returned no content for page {page}");
            return Ok(PageFetch::NoContent { total_count });
        }

        let body = response.bytes().await?;
        let records: Vec<Record> = serde_json::from_slice(&body)
            .map_err(|e| ClientError::DecodeError(format!("page {page}: {e}")))?;

        debug!("Page {page} returned {} records", records.len());

        Ok(PageFetch::Page(Page::new(records, total_count)))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]
    #![allow(clippy::panic)]

    use std::time::Duration;

    use super::*;
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn create_test_config(base_url: &str) -> UpstreamConfig {
        UpstreamConfig::new(base_url, "http://127.0.0.1:1/api/refresh")
    }

    fn token() -> SecretString {
        SecretString::from("test-token".to_string())
    }

    #[test]
    fn test_page_url() {
        let config = create_test_config("https://api.example.com/v1/");
        let client = DownloadsClient::new(&config).unwrap();
        assert_eq!(
            client.page_url(2500, 3).as_str(),
            "https://api.example.com/v1/downloads?limit=2500&page=3"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        let result = DownloadsClient::new(&create_test_config("not a url"));
        assert!(matches!(result, Err(ClientError::ConfigurationError(_))));
    }

    #[tokio::test]
    async fn test_successful_page() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/downloads"))
            .and(query_param("limit", "10"))
            .and(query_param("page", "2"))
            .and(header("authorization", "Bearer test-token"))
            .and(header("content-type", "application/json"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("X-Total-Count", "42")
                    .set_body_json(json!([
                        {"id": 1, "filename": "a.mkv", "size": 100},
                        {"id": 2, "filename": "b.mkv", "size": 200},
                    ])),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = DownloadsClient::new(&create_test_config(&mock_server.uri())).unwrap();
        let fetched = client.fetch_page(&token(), 10, 2).await.unwrap();

        let PageFetch::Page(page) = fetched else {
            panic!("expected a page, got {fetched:?}");
        };
        assert_eq!(page.len(), 2);
        assert_eq!(page.total_count.as_deref(), Some("42"));
        assert_eq!(page.records[1].get("size"), Some(&json!(200)));
    }

    #[tokio::test]
    async fn test_custom_total_count_header() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/downloads"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("X-Count", "7")
                    .set_body_json(json!([])),
            )
            .mount(&mock_server)
            .await;

        let config = create_test_config(&mock_server.uri()).with_total_count_header("X-Count");
        let client = DownloadsClient::new(&config).unwrap();

        let fetched = client.fetch_page(&token(), 10, 1).await.unwrap();
        assert_eq!(
            fetched,
            PageFetch::Page(Page::new(vec![], Some("7".to_string())))
        );
    }

    #[tokio::test]
    async fn test_no_content() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/downloads"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&mock_server)
            .await;

        let client = DownloadsClient::new(&create_test_config(&mock_server.uri())).unwrap();
        let fetched = client.fetch_page(&token(), 2500, 4).await.unwrap();

        assert_eq!(fetched, PageFetch::NoContent { total_count: None });
    }

    #[tokio::test]
    async fn test_upstream_error_status() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/downloads"))
            .respond_with(ResponseTemplate::new(401).set_body_string("token expired"))
            .mount(&mock_server)
            .await;

        let client = DownloadsClient::new(&create_test_config(&mock_server.uri())).unwrap();
        let err = client.fetch_page(&token(), 10, 1).await.unwrap_err();

        assert!(matches!(
            err,
            ClientError::UpstreamStatus { status: 401, ref status_text }
                if status_text == "Unauthorized"
        ));
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/downloads"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&mock_server)
            .await;

        let client = DownloadsClient::new(&create_test_config(&mock_server.uri())).unwrap();
        let err = client.fetch_page(&token(), 10, 1).await.unwrap_err();

        assert!(matches!(err, ClientError::DecodeError(_)));
    }

    #[tokio::test]
    async fn test_object_body_is_not_a_page() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/downloads"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": []})))
            .mount(&mock_server)
            .await;

        let client = DownloadsClient::new(&create_test_config(&mock_server.uri())).unwrap();
        let err = client.fetch_page(&token(), 10, 1).await.unwrap_err();

        assert!(matches!(err, ClientError::DecodeError(_)));
    }

    #[tokio::test]
    async fn test_timeout() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/downloads"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([]))
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&mock_server)
            .await;

        let config = create_test_config(&mock_server.uri()).with_timeout_seconds(1);
        let client = DownloadsClient::new(&config).unwrap();
        let err = client.fetch_page(&token(), 10, 1).await.unwrap_err();

        assert!(err.is_timeout(), "expected timeout, got {err:?}");
    }

    #[tokio::test]
    async fn test_custom_reason_phrase_is_kept() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0_u8; 4096];
            let _ = socket.read(&mut buf).await.unwrap();
            socket
                .write_all(
                    b"HTTP/1.1 503 Upstream Maintenance Window\r\n\
                      content-length: 0\r\n\
                      connection: close\r\n\r\n",
                )
                .await
                .unwrap();
            socket.shutdown().await.unwrap();
        });

        let client = DownloadsClient::new(&create_test_config(&format!("http://{addr}"))).unwrap();
        let err = client.fetch_page(&token(), 10, 1).await.unwrap_err();

        assert!(matches!(
            err,
            ClientError::UpstreamStatus { status: 503, ref status_text }
                if status_text == "Upstream Maintenance Window"
        ));
    }

    #[tokio::test]
    async fn test_connection_refused() {
        let uri = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            format!("http://{}", listener.local_addr().unwrap())
        };

        let client = DownloadsClient::new(&create_test_config(&uri)).unwrap();
        let err = client.fetch_page(&token(), 10, 1).await.unwrap_err();

        assert!(matches!(err, ClientError::NetworkError(_)));
    }
}
