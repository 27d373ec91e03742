//! Client for the credential refresh endpoint.
//!
//! The refresh endpoint reads the session cookies, and on success replies with
//! `{"success": true, ...}` and a `Set-Cookie: accessToken=...` header carrying
//! the new bearer credential. It may also rotate the refresh credential the
//! same way.

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::header::{CONTENT_TYPE, COOKIE, SET_COOKIE};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use trawl_common::UpstreamConfig;
use trawl_common::cookie::{
    ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE, cookie_header, parse_set_cookie,
};

use crate::error::ClientError;
use crate::{RefreshedSession, SessionRefresher, build_http_client};

/// The part of the refresh endpoint's reply this client relies on.
#[derive(Debug, Deserialize)]
struct RefreshStatus {
    #[serde(default)]
    success: bool,
}

/// reqwest-backed [`SessionRefresher`].
#[derive(Debug, Clone)]
pub struct RefreshClient {
    client: reqwest::Client,
    refresh_url: url::Url,
}

impl RefreshClient {
    /// Create a client from the upstream configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the refresh URL cannot be parsed or the HTTP client
    /// fails to build.
    pub fn new(config: &UpstreamConfig) -> Result<Self, ClientError> {
        let refresh_url = url::Url::parse(&config.refresh_url).map_err(|e| {
            ClientError::ConfigurationError(format!(
                "Invalid refresh URL '{}': {e}",
                config.refresh_url
            ))
        })?;

        let client = build_http_client(config.timeout(), config.connect_timeout())?;

        Ok(Self {
            client,
            refresh_url,
        })
    }
}

#[async_trait]
impl SessionRefresher for RefreshClient {
    async fn refresh(
        &self,
        refresh_token: &SecretString,
        access_token: Option<&SecretString>,
    ) -> Result<RefreshedSession, ClientError> {
        let mut cookies = vec![(REFRESH_TOKEN_COOKIE, refresh_token.expose_secret())];
        if let Some(access_token) = access_token {
            cookies.push((ACCESS_TOKEN_COOKIE, access_token.expose_secret()));
        }

        debug!("POST {}", self.refresh_url);

        let response = self
            .client
            .post(self.refresh_url.clone())
            .header(CONTENT_TYPE, "application/json")
            .header(COOKIE, cookie_header(cookies))
            .body("{}")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!("Refresh endpoint returned status {}", status.as_u16());
            return Err(ClientError::RefreshRejected(format!(
                "refresh endpoint returned {status}"
            )));
        }

        // Collect before the body consumes the response.
        let issued: Vec<(String, String)> = response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .filter_map(parse_set_cookie)
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();

        let body = response.bytes().await?;
        let reply: RefreshStatus = serde_json::from_slice(&body).map_err(|e| {
            ClientError::RefreshRejected(format!("unreadable refresh response: {e}"))
        })?;

        if !reply.success {
            warn!("Refresh endpoint reported failure");
            return Err(ClientError::RefreshRejected(
                "refresh endpoint reported failure".to_string(),
            ));
        }

        let issued_cookie = |name: &str| {
            issued
                .iter()
                .rev()
                .find(|(key, value)| key == name && !value.is_empty())
                .map(|(_, value)| SecretString::from(value.clone()))
        };

        let access_token = issued_cookie(ACCESS_TOKEN_COOKIE).ok_or_else(|| {
            ClientError::RefreshRejected("refresh succeeded but issued no access token".to_string())
        })?;

        debug!("Refresh issued a new access token");

        Ok(RefreshedSession {
            access_token,
            refresh_token: issued_cookie(REFRESH_TOKEN_COOKIE),
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]

    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn create_client(server: &MockServer) -> RefreshClient {
        let config = UpstreamConfig::new(
            "http://127.0.0.1:1",
            format!("{}/api/refresh", server.uri()),
        );
        RefreshClient::new(&config).unwrap()
    }

    fn secret(value: &str) -> SecretString {
        SecretString::from(value.to_string())
    }

    #[tokio::test]
    async fn test_successful_refresh() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/refresh"))
            .and(header("cookie", "refreshToken=r-1"))
            .and(header("content-type", "application/json"))
            .respond_with(
                ResponseTemplate::new(200)
                    .append_header("Set-Cookie", "accessToken=fresh; Path=/; HttpOnly")
                    .set_body_json(json!({"success": true, "status": 200})),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = create_client(&mock_server);
        let refreshed = client.refresh(&secret("r-1"), None).await.unwrap();

        assert_eq!(refreshed.access_token.expose_secret(), "fresh");
        assert!(refreshed.refresh_token.is_none());
    }

    #[tokio::test]
    async fn test_rotated_refresh_token() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/refresh"))
            .and(header("cookie", "refreshToken=r-1; accessToken=stale"))
            .respond_with(
                ResponseTemplate::new(200)
                    .append_header("Set-Cookie", "accessToken=fresh; Path=/")
                    .append_header("Set-Cookie", "refreshToken=r-2; Path=/")
                    .set_body_json(json!({"success": true})),
            )
            .mount(&mock_server)
            .await;

        let client = create_client(&mock_server);
        let refreshed = client
            .refresh(&secret("r-1"), Some(&secret("stale")))
            .await
            .unwrap();

        assert_eq!(refreshed.access_token.expose_secret(), "fresh");
        assert_eq!(
            refreshed.refresh_token.as_ref().map(|t| t.expose_secret()),
            Some("r-2")
        );
    }

    #[tokio::test]
    async fn test_reported_failure_is_rejected() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/refresh"))
            .respond_with(
                ResponseTemplate::new(200)
                    .append_header("Set-Cookie", "accessToken=ignored")
                    .set_body_json(json!({"success": false, "status": 401})),
            )
            .mount(&mock_server)
            .await;

        let client = create_client(&mock_server);
        let err = client.refresh(&secret("r-1"), None).await.unwrap_err();

        assert!(matches!(err, ClientError::RefreshRejected(_)));
    }

    #[tokio::test]
    async fn test_error_status_is_rejected() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/refresh"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = create_client(&mock_server);
        let err = client.refresh(&secret("r-1"), None).await.unwrap_err();

        assert!(matches!(err, ClientError::RefreshRejected(_)));
    }

    #[tokio::test]
    async fn test_success_without_access_token_is_rejected() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/refresh"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
            .mount(&mock_server)
            .await;

        let client = create_client(&mock_server);
        let err = client.refresh(&secret("r-1"), None).await.unwrap_err();

        assert!(err.to_string().contains("no access token"));
    }
}
