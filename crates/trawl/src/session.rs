//! Request-scoped session credentials and the credential guard.
//!
//! Every inbound request carries a [`Session`] built from its cookies. The
//! [`CredentialGuard`] makes sure a bearer credential exists before any
//! record-store call, refreshing it at most once per request.

use std::sync::Arc;

use log::{debug, warn};
use secrecy::{ExposeSecret, SecretString};

use trawl_client::{RefreshedSession, SessionRefresher};
use trawl_common::cookie::{ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE, cookie_value, set_cookie};

use crate::error::ProxyError;

/// Credentials carried by a single inbound request.
///
/// Credentials issued by a refresh are written back here so the response can
/// hand them to the client.
#[derive(Debug, Default)]
pub struct Session {
    access_token: Option<SecretString>,
    refresh_token: Option<SecretString>,
    access_issued: bool,
    refresh_issued: bool,
}

impl Session {
    /// Creates a session from already extracted credentials.
    #[must_use]
    pub const fn new(
        access_token: Option<SecretString>,
        refresh_token: Option<SecretString>,
    ) -> Self {
        Self {
            access_token,
            refresh_token,
            access_issued: false,
            refresh_issued: false,
        }
    }

    /// Builds a session from a `Cookie` request header value.
    ///
    /// # Examples
    ///
    /// ```
    /// use trawl::Session;
    ///
    /// let session = Session::from_cookie_header(Some("refreshToken=r-1"));
    /// assert!(session.has_refresh_token());
    /// assert!(session.access_token().is_none());
    /// ```
    #[must_use]
    pub fn from_cookie_header(header: Option<&str>) -> Self {
        let lookup = |name: &str| {
            header
                .and_then(|h| cookie_value(h, name))
                .map(|value| SecretString::from(value.to_string()))
        };

        Self::new(lookup(ACCESS_TOKEN_COOKIE), lookup(REFRESH_TOKEN_COOKIE))
    }

    /// The bearer credential, if present.
    #[must_use]
    pub const fn access_token(&self) -> Option<&SecretString> {
        self.access_token.as_ref()
    }

    /// The refresh credential, if present.
    #[must_use]
    pub const fn refresh_token(&self) -> Option<&SecretString> {
        self.refresh_token.as_ref()
    }

    /// Returns `true` when a refresh credential is present.
    #[must_use]
    pub const fn has_refresh_token(&self) -> bool {
        self.refresh_token.is_some()
    }

    /// Stores credentials issued by a refresh.
    pub fn apply(&mut self, refreshed: RefreshedSession) {
        self.access_token = Some(refreshed.access_token);
        self.access_issued = true;

        if let Some(refresh_token) = refreshed.refresh_token {
            self.refresh_token = Some(refresh_token);
            self.refresh_issued = true;
        }
    }

    /// `Set-Cookie` values for every credential issued during this request.
    #[must_use]
    pub fn set_cookies(&self) -> Vec<String> {
        let issued = [
            (ACCESS_TOKEN_COOKIE, self.access_issued, &self.access_token),
            (REFRESH_TOKEN_COOKIE, self.refresh_issued, &self.refresh_token),
        ];

        issued
            .into_iter()
            .filter(|(_, issued, _)| *issued)
            .filter_map(|(name, _, token)| {
                token
                    .as_ref()
                    .map(|token| set_cookie(name, token.expose_secret()))
            })
            .collect()
    }
}

/// Ensures a bearer credential exists before the record store is called.
pub struct CredentialGuard<R: SessionRefresher> {
    refresher: Arc<R>,
}

impl<R: SessionRefresher> CredentialGuard<R> {
    #[must_use]
    pub const fn new(refresher: Arc<R>) -> Self {
        Self { refresher }
    }

    /// Fails fast when the session carries no refresh credential.
    ///
    /// Makes no network call.
    ///
    /// # Errors
    ///
    /// Returns [`ProxyError::Unauthorized`] if the refresh credential is absent.
    pub fn require_refresh_token(session: &Session) -> Result<(), ProxyError> {
        if session.has_refresh_token() {
            Ok(())
        } else {
            debug!("Rejecting request without refresh token");
            Err(ProxyError::unauthorized())
        }
    }

    /// Returns the session's bearer credential, refreshing it once if absent.
    ///
    /// An existing bearer credential is returned without validation; an
    /// expired one surfaces later as an upstream rejection. A refreshed
    /// credential is written back into `session`.
    ///
    /// # Errors
    ///
    /// Returns [`ProxyError::Unauthorized`] if there is no refresh credential
    /// or the refresh is rejected.
    pub async fn ensure_credential(
        &self,
        session: &mut Session,
    ) -> Result<SecretString, ProxyError> {
        Self::require_refresh_token(session)?;

        if let Some(access_token) = session.access_token() {
            return Ok(access_token.clone());
        }

        let refresh_token = session
            .refresh_token()
            .cloned()
            .ok_or_else(ProxyError::unauthorized)?;

        debug!("No access token on session, refreshing");

        match self.refresher.refresh(&refresh_token, None).await {
            Ok(refreshed) => {
                let access_token = refreshed.access_token.clone();
                session.apply(refreshed);
                Ok(access_token)
            }
            Err(e) => {
                warn!("Credential refresh failed: {e}");
                Err(ProxyError::unauthorized())
            }
        }
    }
}
