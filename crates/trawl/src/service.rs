use std::sync::Arc;

use log::debug;

use trawl_client::{RecordStore, SessionRefresher};
use trawl_common::{ApiResponse, ListingParams, SearchConfig};

use crate::error::ProxyError;
use crate::proxy::{ListingRequest, SearchProxy};
use crate::session::{CredentialGuard, Session};

/// The downloads endpoint: credential guard in front of the search proxy.
///
/// Checks run in a fixed order and the first failure wins:
///
/// 1. refresh credential present, else 401
/// 2. `limit` and `page` in range, else 400
/// 3. bearer credential present or refreshable, else 401
/// 4. pass-through listing or full-corpus search
///
/// Nothing reaches the record store until all three checks pass.
pub struct DownloadsService<S: RecordStore, R: SessionRefresher> {
    guard: CredentialGuard<R>,
    proxy: SearchProxy<S>,
}

impl<S: RecordStore, R: SessionRefresher> DownloadsService<S, R> {
    #[must_use]
    pub fn new(store: Arc<S>, refresher: Arc<R>, config: SearchConfig) -> Self {
        Self {
            guard: CredentialGuard::new(refresher),
            proxy: SearchProxy::new(store, config),
        }
    }

    #[must_use]
    pub const fn proxy(&self) -> &SearchProxy<S> {
        &self.proxy
    }

    /// Serves one request.
    ///
    /// Credentials issued by a refresh are written back into `session`.
    ///
    /// # Errors
    ///
    /// Returns the first [`ProxyError`] raised by the checks or the proxy.
    pub async fn handle(
        &self,
        session: &mut Session,
        params: &ListingParams,
    ) -> Result<ApiResponse, ProxyError> {
        CredentialGuard::<R>::require_refresh_token(session)?;

        let request = ListingRequest::from_params(params)?;
        let token = self.guard.ensure_credential(session).await?;

        debug!(
            "Serving downloads limit={} page={} search={}",
            request.limit(),
            request.page(),
            request.query().is_some()
        );

        let response = self.proxy.handle(&request, &token).await?;
        Ok(response.into())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]

    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use secrecy::{ExposeSecret, SecretString};
    use trawl_client::{ClientError, RefreshedSession};

    use super::*;
    use crate::proxy::test_support::{ScriptedStore, Step, record};

    #[derive(Default)]
    struct CountingRefresher {
        calls: AtomicUsize,
        reject: bool,
    }

    #[async_trait]
    impl SessionRefresher for CountingRefresher {
        async fn refresh(
            &self,
            _refresh_token: &SecretString,
            _access_token: Option<&SecretString>,
        ) -> Result<RefreshedSession, ClientError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.reject {
                return Err(ClientError::RefreshRejected("expired".to_string()));
            }
            Ok(RefreshedSession {
                access_token: SecretString::from("fresh".to_string()),
                refresh_token: None,
            })
        }
    }

    struct Fixture {
        service: DownloadsService<ScriptedStore, CountingRefresher>,
        store: Arc<ScriptedStore>,
        refresher: Arc<CountingRefresher>,
    }

    fn fixture(steps: Vec<Step>, refresher: CountingRefresher) -> Fixture {
        let store = Arc::new(ScriptedStore::new(steps));
        let refresher = Arc::new(refresher);
        let service = DownloadsService::new(
            Arc::clone(&store),
            Arc::clone(&refresher),
            SearchConfig::default(),
        );
        Fixture {
            service,
            store,
            refresher,
        }
    }

    fn params(limit: &str, page: &str, query: Option<&str>) -> ListingParams {
        ListingParams {
            limit: Some(limit.to_string()),
            page: Some(page.to_string()),
            query: query.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_missing_refresh_token_short_circuits() {
        let f = fixture(vec![], CountingRefresher::default());
        let mut session = Session::from_cookie_header(Some("accessToken=a-1"));

        let err = f
            .service
            .handle(&mut session, &params("10", "1", Some("x")))
            .await
            .unwrap_err();

        assert_eq!(err.status(), 401);
        assert_eq!(err.to_string(), "Unauthorized. No access token or refresh token.");
        assert_eq!(f.store.calls(), 0);
        assert_eq!(f.refresher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_auth_is_checked_before_validation() {
        let f = fixture(vec![], CountingRefresher::default());
        let mut session = Session::default();

        let err = f
            .service
            .handle(&mut session, &params("0", "0", None))
            .await
            .unwrap_err();

        assert_eq!(err.status(), 401);
    }

    #[tokio::test]
    async fn test_validation_runs_before_refresh() {
        let f = fixture(vec![], CountingRefresher::default());
        let mut session = Session::from_cookie_header(Some("refreshToken=r-1"));

        let err = f
            .service
            .handle(&mut session, &params("5000", "1", None))
            .await
            .unwrap_err();

        assert_eq!(err.status(), 400);
        assert_eq!(f.refresher.calls.load(Ordering::SeqCst), 0);
        assert_eq!(f.store.calls(), 0);
    }

    #[tokio::test]
    async fn test_rejected_refresh_makes_no_store_call() {
        let f = fixture(
            vec![],
            CountingRefresher {
                reject: true,
                ..CountingRefresher::default()
            },
        );
        let mut session = Session::from_cookie_header(Some("refreshToken=r-1"));

        let err = f
            .service
            .handle(&mut session, &params("10", "1", None))
            .await
            .unwrap_err();

        assert_eq!(err.status(), 401);
        assert_eq!(f.store.calls(), 0);
    }

    #[tokio::test]
    async fn test_refresh_then_listing() {
        let f = fixture(
            vec![Step::Records(vec![record(1, "a.mkv")], Some("1"))],
            CountingRefresher::default(),
        );
        let mut session = Session::from_cookie_header(Some("refreshToken=r-1"));

        let response = f
            .service
            .handle(&mut session, &params("10", "1", None))
            .await
            .unwrap();

        assert!(response.success);
        assert_eq!(response.len(), 1);
        assert_eq!(response.total_count, Some(Some("1".to_string())));
        assert_eq!(response.limit, Some(10));
        assert_eq!(response.page, Some(1));
        assert_eq!(response.query, None);
        assert_eq!(f.refresher.calls.load(Ordering::SeqCst), 1);
        assert_eq!(session.access_token().unwrap().expose_secret(), "fresh");
        assert_eq!(session.set_cookies().len(), 1);
    }

    #[tokio::test]
    async fn test_search_envelope() {
        let f = fixture(
            vec![
                Step::Records(vec![record(1, "The.Show.S01E01.mkv")], Some("2")),
                Step::Records(vec![record(2, "Other.File.mkv")], Some("2")),
                Step::NoContent,
            ],
            CountingRefresher::default(),
        );
        let mut session = Session::from_cookie_header(Some("accessToken=a-1; refreshToken=r-1"));

        let response = f
            .service
            .handle(&mut session, &params("10", "4", Some("show")))
            .await
            .unwrap();

        assert_eq!(response.len(), 1);
        assert_eq!(response.limit, Some(2500));
        assert_eq!(response.page, Some(3));
        assert_eq!(response.query.as_deref(), Some("show"));
        assert_eq!(f.refresher.calls.load(Ordering::SeqCst), 0);
        assert!(session.set_cookies().is_empty());
    }

    #[tokio::test]
    async fn test_non_numeric_params_fall_back_to_defaults() {
        let f = fixture(
            vec![Step::Records(vec![], None)],
            CountingRefresher::default(),
        );
        let mut session = Session::from_cookie_header(Some("accessToken=a-1; refreshToken=r-1"));

        let response = f
            .service
            .handle(&mut session, &params("ten", "", Some("")))
            .await
            .unwrap();

        assert_eq!(response.limit, Some(10));
        assert_eq!(response.page, Some(1));
        assert_eq!(f.store.requested(), vec![(10, 1)]);
    }
}
