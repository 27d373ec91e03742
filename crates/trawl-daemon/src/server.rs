//! HTTP surface of the daemon.
//!
//! Exposes a single endpoint, `GET /api/app/downloads`, answering every
//! request with the JSON envelope and an HTTP status mirroring its `status`
//! field. Session credentials travel in the `accessToken` and `refreshToken`
//! cookies; credentials issued by a refresh are returned as `Set-Cookie`
//! headers.

use std::future::Future;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{RawQuery, State},
    http::{HeaderMap, HeaderValue, StatusCode, header::COOKIE, header::SET_COOKIE},
    response::{IntoResponse, Response},
    routing::get,
};
use tokio::net::TcpListener;
use tracing::{error, info, instrument, warn};

use trawl::{DownloadsService, ProxyError, Session};
use trawl_client::{DownloadsClient, RefreshClient};
use trawl_common::{ApiResponse, ListingParams};

use crate::config::TrawlConfig;
use crate::error::Result;

/// Route serving the downloads listing and search.
pub const DOWNLOADS_PATH: &str = "/api/app/downloads";

/// The downloads service wired to the real upstream clients.
pub type Downloads = DownloadsService<DownloadsClient, RefreshClient>;

/// Shared state handed to every request.
#[derive(Clone)]
pub struct AppState {
    service: Arc<Downloads>,
}

impl AppState {
    #[must_use]
    pub fn new(service: Downloads) -> Self {
        Self {
            service: Arc::new(service),
        }
    }

    /// Builds the upstream clients and the service from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if either upstream client cannot be constructed.
    pub fn from_config(config: &TrawlConfig) -> Result<Self> {
        let store = DownloadsClient::new(&config.upstream)?;
        let refresher = RefreshClient::new(&config.upstream)?;

        Ok(Self::new(DownloadsService::new(
            Arc::new(store),
            Arc::new(refresher),
            config.search.clone(),
        )))
    }
}

/// A JSON envelope answered with the status it carries.
pub struct Envelope(pub ApiResponse);

impl IntoResponse for Envelope {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.0)).into_response()
    }
}

/// A request failure rendered as `{success: false, status, error}`.
pub struct ApiError(pub ProxyError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.0.status();
        if status >= 500 {
            error!(status, "Downloads request failed: {}", self.0);
        } else {
            warn!(status, "Downloads request rejected: {}", self.0);
        }

        Envelope(ApiResponse::failure(status, self.0.to_string())).into_response()
    }
}

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(DOWNLOADS_PATH, get(list_downloads))
        .with_state(state)
}

#[instrument(name = "downloads", skip_all)]
async fn list_downloads(
    State(state): State<AppState>,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
) -> Response {
    let params = ListingParams::from_query(query.as_deref());
    let cookies = headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .collect::<Vec<_>>()
        .join("; ");
    let mut session = Session::from_cookie_header(Some(cookies.as_str()));

    let mut response = match state.service.handle(&mut session, &params).await {
        Ok(body) => {
            info!(
                status = body.status,
                records = body.len(),
                search = body.query.is_some(),
                "Downloads request served"
            );
            Envelope(body).into_response()
        }
        Err(e) => ApiError(e).into_response(),
    };

    for cookie in session.set_cookies() {
        match HeaderValue::from_str(&cookie) {
            Ok(value) => {
                response.headers_mut().append(SET_COOKIE, value);
            }
            Err(e) => warn!("Dropping unrepresentable session cookie: {e}"),
        }
    }

    response
}

/// Serves the router on `listener` until `shutdown` resolves.
///
/// In-flight requests are allowed to finish; a request whose client
/// disconnects is dropped, cancelling any search walk it was running.
///
/// # Errors
///
/// Returns an error if the server fails while accepting connections.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
