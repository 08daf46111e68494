//! Session management and the shared request helper used by every endpoint.

use std::time::Duration;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use reqwest::{Method, RequestBuilder, StatusCode};
use submikan_torrent_core::TorrentError;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

/// Default timeout applied to every request if the caller does not override it.
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
/// Default session lifetime assumed when qBittorrent does not report one explicitly.
const DEFAULT_SESSION_TTL_SECS: i64 = 3600;

/// Configuration required to reach a qBittorrent WebUI instance.
#[derive(Debug, Clone)]
pub struct QbitConfig {
    /// Base URL of the WebUI, e.g. `http://localhost:8080`.
    pub base_url: String,
    /// WebUI account username.
    pub username: String,
    /// WebUI account password.
    pub password: String,
    /// Per-request timeout.
    pub request_timeout: Duration,
}

impl QbitConfig {
    /// Build a configuration with the default request timeout.
    #[must_use]
    pub fn new(base_url: impl Into<String>, username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            username: username.into(),
            password: password.into(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

#[derive(Debug, Default)]
struct SessionState {
    cookie: Option<String>,
    expires_at: Option<DateTime<Utc>>,
}

impl SessionState {
    fn is_valid(&self) -> bool {
        match (&self.cookie, self.expires_at) {
            (Some(_), Some(expires_at)) => expires_at > Utc::now(),
            _ => false,
        }
    }
}

/// Adapter over a single qBittorrent WebUI instance.
pub struct QbitClient {
    http: reqwest::Client,
    base_url: String,
    username: String,
    password: String,
    session: Mutex<SessionState>,
}

impl QbitClient {
    /// Build a new adapter. Does not perform any network I/O; the first
    /// operation triggers authentication.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be constructed.
    pub fn new(config: QbitConfig) -> Result<Self, TorrentError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .cookie_store(false)
            .build()
            .map_err(|err| TorrentError::Unavailable {
                reason: format!("failed to build http client: {err}"),
                retry_after: None,
            })?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            username: config.username,
            password: config.password,
            session: Mutex::new(SessionState::default()),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    #[instrument(name = "qbit.login", skip(self))]
    async fn login(&self, session: &mut SessionState) -> Result<(), TorrentError> {
        let url = self.url("api/v2/auth/login");
        let response = self
            .http
            .post(&url)
            .header("Referer", self.base_url.clone())
            .form(&[
                ("username", self.username.as_str()),
                ("password", self.password.as_str()),
            ])
            .send()
            .await
            .map_err(map_transport_error)?;

        if !response.status().is_success() {
            return Err(TorrentError::Unavailable {
                reason: format!("login failed with status {}", response.status()),
                retry_after: Some(Utc::now() + ChronoDuration::seconds(30)),
            });
        }

        let cookie = response
            .cookies()
            .find(|c| c.name() == "SID")
            .map(|c| c.value().to_string());

        let Some(cookie) = cookie else {
            return Err(TorrentError::Rejected {
                reason: "login succeeded but no SID cookie was returned".to_string(),
            });
        };

        session.cookie = Some(cookie);
        session.expires_at = Some(Utc::now() + ChronoDuration::seconds(DEFAULT_SESSION_TTL_SECS));
        info!(event = "qbit_login_ok", "authenticated with qBittorrent WebUI");
        Ok(())
    }

    async fn ensure_authenticated(&self) -> Result<String, TorrentError> {
        let mut session = self.session.lock().await;
        if !session.is_valid() {
            self.login(&mut session).await?;
        }
        Ok(session
            .cookie
            .clone()
            .expect("login always sets a cookie on success"))
    }

    async fn force_reauthenticate(&self) -> Result<String, TorrentError> {
        let mut session = self.session.lock().await;
        session.cookie = None;
        session.expires_at = None;
        self.login(&mut session).await?;
        Ok(session
            .cookie
            .clone()
            .expect("login always sets a cookie on success"))
    }

    fn with_cookie(builder: RequestBuilder, cookie: &str) -> RequestBuilder {
        builder.header("Cookie", format!("SID={cookie}"))
    }

    /// Issue an authenticated request, retrying once after a forced
    /// re-authentication if the server responds `403 Forbidden`.
    pub(crate) async fn authenticated(
        &self,
        method: Method,
        path: &str,
    ) -> Result<RequestBuilder, TorrentError> {
        let cookie = self.ensure_authenticated().await?;
        Ok(Self::with_cookie(
            self.http.request(method, self.url(path)),
            &cookie,
        ))
    }

    /// Send a request built via [`Self::authenticated`], transparently
    /// handling a single 403-triggered re-auth retry.
    pub(crate) async fn send_with_reauth(
        &self,
        method: Method,
        path: &str,
        build: impl Fn(RequestBuilder) -> RequestBuilder,
    ) -> Result<reqwest::Response, TorrentError> {
        let builder = self.authenticated(method.clone(), path).await?;
        let response = build(builder).send().await.map_err(map_transport_error)?;

        if response.status() != StatusCode::FORBIDDEN {
            return classify_status(response).await;
        }

        warn!(event = "qbit_reauth_retry", path, "got 403, forcing re-auth and retrying once");
        let cookie = self.force_reauthenticate().await?;
        let retried = build(Self::with_cookie(self.http.request(method, self.url(path)), &cookie))
            .send()
            .await
            .map_err(map_transport_error)?;
        classify_status(retried).await
    }
}

async fn classify_status(response: reqwest::Response) -> Result<reqwest::Response, TorrentError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status.is_server_error() || status == StatusCode::REQUEST_TIMEOUT {
        return Err(TorrentError::Unavailable {
            reason: format!("qbittorrent responded with {status}"),
            retry_after: Some(Utc::now() + ChronoDuration::seconds(30)),
        });
    }
    let body = response.text().await.unwrap_or_default();
    Err(TorrentError::Rejected {
        reason: format!("qbittorrent rejected request ({status}): {body}"),
    })
}

fn map_transport_error(err: reqwest::Error) -> TorrentError {
    if err.is_timeout() || err.is_connect() {
        TorrentError::Unavailable {
            reason: err.to_string(),
            retry_after: Some(Utc::now() + ChronoDuration::seconds(30)),
        }
    } else {
        TorrentError::Unavailable {
            reason: err.to_string(),
            retry_after: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_state_invalid_without_cookie() {
        let state = SessionState::default();
        assert!(!state.is_valid());
    }

    #[test]
    fn session_state_invalid_once_expired() {
        let state = SessionState {
            cookie: Some("abc".to_string()),
            expires_at: Some(Utc::now() - ChronoDuration::seconds(1)),
        };
        assert!(!state.is_valid());
    }

    #[test]
    fn session_state_valid_before_expiry() {
        let state = SessionState {
            cookie: Some("abc".to_string()),
            expires_at: Some(Utc::now() + ChronoDuration::seconds(60)),
        };
        assert!(state.is_valid());
    }
}
