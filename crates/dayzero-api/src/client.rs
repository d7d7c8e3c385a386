// Controller REST client
//
// Wraps `reqwest::Client` with URL construction under `/api/v1/`, token
// authentication and status/error-body mapping. Endpoint groups (self,
// sites, inventory) are implemented as inherent methods in separate files
// to keep this module focused on transport mechanics.

use reqwest::header::AUTHORIZATION;
use secrecy::SecretString;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, trace};
use url::Url;

use crate::auth::token_header;
use crate::error::Error;
use crate::transport::TransportConfig;

/// Controllers report errors as `{"detail": "..."}` or `{"error": "..."}`.
#[derive(serde::Deserialize)]
struct ErrorBody {
    #[serde(default)]
    detail: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// HTTP client for the controller REST API.
///
/// Every request carries the configured API token; [`whoami`](Self::whoami)
/// is the one exception and authenticates with the token it is given.
pub struct ControllerClient {
    http: reqwest::Client,
    base_url: Url,
    token: SecretString,
}

impl ControllerClient {
    /// Create a new client from a `TransportConfig`.
    ///
    /// `base_url` is the API root (e.g. `https://api.mist.com`).
    pub fn new(
        base_url: Url,
        token: SecretString,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self {
            http,
            base_url,
            token,
        })
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url, token: SecretString) -> Self {
        Self {
            http,
            base_url,
            token,
        }
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Build a full URL for an API path: `{base}/api/v1/{path}`.
    pub(crate) fn api_url(&self, path: &str) -> Result<Url, Error> {
        let base = self.base_url.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{base}/api/v1/{path}"))?)
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Send a GET request authenticated with `token` rather than the client's.
    pub(crate) async fn get_with_token<T: DeserializeOwned>(
        &self,
        url: Url,
        token: &SecretString,
    ) -> Result<T, Error> {
        debug!("GET {}", url);

        let resp = self
            .http
            .get(url)
            .header(AUTHORIZATION, token_header(token)?)
            .send()
            .await?;

        Self::parse_response(resp).await
    }

    /// Send a POST request with JSON body.
    pub(crate) async fn post<T: DeserializeOwned>(
        &self,
        url: Url,
        body: &(impl Serialize + Sync),
    ) -> Result<T, Error> {
        debug!("POST {}", url);

        let resp = self
            .http
            .post(url)
            .header(AUTHORIZATION, token_header(&self.token)?)
            .json(body)
            .send()
            .await?;

        Self::parse_response(resp).await
    }

    /// Send a PUT request with JSON body.
    pub(crate) async fn put<T: DeserializeOwned>(
        &self,
        url: Url,
        body: &(impl Serialize + Sync),
    ) -> Result<T, Error> {
        debug!("PUT {}", url);

        let resp = self
            .http
            .put(url)
            .header(AUTHORIZATION, token_header(&self.token)?)
            .json(body)
            .send()
            .await?;

        Self::parse_response(resp).await
    }

    /// Map the HTTP status to an error or deserialize the body.
    async fn parse_response<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
        let status = resp.status();
        trace!(%status, "response received");

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = resp
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(60);
            return Err(Error::RateLimited { retry_after_secs });
        }

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let message = error_message(&body);
            return Err(match status {
                reqwest::StatusCode::UNAUTHORIZED => Error::Authentication { message },
                reqwest::StatusCode::FORBIDDEN => Error::Forbidden { message },
                _ => Error::Api {
                    status: status.as_u16(),
                    message,
                },
            });
        }

        let body = resp.text().await?;

        serde_json::from_str(&body).map_err(|e| {
            let preview: String = body.chars().take(200).collect();
            Error::Deserialization {
                message: format!("{e} (body preview: {preview:?})"),
                body: body.clone(),
            }
        })
    }
}

/// Pull a human-readable message out of an error body, falling back to a
/// truncated raw body.
fn error_message(body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        if let Some(msg) = parsed.detail.or(parsed.error) {
            return msg;
        }
    }
    body.chars().take(200).collect()
}
