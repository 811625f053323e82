//! REST client configuration for the `/cloudapi` surface.
//!
//! A [`CloudApiClient`] bundles the base path, the default headers (bearer
//! token and pinned API version) and an HTTP client honoring the `insecure`
//! flag. It is rebuilt whenever the bearer token changes.

use crate::config::VCLOUD_API_VERSION;
use crate::{BearerToken, Result, VcdError};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Header carrying a per-request correlation id.
pub const REQUEST_ID_HEADER: &str = "X-VMWARE-VCLOUD-CLIENT-REQUEST-ID";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum number of response body bytes kept in an error.
const MAX_ERROR_BODY: usize = 512;

/// Error body recorded when the response body itself cannot be read.
pub(crate) const UNREADABLE_BODY: &str = "<unreadable body>";

/// Configured client for `{host}/cloudapi`.
#[derive(Debug, Clone)]
pub struct CloudApiClient {
    base_path: String,
    default_headers: HeaderMap,
    http: reqwest::Client,
}

impl CloudApiClient {
    /// Builds a client for `host` authorized with `token`.
    ///
    /// # Errors
    ///
    /// Returns [`VcdError::InvalidConfig`] if the token cannot be carried in a
    /// header, or [`VcdError::Http`] if the HTTP client cannot be built.
    pub fn new(host: &str, token: &BearerToken, insecure: bool) -> Result<Self> {
        let mut auth = HeaderValue::from_str(&token.authorization_header()).map_err(|_| {
            VcdError::InvalidConfig("bearer token contains invalid header characters".to_string())
        })?;
        auth.set_sensitive(true);

        let mut default_headers = HeaderMap::new();
        default_headers.insert(AUTHORIZATION, auth);
        default_headers.insert(ACCEPT, accept_header()?);

        let http = build_http_client(insecure, default_headers.clone())?;

        Ok(Self {
            base_path: format!("{}/cloudapi", host.trim_end_matches('/')),
            default_headers,
            http,
        })
    }

    /// Base path every request is resolved against.
    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// Headers sent with every request.
    pub fn default_headers(&self) -> &HeaderMap {
        &self.default_headers
    }

    /// Underlying HTTP client, with the default headers installed.
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Resolves `path` (e.g. `1.0.0/orgs`) against the base path.
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_path, path.trim_start_matches('/'))
    }

    /// Issues an authorized GET and decodes the JSON response.
    ///
    /// # Errors
    ///
    /// Returns [`VcdError::Api`] for a non-success status.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.url(path);
        tracing::debug!(%url, "cloudapi GET");

        let response = self
            .http
            .get(&url)
            .header(REQUEST_ID_HEADER, uuid::Uuid::new_v4().to_string())
            .send()
            .await?;

        let response = check_status(response).await?;
        decode_json(response).await
    }
}

/// `Accept` header pinning the API version.
pub(crate) fn accept_header() -> Result<HeaderValue> {
    HeaderValue::try_from(format!("application/json;version={}", VCLOUD_API_VERSION))
        .map_err(|e| VcdError::Other(anyhow::anyhow!("invalid Accept header: {}", e)))
}

/// Builds an HTTP client with a timeout, a user agent and optional TLS skip.
pub(crate) fn build_http_client(insecure: bool, headers: HeaderMap) -> Result<reqwest::Client> {
    let user_agent = format!("vcdclient/{}", env!("CARGO_PKG_VERSION"));

    Ok(reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .user_agent(user_agent)
        .default_headers(headers)
        .danger_accept_invalid_certs(insecure)
        .build()?)
}

/// Reads the full body and decodes it as JSON.
pub(crate) async fn decode_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let body = response.bytes().await?;
    Ok(serde_json::from_slice(&body)?)
}

/// Turns a non-success response into [`VcdError::Api`].
pub(crate) async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let url = response.url().to_string();
    let mut body = match response.text().await {
        Ok(body) => body,
        Err(e) => {
            tracing::debug!(%url, error = %e, "unable to read error response body");
            UNREADABLE_BODY.to_string()
        }
    };
    if body.len() > MAX_ERROR_BODY {
        let mut cut = MAX_ERROR_BODY;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
    }

    Err(VcdError::Api {
        url,
        status: status.as_u16(),
        body,
    })
}
