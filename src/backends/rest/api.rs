//! REST implementation of [`VcdApi`].

use crate::cloudapi::{
    accept_header, build_http_client, check_status, decode_json, REQUEST_ID_HEADER,
};
use crate::config::SYSTEM_ORG;
use crate::entity::{is_org_urn, Page};
use crate::{AuthConfig, BearerToken, Org, Result, TokenKind, VcdApi, VcdError, Vdc};
use async_trait::async_trait;
use base64::Engine;
use chrono::{Duration, Utc};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use url::Url;

/// Response header carrying the bearer token of a new session.
const ACCESS_TOKEN_HEADER: &str = "X-VMWARE-VCLOUD-ACCESS-TOKEN";

#[derive(Debug, Deserialize)]
struct OAuthTokenResponse {
    access_token: String,
    #[serde(default)]
    token_type: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// VCD REST API client.
///
/// Stateless apart from the site URL and the HTTP client; tokens are passed
/// into every lookup by the owning [`Client`](crate::Client).
pub struct RestApi {
    base: Url,
    http: reqwest::Client,
    session_ttl: std::time::Duration,
}

impl RestApi {
    /// Creates a REST API client for the site in `auth`.
    ///
    /// # Errors
    ///
    /// Returns [`VcdError::InvalidConfig`] if the host is not a usable base
    /// URL, or [`VcdError::Http`] if the HTTP client cannot be built.
    pub fn new(auth: &AuthConfig) -> Result<Self> {
        let base = Url::parse(&auth.host).map_err(|e| {
            VcdError::InvalidConfig(format!("host [{}] is not a valid URL: {}", auth.host, e))
        })?;
        if base.cannot_be_a_base() {
            return Err(VcdError::InvalidConfig(format!(
                "host [{}] cannot be a base URL",
                auth.host
            )));
        }

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, accept_header()?);

        Ok(Self {
            base,
            http: build_http_client(auth.insecure, headers)?,
            session_ttl: auth.session_ttl,
        })
    }

    /// Appends path segments to the site URL, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Issues an authorized GET against `url` and decodes the JSON body.
    async fn get_json<T: DeserializeOwned>(&self, url: Url, token: &BearerToken) -> Result<T> {
        tracing::debug!(url = %url, "vcd GET");

        let response = self
            .http
            .get(url)
            .header(AUTHORIZATION, sensitive(&token.authorization_header())?)
            .header(REQUEST_ID_HEADER, uuid::Uuid::new_v4().to_string())
            .send()
            .await?;

        let response = check_status(response).await?;
        decode_json(response).await
    }

    /// Returns the first entry of a filtered collection query.
    async fn first_match<T: DeserializeOwned>(
        &self,
        collection: &str,
        filter: String,
        token: &BearerToken,
    ) -> Result<Option<T>> {
        let mut url = self.endpoint(&["cloudapi", "1.0.0", collection]);
        url.query_pairs_mut().append_pair("filter", &filter);

        let page: Page<T> = self.get_json(url, token).await?;
        tracing::debug!(collection, total = page.result_total, "vcd query");
        Ok(page.values.into_iter().next())
    }
}

#[async_trait]
impl VcdApi for RestApi {
    fn name(&self) -> &str {
        "rest"
    }

    async fn login_with_refresh_token(
        &self,
        user_org: &str,
        refresh_token: &str,
    ) -> Result<BearerToken> {
        let url = if user_org.eq_ignore_ascii_case(SYSTEM_ORG) {
            self.endpoint(&["oauth", "provider", "token"])
        } else {
            self.endpoint(&["oauth", "tenant", user_org, "token"])
        };
        tracing::debug!(url = %url, "exchanging refresh token");

        let body = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("grant_type", "refresh_token")
            .append_pair("refresh_token", refresh_token)
            .finish();

        let response = self
            .http
            .post(url)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header(REQUEST_ID_HEADER, uuid::Uuid::new_v4().to_string())
            .body(body)
            .send()
            .await?;

        let response = check_status(response).await?;
        let grant: OAuthTokenResponse = decode_json(response).await?;
        tracing::debug!(token_type = %grant.token_type, expires_in = ?grant.expires_in, "refresh token accepted");

        let expires_at = grant
            .expires_in
            .filter(|secs| *secs > 0)
            .and_then(Duration::try_seconds)
            .and_then(|ttl| Utc::now().checked_add_signed(ttl));

        Ok(match expires_at {
            Some(expires_at) => {
                BearerToken::from_token_and_expiry(grant.access_token, TokenKind::ApiToken, expires_at)
            }
            None => BearerToken::non_expiring(grant.access_token, TokenKind::ApiToken),
        })
    }

    async fn login_with_password(
        &self,
        user: &str,
        password: &str,
        user_org: &str,
    ) -> Result<BearerToken> {
        let url = if user_org.eq_ignore_ascii_case(SYSTEM_ORG) {
            self.endpoint(&["cloudapi", "1.0.0", "sessions", "provider"])
        } else {
            self.endpoint(&["cloudapi", "1.0.0", "sessions"])
        };
        tracing::debug!(url = %url, user_org, user, "opening session");

        let credentials = base64::engine::general_purpose::STANDARD
            .encode(format!("{}@{}:{}", user, user_org, password));

        let response = self
            .http
            .post(url)
            .header(AUTHORIZATION, sensitive(&format!("Basic {}", credentials))?)
            .header(REQUEST_ID_HEADER, uuid::Uuid::new_v4().to_string())
            .send()
            .await?;

        let response = check_status(response).await?;
        let token = response
            .headers()
            .get(ACCESS_TOKEN_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                VcdError::Other(anyhow::anyhow!(
                    "session response carried no {} header",
                    ACCESS_TOKEN_HEADER
                ))
            })?;

        Ok(BearerToken::new(token, TokenKind::Session, self.session_ttl))
    }

    async fn org_by_name(&self, name: &str, token: &BearerToken) -> Result<Org> {
        self.first_match("orgs", format!("name=={}", name), token)
            .await?
            .ok_or_else(|| VcdError::NotFound(format!("org [{}]", name)))
    }

    async fn org_by_name_or_id(&self, name_or_id: &str, token: &BearerToken) -> Result<Org> {
        if !is_org_urn(name_or_id) {
            return self.org_by_name(name_or_id, token).await;
        }

        let url = self.endpoint(&["cloudapi", "1.0.0", "orgs", name_or_id]);
        match self.get_json(url, token).await {
            Err(VcdError::Api { status: 404, .. }) => {
                Err(VcdError::NotFound(format!("org [{}]", name_or_id)))
            }
            other => other,
        }
    }

    async fn vdc_by_name(&self, org: &Org, name: &str, token: &BearerToken) -> Result<Vdc> {
        self.first_match("vdcs", format!("name=={};org.id=={}", name, org.id), token)
            .await?
            .ok_or_else(|| VcdError::NotFound(format!("vdc [{}] in org [{}]", name, org.name)))
    }
}

fn sensitive(value: &str) -> Result<HeaderValue> {
    let mut header = HeaderValue::from_str(value).map_err(|_| {
        VcdError::InvalidConfig("credential contains invalid header characters".to_string())
    })?;
    header.set_sensitive(true);
    Ok(header)
}
