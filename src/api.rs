//! The control-plane API seam.
//!
//! [`VcdApi`] is everything a [`Client`](crate::Client) needs from the site:
//! two ways to obtain a bearer token and the organization/VDC lookups. The
//! HTTP implementation lives in [`backends::rest`](crate::backends::rest);
//! tests use [`backends::mock`](crate::backends::mock).

use crate::{BearerToken, Org, Result, Vdc};
use async_trait::async_trait;

/// Authentication and lookup calls against a VCD site.
///
/// Implementations must be `Send + Sync`; one instance is shared by a cached
/// client across tasks.
///
/// # Example
///
/// ```no_run
/// use vcdclient::backends::rest::RestApi;
/// use vcdclient::{AuthConfig, VcdApi};
///
/// #[tokio::main]
/// async fn main() -> vcdclient::Result<()> {
///     let auth = AuthConfig::new("https://vcd.example.com", "", "", "api-token", "tenant1", false);
///     let api = RestApi::new(&auth)?;
///
///     let token = api.login_with_refresh_token("tenant1", &auth.refresh_token).await?;
///     let org = api.org_by_name("tenant1", &token).await?;
///     let vdc = api.vdc_by_name(&org, "ovdc1", &token).await?;
///
///     println!("{} lives in {}", vdc.name, org.name);
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait VcdApi: Send + Sync {
    /// Returns the implementation name (e.g., "rest", "mock").
    fn name(&self) -> &str;

    /// Exchanges an API refresh token for a bearer token.
    ///
    /// `user_org` is the organization the token was issued in, or `system`
    /// for provider tokens.
    ///
    /// # Errors
    ///
    /// Returns [`VcdError::Api`](crate::VcdError::Api) with status 400/401 if
    /// the site rejects the token.
    async fn login_with_refresh_token(
        &self,
        user_org: &str,
        refresh_token: &str,
    ) -> Result<BearerToken>;

    /// Opens a session with a user name and password.
    ///
    /// # Errors
    ///
    /// Returns [`VcdError::Api`](crate::VcdError::Api) with status 401 if the
    /// credentials are rejected.
    async fn login_with_password(
        &self,
        user: &str,
        password: &str,
        user_org: &str,
    ) -> Result<BearerToken>;

    /// Looks up an organization by its short name.
    ///
    /// # Errors
    ///
    /// Returns [`VcdError::NotFound`](crate::VcdError::NotFound) if no
    /// organization has that name.
    async fn org_by_name(&self, name: &str, token: &BearerToken) -> Result<Org>;

    /// Looks up an organization by URN (`urn:vcloud:org:…`) or by name.
    ///
    /// The default implementation only resolves names.
    async fn org_by_name_or_id(&self, name_or_id: &str, token: &BearerToken) -> Result<Org> {
        self.org_by_name(name_or_id, token).await
    }

    /// Looks up a VDC by name inside `org`.
    ///
    /// # Errors
    ///
    /// Returns [`VcdError::NotFound`](crate::VcdError::NotFound) if `org`
    /// has no VDC with that name.
    async fn vdc_by_name(&self, org: &Org, name: &str, token: &BearerToken) -> Result<Vdc>;
}
