//! The shared, credential-refreshing client handle.
//!
//! A [`Client`] is created once per set of connection parameters (see
//! [`ClientManager`](crate::ClientManager)) and shared behind an `Arc`. Its
//! identifying fields never change; the bearer token, the resolved VDC and the
//! `/cloudapi` client live behind a read/write lock and are replaced together
//! by [`Client::refresh_bearer_token`].

use crate::config::normalize_host;
use crate::validation::validate_params;
use crate::{
    AuthConfig, BearerToken, CloudApiClient, ConnectParams, Result, VcdApi, VcdError, Vdc,
};
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Tokens expiring within this window are refreshed before use.
pub const REFRESH_BUFFER: Duration = Duration::from_secs(60);

struct ClientState {
    token: BearerToken,
    vdc: Option<Vdc>,
    api_client: CloudApiClient,
}

/// Authenticated handle to a VCD site for one cluster.
pub struct Client {
    auth: AuthConfig,
    /// Organization the cluster lives in
    pub cluster_org_name: String,
    /// Org VDC the cluster lives in
    pub cluster_ovdc_name: String,
    /// vApp holding the cluster VMs
    pub cluster_vapp_name: String,
    /// Cluster identifier
    pub cluster_id: String,
    api: Arc<dyn VcdApi>,
    state: RwLock<ClientState>,
}

impl Client {
    /// Validates `params`, authenticates and builds a new client.
    ///
    /// With `get_vdc_client` set, the cluster organization and VDC are
    /// resolved as well; otherwise [`Client::vdc`] stays empty until the first
    /// refresh.
    ///
    /// # Errors
    ///
    /// - [`VcdError::InvalidConfig`] / [`VcdError::MissingCredentials`] for bad parameters
    /// - [`VcdError::TokenRefresh`] / [`VcdError::AuthFailed`] if login fails
    /// - [`VcdError::OrgLookup`] / [`VcdError::VdcLookup`] if resolution fails
    pub async fn connect(api: Arc<dyn VcdApi>, params: &ConnectParams) -> Result<Self> {
        validate_params(params)?;
        let auth = params.auth_config();

        let token = authenticate(api.as_ref(), &auth).await?;
        let api_client = CloudApiClient::new(&auth.host, &token, auth.insecure)?;

        let vdc = if params.get_vdc_client {
            let org = api
                .org_by_name(&params.org, &token)
                .await
                .map_err(|e| VcdError::org_lookup(&params.org, e))?;

            let vdc = api
                .vdc_by_name(&org, &params.vdc, &token)
                .await
                .map_err(|e| VcdError::vdc_lookup(&params.org, &params.vdc, e))?;
            Some(vdc)
        } else {
            None
        };

        tracing::debug!(
            host = %auth.host,
            org = %params.org,
            vdc = %params.vdc,
            api = api.name(),
            "vcd client connected"
        );

        Ok(Self {
            auth,
            cluster_org_name: params.org.clone(),
            cluster_ovdc_name: params.vdc.clone(),
            cluster_vapp_name: params.vapp.clone(),
            cluster_id: params.cluster_id.clone(),
            api,
            state: RwLock::new(ClientState {
                token,
                vdc,
                api_client,
            }),
        })
    }

    /// Re-authenticates and rebuilds everything derived from the token.
    ///
    /// A refresh token takes precedence over user/password; sysadmin tokens
    /// are exchanged in the `system` org. After login the cluster organization
    /// (by name or URN) and VDC are resolved again and the `/cloudapi` client
    /// is rebuilt with the new token. A client without a cluster VDC skips
    /// the VDC lookup. State is only replaced if every step
    /// succeeds.
    ///
    /// # Errors
    ///
    /// - [`VcdError::TokenRefresh`] if the refresh token is rejected
    /// - [`VcdError::AuthFailed`] if user/password login fails
    /// - [`VcdError::MissingCredentials`] if neither is configured
    /// - [`VcdError::OrgLookup`] / [`VcdError::VdcLookup`] if resolution fails
    pub async fn refresh_bearer_token(&self) -> Result<()> {
        let mut state = self.state.write().await;
        self.refresh_locked(&mut state).await
    }

    async fn refresh_locked(&self, state: &mut ClientState) -> Result<()> {
        tracing::info!(host = %self.auth.host, "refreshing vcd client");
        tracing::info!(is_sysadmin = self.auth.is_sysadmin, "is user sysadmin");

        let token = authenticate(self.api.as_ref(), &self.auth).await?;

        let org = self
            .api
            .org_by_name_or_id(&self.cluster_org_name, &token)
            .await
            .map_err(|e| VcdError::org_lookup(&self.cluster_org_name, e))?;

        // Clients connected without a VDC only re-resolve their organization.
        let vdc = if self.cluster_ovdc_name.is_empty() {
            None
        } else {
            let vdc = self
                .api
                .vdc_by_name(&org, &self.cluster_ovdc_name, &token)
                .await
                .map_err(|e| {
                    VcdError::vdc_lookup(&self.cluster_org_name, &self.cluster_ovdc_name, e)
                })?;
            Some(vdc)
        };

        let api_client = CloudApiClient::new(&self.auth.host, &token, self.auth.insecure)?;

        *state = ClientState {
            token,
            vdc,
            api_client,
        };

        tracing::info!("successfully refreshed all clients");
        Ok(())
    }

    /// Refreshes if the current token has expired or expires within
    /// [`REFRESH_BUFFER`].
    pub async fn ensure_fresh(&self) -> Result<()> {
        if !self.state.read().await.token.expires_within(REFRESH_BUFFER) {
            return Ok(());
        }

        let mut state = self.state.write().await;
        // Another task may have refreshed while we waited for the lock.
        if state.token.expires_within(REFRESH_BUFFER) {
            tracing::debug!(expires_at = ?state.token.expires_at(), "bearer token expiring");
            self.refresh_locked(&mut state).await?;
        }
        Ok(())
    }

    /// Returns a bearer token that is valid for at least [`REFRESH_BUFFER`],
    /// refreshing first if needed.
    pub async fn bearer_token(&self) -> Result<BearerToken> {
        self.ensure_fresh().await?;
        Ok(self.state.read().await.token.clone())
    }

    /// Current `/cloudapi` client, refreshing the token first if needed.
    pub async fn fresh_api_client(&self) -> Result<CloudApiClient> {
        self.ensure_fresh().await?;
        Ok(self.api_client().await)
    }

    /// Current `/cloudapi` client, as built by the last login.
    pub async fn api_client(&self) -> CloudApiClient {
        self.state.read().await.api_client.clone()
    }

    /// Resolved cluster VDC, if any.
    pub async fn vdc(&self) -> Option<Vdc> {
        self.state.read().await.vdc.clone()
    }

    /// Expiry of the current bearer token, if known.
    pub async fn token_expires_at(&self) -> Option<DateTime<Utc>> {
        self.state.read().await.token.expires_at()
    }

    /// Credentials this client authenticates with.
    pub fn auth_config(&self) -> &AuthConfig {
        &self.auth
    }

    /// Name of the underlying API implementation.
    pub fn api_name(&self) -> &str {
        self.api.name()
    }

    /// Returns true if `params` identify the same connection as this client.
    ///
    /// Compared: host, org, VDC, vApp, user org, user, password, refresh
    /// token and the insecure flag. The cluster id and `get_vdc_client` are
    /// not part of the identity.
    pub fn matches(&self, params: &ConnectParams) -> bool {
        self.auth.host == normalize_host(&params.host)
            && self.cluster_org_name == params.org
            && self.cluster_ovdc_name == params.vdc
            && self.cluster_vapp_name == params.vapp
            && self.auth.user_org == params.user_org
            && self.auth.user == params.user
            && self.auth.password == params.password
            && self.auth.refresh_token == params.refresh_token
            && self.auth.insecure == params.insecure
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("auth", &self.auth)
            .field("cluster_org_name", &self.cluster_org_name)
            .field("cluster_ovdc_name", &self.cluster_ovdc_name)
            .field("cluster_vapp_name", &self.cluster_vapp_name)
            .field("cluster_id", &self.cluster_id)
            .field("api", &self.api.name())
            .finish_non_exhaustive()
    }
}

/// Obtains a bearer token with whichever credential `auth` carries.
async fn authenticate(api: &dyn VcdApi, auth: &AuthConfig) -> Result<BearerToken> {
    if !auth.refresh_token.is_empty() {
        api.login_with_refresh_token(auth.token_org(), &auth.refresh_token)
            .await
            .map_err(|e| VcdError::TokenRefresh(Box::new(e)))
    } else if !auth.user.is_empty() && !auth.password.is_empty() {
        api.login_with_password(&auth.user, &auth.password, &auth.user_org)
            .await
            .map_err(|e| VcdError::auth_failed(&auth.user_org, &auth.user, auth.href(), e))
    } else {
        Err(VcdError::MissingCredentials {
            user_org: auth.user_org.clone(),
            user: auth.user.clone(),
            href: auth.href(),
        })
    }
}
