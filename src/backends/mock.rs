//! Mock control-plane API for testing.
//!
//! This implementation keeps organizations, VDCs and credentials in memory,
//! counts every call, and can be told to fail logins or lookups so that
//! refresh and caching behavior can be tested without a site.

use crate::config::SYSTEM_ORG;
use crate::entity::is_org_urn;
use crate::*;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU16, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;

/// In-memory [`VcdApi`].
///
/// # Example
///
/// ```
/// use vcdclient::backends::mock::MockApi;
/// use vcdclient::VcdApi;
///
/// #[tokio::main]
/// async fn main() -> vcdclient::Result<()> {
///     let api = MockApi::new();
///     api.add_org("tenant1").await;
///     api.add_vdc("tenant1", "ovdc1").await;
///     api.add_user("tenant1", "admin", "pw").await;
///
///     let token = api.login_with_password("admin", "pw", "tenant1").await?;
///     let org = api.org_by_name("tenant1", &token).await?;
///     let vdc = api.vdc_by_name(&org, "ovdc1", &token).await?;
///     assert_eq!(vdc.org.name, "tenant1");
///
///     // Inject a failure
///     api.fail_logins(Some(503));
///     assert!(api.login_with_password("admin", "pw", "tenant1").await.is_err());
///
///     Ok(())
/// }
/// ```
pub struct MockApi {
    orgs: RwLock<HashMap<String, Org>>,
    vdcs: RwLock<Vec<Vdc>>,
    users: RwLock<HashMap<(String, String), String>>,
    refresh_tokens: RwLock<HashMap<String, String>>,

    token_ttl_ms: AtomicU64,
    login_failure: AtomicU16,
    lookup_failure: AtomicU16,

    token_logins: AtomicUsize,
    password_logins: AtomicUsize,
    org_lookups: AtomicUsize,
    vdc_lookups: AtomicUsize,
}

impl MockApi {
    /// Creates an empty mock site issuing one-hour tokens.
    pub fn new() -> Self {
        Self {
            orgs: RwLock::new(HashMap::new()),
            vdcs: RwLock::new(Vec::new()),
            users: RwLock::new(HashMap::new()),
            refresh_tokens: RwLock::new(HashMap::new()),
            token_ttl_ms: AtomicU64::new(3_600_000),
            login_failure: AtomicU16::new(0),
            lookup_failure: AtomicU16::new(0),
            token_logins: AtomicUsize::new(0),
            password_logins: AtomicUsize::new(0),
            org_lookups: AtomicUsize::new(0),
            vdc_lookups: AtomicUsize::new(0),
        }
    }

    /// Adds an organization and returns it.
    pub async fn add_org(&self, name: impl Into<String>) -> Org {
        let name = name.into();
        let org = Org::new(format!("urn:vcloud:org:{}", uuid::Uuid::new_v4()), &name);
        self.orgs.write().await.insert(name.to_lowercase(), org.clone());
        org
    }

    /// Adds a VDC to an existing organization.
    ///
    /// Returns `None` if the organization does not exist.
    pub async fn add_vdc(&self, org: &str, name: impl Into<String>) -> Option<Vdc> {
        let org = self.orgs.read().await.get(&org.to_lowercase()).cloned()?;
        let vdc = Vdc::new(format!("urn:vcloud:vdc:{}", uuid::Uuid::new_v4()), name, &org);
        self.vdcs.write().await.push(vdc.clone());
        Some(vdc)
    }

    /// Removes a VDC by name from every organization.
    pub async fn remove_vdc(&self, name: &str) {
        self.vdcs.write().await.retain(|vdc| vdc.name != name);
    }

    /// Accepts `user`/`password` in `org`.
    pub async fn add_user(&self, org: &str, user: impl Into<String>, password: impl Into<String>) {
        self.users
            .write()
            .await
            .insert((org.to_lowercase(), user.into()), password.into());
    }

    /// Accepts `refresh_token` issued in `org`.
    pub async fn add_refresh_token(&self, org: &str, refresh_token: impl Into<String>) {
        self.refresh_tokens
            .write()
            .await
            .insert(refresh_token.into(), org.to_lowercase());
    }

    /// Sets the lifetime of tokens issued from now on.
    pub fn set_token_ttl(&self, ttl: Duration) {
        let millis = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
        self.token_ttl_ms.store(millis, Ordering::SeqCst);
    }

    /// Makes every login fail with `status` (`None` clears the failure).
    pub fn fail_logins(&self, status: Option<u16>) {
        self.login_failure.store(status.unwrap_or(0), Ordering::SeqCst);
    }

    /// Makes every org/VDC lookup fail with `status` (`None` clears the failure).
    pub fn fail_lookups(&self, status: Option<u16>) {
        self.lookup_failure.store(status.unwrap_or(0), Ordering::SeqCst);
    }

    /// Number of refresh-token exchanges so far.
    pub fn token_logins(&self) -> usize {
        self.token_logins.load(Ordering::SeqCst)
    }

    /// Number of user/password logins so far.
    pub fn password_logins(&self) -> usize {
        self.password_logins.load(Ordering::SeqCst)
    }

    /// Total number of logins of either kind.
    pub fn logins(&self) -> usize {
        self.token_logins() + self.password_logins()
    }

    /// Number of organization lookups so far.
    pub fn org_lookups(&self) -> usize {
        self.org_lookups.load(Ordering::SeqCst)
    }

    /// Number of VDC lookups so far.
    pub fn vdc_lookups(&self) -> usize {
        self.vdc_lookups.load(Ordering::SeqCst)
    }

    fn issue(&self, kind: TokenKind) -> BearerToken {
        let ttl = Duration::from_millis(self.token_ttl_ms.load(Ordering::SeqCst));
        BearerToken::new(format!("mock-{}-{}", kind, uuid::Uuid::new_v4()), kind, ttl)
    }

    fn injected(failure: &AtomicU16, what: &str) -> Result<()> {
        match failure.load(Ordering::SeqCst) {
            0 => Ok(()),
            status => Err(VcdError::Api {
                url: format!("mock://{}", what),
                status,
                body: "injected failure".to_string(),
            }),
        }
    }

    fn check_token(token: &BearerToken, what: &str) -> Result<()> {
        if token.is_expired() {
            return Err(VcdError::Api {
                url: format!("mock://{}", what),
                status: 401,
                body: "token expired".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for MockApi {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VcdApi for MockApi {
    fn name(&self) -> &str {
        "mock"
    }

    async fn login_with_refresh_token(
        &self,
        user_org: &str,
        refresh_token: &str,
    ) -> Result<BearerToken> {
        self.token_logins.fetch_add(1, Ordering::SeqCst);
        Self::injected(&self.login_failure, "oauth/token")?;

        let tokens = self.refresh_tokens.read().await;
        match tokens.get(refresh_token) {
            Some(org) if org.eq_ignore_ascii_case(user_org) => Ok(self.issue(TokenKind::ApiToken)),
            _ => Err(VcdError::Api {
                url: format!("mock://oauth/tenant/{}/token", user_org),
                status: 400,
                body: "invalid_grant".to_string(),
            }),
        }
    }

    async fn login_with_password(
        &self,
        user: &str,
        password: &str,
        user_org: &str,
    ) -> Result<BearerToken> {
        self.password_logins.fetch_add(1, Ordering::SeqCst);
        Self::injected(&self.login_failure, "sessions")?;

        let users = self.users.read().await;
        match users.get(&(user_org.to_lowercase(), user.to_string())) {
            Some(expected) if expected == password => Ok(self.issue(TokenKind::Session)),
            _ => Err(VcdError::Api {
                url: if user_org.eq_ignore_ascii_case(SYSTEM_ORG) {
                    "mock://sessions/provider".to_string()
                } else {
                    "mock://sessions".to_string()
                },
                status: 401,
                body: "invalid credentials".to_string(),
            }),
        }
    }

    async fn org_by_name(&self, name: &str, token: &BearerToken) -> Result<Org> {
        self.org_lookups.fetch_add(1, Ordering::SeqCst);
        Self::injected(&self.lookup_failure, "orgs")?;
        Self::check_token(token, "orgs")?;

        self.orgs
            .read()
            .await
            .get(&name.to_lowercase())
            .cloned()
            .ok_or_else(|| VcdError::NotFound(format!("org [{}]", name)))
    }

    async fn org_by_name_or_id(&self, name_or_id: &str, token: &BearerToken) -> Result<Org> {
        if !is_org_urn(name_or_id) {
            return self.org_by_name(name_or_id, token).await;
        }

        self.org_lookups.fetch_add(1, Ordering::SeqCst);
        Self::injected(&self.lookup_failure, "orgs")?;
        Self::check_token(token, "orgs")?;

        self.orgs
            .read()
            .await
            .values()
            .find(|org| org.id == name_or_id)
            .cloned()
            .ok_or_else(|| VcdError::NotFound(format!("org [{}]", name_or_id)))
    }

    async fn vdc_by_name(&self, org: &Org, name: &str, token: &BearerToken) -> Result<Vdc> {
        self.vdc_lookups.fetch_add(1, Ordering::SeqCst);
        Self::injected(&self.lookup_failure, "vdcs")?;
        Self::check_token(token, "vdcs")?;

        self.vdcs
            .read()
            .await
            .iter()
            .find(|vdc| vdc.name == name && vdc.org.id == org.id)
            .cloned()
            .ok_or_else(|| VcdError::NotFound(format!("vdc [{}] in org [{}]", name, org.name)))
    }
}
