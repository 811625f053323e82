//! Connection parameters and credential configuration.

use crate::{Result, VcdError};
use std::fmt;
use std::time::Duration;

/// API version every request is pinned to.
pub const VCLOUD_API_VERSION: &str = "36.0";

/// Organization name of the provider (system administrator) context.
pub const SYSTEM_ORG: &str = "system";

/// Default lifetime assumed for password-based sessions (30 minutes).
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(1800);

/// Longest session lifetime accepted for password-based sessions (24 hours).
pub const MAX_SESSION_TTL: Duration = Duration::from_secs(24 * 3600);

const REDACTED: &str = "<redacted>";

/// Parameters identifying one connection to a VCD site.
///
/// Two sets of parameters that compare equal on their connection fields share
/// a cached [`Client`](crate::Client). Use the builder methods:
///
/// ```
/// use vcdclient::ConnectParams;
///
/// let params = ConnectParams::new("https://vcd.example.com", "tenant1", "ovdc1")
///     .with_vapp("cluster-vapp")
///     .with_user_credentials("tenant1", "csi-user", "s3cret")
///     .with_cluster_id("urn:vcloud:entity:cse:nativeCluster:1234")
///     .with_vdc_client(true);
///
/// assert_eq!(params.user, "csi-user");
/// assert!(!format!("{:?}", params).contains("s3cret"));
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectParams {
    /// Site URL, e.g. `https://vcd.example.com`
    pub host: String,

    /// Organization the cluster lives in
    pub org: String,

    /// Org VDC the cluster lives in
    pub vdc: String,

    /// vApp holding the cluster VMs
    pub vapp: String,

    /// Organization the authenticating user belongs to
    pub user_org: String,

    /// User name for password authentication
    pub user: String,

    /// Password for password authentication
    pub password: String,

    /// API refresh token; takes precedence over user/password
    pub refresh_token: String,

    /// Skip TLS certificate verification
    pub insecure: bool,

    /// Cluster identifier carried on the client
    pub cluster_id: String,

    /// Resolve the org VDC while connecting
    pub get_vdc_client: bool,

    /// Assumed lifetime of password-based sessions (default: 30 minutes)
    pub session_ttl: Duration,
}

impl Default for ConnectParams {
    fn default() -> Self {
        Self {
            host: String::new(),
            org: String::new(),
            vdc: String::new(),
            vapp: String::new(),
            user_org: String::new(),
            user: String::new(),
            password: String::new(),
            refresh_token: String::new(),
            insecure: false,
            cluster_id: String::new(),
            get_vdc_client: false,
            session_ttl: DEFAULT_SESSION_TTL,
        }
    }
}

impl ConnectParams {
    /// Creates parameters for a cluster living in `org`/`vdc` on `host`.
    ///
    /// The user organization defaults to `org`.
    pub fn new(host: impl Into<String>, org: impl Into<String>, vdc: impl Into<String>) -> Self {
        let org = org.into();
        Self {
            host: host.into(),
            user_org: org.clone(),
            org,
            vdc: vdc.into(),
            ..Default::default()
        }
    }

    /// Reads parameters from `VCD_*` environment variables.
    ///
    /// `VCD_HOST`, `VCD_ORG` and `VCD_VDC` are required. `VCD_USER_ORG`
    /// defaults to `VCD_ORG`. `VCD_INSECURE` accepts `true`/`1`.
    ///
    /// # Errors
    ///
    /// Returns [`VcdError::InvalidConfig`] if a required variable is unset.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| VcdError::InvalidConfig(format!("{} must be set", key)))
        };
        let optional = |key: &str| lookup(key).unwrap_or_default();

        let mut params = Self::new(required("VCD_HOST")?, required("VCD_ORG")?, required("VCD_VDC")?);
        if let Some(user_org) = lookup("VCD_USER_ORG").filter(|v| !v.is_empty()) {
            params.user_org = user_org;
        }
        params.vapp = optional("VCD_VAPP");
        params.user = optional("VCD_USER");
        params.password = optional("VCD_PASSWORD");
        params.refresh_token = optional("VCD_REFRESH_TOKEN");
        params.cluster_id = optional("VCD_CLUSTER_ID");
        params.insecure = matches!(
            optional("VCD_INSECURE").to_ascii_lowercase().as_str(),
            "true" | "1" | "yes"
        );

        Ok(params)
    }

    /// Sets the vApp name.
    pub fn with_vapp(mut self, vapp: impl Into<String>) -> Self {
        self.vapp = vapp.into();
        self
    }

    /// Authenticates with a user name and password in `user_org`.
    pub fn with_user_credentials(
        mut self,
        user_org: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.user_org = user_org.into();
        self.user = user.into();
        self.password = password.into();
        self
    }

    /// Authenticates with an API refresh token issued in `user_org`.
    pub fn with_refresh_token(
        mut self,
        user_org: impl Into<String>,
        refresh_token: impl Into<String>,
    ) -> Self {
        self.user_org = user_org.into();
        self.refresh_token = refresh_token.into();
        self
    }

    /// Skips TLS certificate verification.
    pub fn with_insecure(mut self, insecure: bool) -> Self {
        self.insecure = insecure;
        self
    }

    /// Sets the cluster identifier.
    pub fn with_cluster_id(mut self, cluster_id: impl Into<String>) -> Self {
        self.cluster_id = cluster_id.into();
        self
    }

    /// Resolves the org VDC while connecting.
    pub fn with_vdc_client(mut self, get_vdc_client: bool) -> Self {
        self.get_vdc_client = get_vdc_client;
        self
    }

    /// Sets the assumed lifetime of password-based sessions.
    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    /// Extracts the credential part of the parameters.
    pub fn auth_config(&self) -> AuthConfig {
        AuthConfig::new(
            &self.host,
            &self.user,
            &self.password,
            &self.refresh_token,
            &self.user_org,
            self.insecure,
        )
        .with_session_ttl(self.session_ttl)
    }
}

impl fmt::Debug for ConnectParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectParams")
            .field("host", &self.host)
            .field("org", &self.org)
            .field("vdc", &self.vdc)
            .field("vapp", &self.vapp)
            .field("user_org", &self.user_org)
            .field("user", &self.user)
            .field("password", &redact(&self.password))
            .field("refresh_token", &redact(&self.refresh_token))
            .field("insecure", &self.insecure)
            .field("cluster_id", &self.cluster_id)
            .field("get_vdc_client", &self.get_vdc_client)
            .field("session_ttl", &self.session_ttl)
            .finish()
    }
}

/// Credentials and endpoint used to authenticate against a site.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthConfig {
    /// Site URL without trailing `/` or `/api`
    pub host: String,
    /// Organization the user belongs to
    pub user_org: String,
    /// User name
    pub user: String,
    /// Password
    pub password: String,
    /// API refresh token
    pub refresh_token: String,
    /// Skip TLS certificate verification
    pub insecure: bool,
    /// Whether the user belongs to the provider organization
    pub is_sysadmin: bool,
    /// Assumed lifetime of password-based sessions
    pub session_ttl: Duration,
}

impl AuthConfig {
    /// Creates a credential configuration.
    ///
    /// The host is normalized and `is_sysadmin` is derived from `user_org`.
    ///
    /// ```
    /// use vcdclient::AuthConfig;
    ///
    /// let auth = AuthConfig::new("https://vcd.example.com/api/", "admin", "pw", "", "System", true);
    /// assert_eq!(auth.host, "https://vcd.example.com");
    /// assert!(auth.is_sysadmin);
    /// ```
    pub fn new(
        host: &str,
        user: &str,
        password: &str,
        refresh_token: &str,
        user_org: &str,
        insecure: bool,
    ) -> Self {
        Self {
            host: normalize_host(host),
            user_org: user_org.to_string(),
            user: user.to_string(),
            password: password.to_string(),
            refresh_token: refresh_token.to_string(),
            insecure,
            is_sysadmin: user_org.eq_ignore_ascii_case(SYSTEM_ORG),
            session_ttl: DEFAULT_SESSION_TTL,
        }
    }

    /// Sets the assumed lifetime of password-based sessions.
    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    /// Legacy API endpoint, used to identify the site in errors and logs.
    pub fn href(&self) -> String {
        format!("{}/api", self.host)
    }

    /// Organization to present when exchanging a refresh token.
    pub fn token_org(&self) -> &str {
        if self.is_sysadmin {
            SYSTEM_ORG
        } else {
            &self.user_org
        }
    }

    /// Returns true if a refresh token or a complete user/password pair is set.
    pub fn has_credentials(&self) -> bool {
        !self.refresh_token.is_empty() || (!self.user.is_empty() && !self.password.is_empty())
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("host", &self.host)
            .field("user_org", &self.user_org)
            .field("user", &self.user)
            .field("password", &redact(&self.password))
            .field("refresh_token", &redact(&self.refresh_token))
            .field("insecure", &self.insecure)
            .field("is_sysadmin", &self.is_sysadmin)
            .field("session_ttl", &self.session_ttl)
            .finish()
    }
}

fn redact(secret: &str) -> &'static str {
    if secret.is_empty() {
        ""
    } else {
        REDACTED
    }
}

/// Trims whitespace, trailing slashes and a trailing `/api` from a site URL.
pub(crate) fn normalize_host(host: &str) -> String {
    let trimmed = host.trim().trim_end_matches('/');
    trimmed
        .strip_suffix("/api")
        .unwrap_or(trimmed)
        .trim_end_matches('/')
        .to_string()
}
