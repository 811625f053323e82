//! Error types for vcdclient operations.

use thiserror::Error;

/// Result type alias using [`VcdError`].
pub type Result<T> = std::result::Result<T, VcdError>;

/// Errors that can occur while connecting to or refreshing a VCD session.
///
/// Wrapping variants keep the underlying error reachable through `source()`.
/// Credentials never appear in any rendered message.
#[derive(Debug, Error)]
pub enum VcdError {
    /// Neither a refresh token nor a user/password pair was configured.
    #[error(
        "unable to find refresh token or secret to refresh vcd client for user [{user_org}/{user}] and url [{href}]"
    )]
    MissingCredentials {
        /// Organization the user belongs to
        user_org: String,
        /// User name (may be empty)
        user: String,
        /// Legacy API endpoint of the site
        href: String,
    },

    /// User/password authentication was rejected or failed.
    #[error("unable to authenticate [{user_org}/{user}] for url [{href}]: {source}")]
    AuthFailed {
        /// Organization the user belongs to
        user_org: String,
        /// User name
        user: String,
        /// Legacy API endpoint of the site
        href: String,
        /// Underlying error
        #[source]
        source: Box<VcdError>,
    },

    /// Exchanging the refresh token for a bearer token failed.
    #[error("failed to refresh VCD client with refresh token: {0}")]
    TokenRefresh(#[source] Box<VcdError>),

    /// The cluster organization could not be resolved.
    #[error("unable to get vcd organization [{org}]: {source}")]
    OrgLookup {
        /// Organization name or URN
        org: String,
        /// Underlying error
        #[source]
        source: Box<VcdError>,
    },

    /// The cluster VDC could not be resolved inside its organization.
    #[error("unable to get vdc [{vdc}] from org [{org}]: {source}")]
    VdcLookup {
        /// Organization name
        org: String,
        /// VDC name
        vdc: String,
        /// Underlying error
        #[source]
        source: Box<VcdError>,
    },

    /// Entity was not found on the site.
    #[error("not found: {0}")]
    NotFound(String),

    /// Connection parameters failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The API answered with a non-success status.
    #[error("request to {url} failed with status {status}: {body}")]
    Api {
        /// Request URL (no credentials)
        url: String,
        /// HTTP status code
        status: u16,
        /// Response body, truncated
        body: String,
    },

    /// Transport-level HTTP error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A response body could not be decoded as JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other error (catch-all).
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl VcdError {
    /// Wraps an error from an organization lookup.
    ///
    /// # Example
    ///
    /// ```
    /// use vcdclient::VcdError;
    ///
    /// let err = VcdError::org_lookup("tenant1", VcdError::NotFound("org tenant1".to_string()));
    /// assert_eq!(
    ///     err.to_string(),
    ///     "unable to get vcd organization [tenant1]: not found: org tenant1"
    /// );
    /// ```
    pub fn org_lookup(org: impl Into<String>, err: VcdError) -> Self {
        Self::OrgLookup {
            org: org.into(),
            source: Box::new(err),
        }
    }

    /// Wraps an error from a VDC lookup.
    pub fn vdc_lookup(org: impl Into<String>, vdc: impl Into<String>, err: VcdError) -> Self {
        Self::VdcLookup {
            org: org.into(),
            vdc: vdc.into(),
            source: Box::new(err),
        }
    }

    /// Wraps an error from a user/password login.
    pub fn auth_failed(
        user_org: impl Into<String>,
        user: impl Into<String>,
        href: impl Into<String>,
        err: VcdError,
    ) -> Self {
        Self::AuthFailed {
            user_org: user_org.into(),
            user: user.into(),
            href: href.into(),
            source: Box::new(err),
        }
    }

    /// Returns true if the error (or anything it wraps) is a 401/403 from the API.
    pub fn is_unauthorized(&self) -> bool {
        match self {
            Self::Api { status, .. } => *status == 401 || *status == 403,
            Self::AuthFailed { source, .. }
            | Self::OrgLookup { source, .. }
            | Self::VdcLookup { source, .. } => source.is_unauthorized(),
            Self::TokenRefresh(source) => source.is_unauthorized(),
            _ => false,
        }
    }
}
