//! Connection parameter validation.
//!
//! Names end up inside request paths and `filter=` expressions, so anything
//! that could change the shape of a URL is rejected before connecting.

use crate::config::MAX_SESSION_TTL;
use crate::{ConnectParams, Result, VcdError};
use url::Url;

/// Characters that would alter a path segment or a FIQL filter.
const URL_UNSAFE_CHARS: &str = "/?#;,=";

/// Maximum allowed length for entity names.
const MAX_NAME_LENGTH: usize = 255;

/// Validates a site URL.
///
/// The host must be an absolute `http` or `https` URL without a query or
/// fragment.
///
/// # Example
///
/// ```
/// use vcdclient::validation::validate_host;
///
/// assert!(validate_host("https://vcd.example.com").is_ok());
/// assert!(validate_host("https://vcd.example.com/api").is_ok());
///
/// assert!(validate_host("").is_err());
/// assert!(validate_host("vcd.example.com").is_err());
/// assert!(validate_host("ftp://vcd.example.com").is_err());
/// ```
pub fn validate_host(host: &str) -> Result<()> {
    if host.trim().is_empty() {
        return Err(VcdError::InvalidConfig("host cannot be empty".to_string()));
    }

    let url = Url::parse(host.trim())
        .map_err(|e| VcdError::InvalidConfig(format!("host [{}] is not a valid URL: {}", host, e)))?;

    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(VcdError::InvalidConfig(format!(
            "host [{}] must use http or https",
            host
        )));
    }

    if url.host_str().is_none() {
        return Err(VcdError::InvalidConfig(format!("host [{}] has no hostname", host)));
    }

    if url.query().is_some() || url.fragment().is_some() {
        return Err(VcdError::InvalidConfig(format!(
            "host [{}] must not carry a query or fragment",
            host
        )));
    }

    Ok(())
}

/// Validates an organization, VDC or vApp name.
///
/// # Errors
///
/// Returns [`VcdError::InvalidConfig`] naming `what` if the name is empty,
/// too long, or contains control or URL-unsafe characters.
pub fn validate_name(name: &str, what: &str) -> Result<()> {
    if name.is_empty() {
        return Err(VcdError::InvalidConfig(format!("{} cannot be empty", what)));
    }

    if name.len() > MAX_NAME_LENGTH {
        return Err(VcdError::InvalidConfig(format!(
            "{} exceeds maximum length of {} characters",
            what, MAX_NAME_LENGTH
        )));
    }

    if name.chars().any(|c| c.is_control()) {
        return Err(VcdError::InvalidConfig(format!(
            "{} contains control characters",
            what
        )));
    }

    if name.chars().any(|c| URL_UNSAFE_CHARS.contains(c)) {
        return Err(VcdError::InvalidConfig(format!(
            "{} [{}] contains URL-unsafe characters (not allowed: {})",
            what, name, URL_UNSAFE_CHARS
        )));
    }

    Ok(())
}

/// Validates a full set of connection parameters.
///
/// # Errors
///
/// - [`VcdError::InvalidConfig`] for a malformed host or name, or a session
///   TTL that is zero or longer than [`MAX_SESSION_TTL`]
/// - [`VcdError::MissingCredentials`] if neither a refresh token nor a
///   user/password pair is configured
pub fn validate_params(params: &ConnectParams) -> Result<()> {
    validate_host(&params.host)?;
    validate_name(&params.org, "org")?;
    validate_name(&params.user_org, "user org")?;

    if params.get_vdc_client || !params.vdc.is_empty() {
        validate_name(&params.vdc, "vdc")?;
    }

    if !params.vapp.is_empty() {
        validate_name(&params.vapp, "vapp")?;
    }

    if params.session_ttl.is_zero() || params.session_ttl > MAX_SESSION_TTL {
        return Err(VcdError::InvalidConfig(format!(
            "session ttl of {}s must be between 1s and {}s",
            params.session_ttl.as_secs(),
            MAX_SESSION_TTL.as_secs()
        )));
    }

    let auth = params.auth_config();
    if !auth.has_credentials() {
        return Err(VcdError::MissingCredentials {
            user_org: auth.user_org.clone(),
            user: auth.user.clone(),
            href: auth.href(),
        });
    }

    Ok(())
}
