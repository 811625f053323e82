//! Construction of [`VcdApi`] instances.
//!
//! A [`ClientManager`](crate::ClientManager) builds one API instance per
//! client it constructs. The factory decides which implementation that is.

use crate::backends::rest::RestApi;
use crate::{AuthConfig, Result, VcdApi};
use std::sync::Arc;

/// Factory function type for creating API instances.
pub type ApiFactory = Arc<dyn Fn(&AuthConfig) -> Result<Arc<dyn VcdApi>> + Send + Sync>;

/// Factory producing the HTTP implementation.
///
/// # Example
///
/// ```
/// use vcdclient::factory::rest_factory;
/// use vcdclient::AuthConfig;
///
/// let factory = rest_factory();
/// let auth = AuthConfig::new("https://vcd.example.com", "admin", "pw", "", "tenant1", false);
/// let api = factory(&auth).unwrap();
/// assert_eq!(api.name(), "rest");
/// ```
pub fn rest_factory() -> ApiFactory {
    Arc::new(|auth: &AuthConfig| {
        let api: Arc<dyn VcdApi> = Arc::new(RestApi::new(auth)?);
        Ok(api)
    })
}

/// Factory handing out one shared mock site.
///
/// Every client constructed through it talks to the same [`MockApi`], so
/// call counters cover the whole manager.
///
/// [`MockApi`]: crate::backends::mock::MockApi
#[cfg(feature = "mock")]
pub fn mock_factory(api: Arc<crate::backends::mock::MockApi>) -> ApiFactory {
    Arc::new(move |_auth: &AuthConfig| {
        let api: Arc<dyn VcdApi> = api.clone();
        Ok(api)
    })
}
