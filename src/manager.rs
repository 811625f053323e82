//! Owner of the cached client.
//!
//! One [`ClientManager`] is created at process start and passed to whatever
//! needs a VCD connection. It holds at most one [`Client`]; asking for a
//! client with the same connection parameters returns the cached one, asking
//! with different parameters replaces it.

use crate::factory::{rest_factory, ApiFactory};
use crate::{Client, ConnectParams, Result};
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Caches one [`Client`] keyed by its connection parameters.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use vcdclient::backends::mock::MockApi;
/// use vcdclient::factory::mock_factory;
/// use vcdclient::{ClientManager, ConnectParams};
///
/// #[tokio::main]
/// async fn main() -> vcdclient::Result<()> {
///     let site = Arc::new(MockApi::new());
///     site.add_org("tenant1").await;
///     site.add_vdc("tenant1", "ovdc1").await;
///     site.add_user("tenant1", "csi", "pw").await;
///
///     let manager = ClientManager::with_factory(mock_factory(site.clone()));
///     let params = ConnectParams::new("https://vcd.example.com", "tenant1", "ovdc1")
///         .with_user_credentials("tenant1", "csi", "pw");
///
///     let first = manager.get_client(&params).await?;
///     let second = manager.get_client(&params).await?;
///     assert!(Arc::ptr_eq(&first, &second));
///     assert_eq!(site.logins(), 1);
///     Ok(())
/// }
/// ```
pub struct ClientManager {
    factory: ApiFactory,
    cached: Mutex<Option<Arc<Client>>>,
}

impl ClientManager {
    /// Creates a manager whose clients talk to the site over HTTP.
    pub fn new() -> Self {
        Self::with_factory(rest_factory())
    }

    /// Creates a manager that builds its API instances with `factory`.
    pub fn with_factory(factory: ApiFactory) -> Self {
        Self {
            factory,
            cached: Mutex::new(None),
        }
    }

    /// Returns the cached client if it matches `params`, otherwise connects a
    /// new one and caches it.
    ///
    /// Creation is serialized, so concurrent callers with the same parameters
    /// share a single login. If connecting fails the previous client stays
    /// cached.
    ///
    /// # Errors
    ///
    /// Returns any error from [`Client::connect`].
    pub async fn get_client(&self, params: &ConnectParams) -> Result<Arc<Client>> {
        let mut cached = self.cached.lock().await;

        if let Some(client) = cached.as_ref() {
            if client.matches(params) {
                tracing::debug!(host = %params.host, org = %params.org, "reusing cached vcd client");
                return Ok(Arc::clone(client));
            }
            tracing::debug!(host = %params.host, org = %params.org, "connection parameters changed");
        }

        let api = (self.factory)(&params.auth_config())?;
        let client = Arc::new(Client::connect(api, params).await?);
        *cached = Some(Arc::clone(&client));

        Ok(client)
    }

    /// Returns the cached client, if any.
    pub async fn cached(&self) -> Option<Arc<Client>> {
        self.cached.lock().await.clone()
    }

    /// Drops the cached client.
    ///
    /// Holders of an `Arc<Client>` keep using it; the next
    /// [`get_client`](Self::get_client) connects anew.
    pub async fn clear(&self) {
        self.cached.lock().await.take();
    }
}

impl Default for ClientManager {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ClientManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientManager").finish_non_exhaustive()
    }
}
