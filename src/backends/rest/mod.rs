//! HTTP implementation of the control-plane API.
//!
//! Talks to the site's OAuth token endpoint, the `/cloudapi` session
//! endpoints and the `/cloudapi/1.0.0` org and VDC collections.
//!
//! # Authentication
//!
//! - API refresh token: `POST /oauth/tenant/{org}/token` (or
//!   `/oauth/provider/token` for the `system` org) with a
//!   `grant_type=refresh_token` form
//! - User/password: `POST /cloudapi/1.0.0/sessions` (or
//!   `/sessions/provider`) with Basic auth `user@org:password`; the bearer
//!   token comes back in the `X-VMWARE-VCLOUD-ACCESS-TOKEN` header
//!
//! # Example
//!
//! ```no_run
//! use vcdclient::{ClientManager, ConnectParams};
//!
//! #[tokio::main]
//! async fn main() -> vcdclient::Result<()> {
//!     let manager = ClientManager::new();
//!     let params = ConnectParams::new("https://vcd.example.com", "tenant1", "ovdc1")
//!         .with_refresh_token("tenant1", "api-token")
//!         .with_vdc_client(true);
//!
//!     let client = manager.get_client(&params).await?;
//!     println!("vdc: {:?}", client.vdc().await);
//!     Ok(())
//! }
//! ```

mod api;

pub use api::RestApi;
