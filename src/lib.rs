//! vcdclient - Cached, credential-refreshing client for VMware Cloud Director.
//!
//! A storage driver needs one authenticated handle to its VCD site, shared by
//! every task, with a bearer token that is renewed before it runs out. This
//! crate provides that handle and the object that owns it.
//!
//! # Features
//!
//! - **One client per connection**: [`ClientManager`] returns the cached
//!   [`Client`] while the connection parameters stay the same
//! - **Token refresh**: API refresh tokens or user/password, sysadmin aware
//! - **Cluster resolution**: the cluster organization and VDC are re-resolved
//!   on every refresh
//! - **Secrets stay secret**: passwords and tokens never show up in `Debug`,
//!   errors or logs
//! - **Testable**: the site sits behind the [`VcdApi`] trait, with an
//!   in-memory [`MockApi`](backends::mock::MockApi) behind the `mock` feature
//!
//! # Quick Start
//!
//! ```no_run
//! use vcdclient::{ClientManager, ConnectParams};
//!
//! #[tokio::main]
//! async fn main() -> vcdclient::Result<()> {
//!     // Created once, passed to whatever needs the site
//!     let manager = ClientManager::new();
//!
//!     let params = ConnectParams::new("https://vcd.example.com", "tenant1", "ovdc1")
//!         .with_vapp("k8s-cluster")
//!         .with_refresh_token("tenant1", "api-refresh-token")
//!         .with_vdc_client(true);
//!
//!     let client = manager.get_client(&params).await?;
//!
//!     // Refreshes first if the token is about to expire
//!     let api = client.fresh_api_client().await?;
//!     let orgs: serde_json::Value = api.get_json("1.0.0/orgs").await?;
//!     println!("{}", orgs);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Feature Flags
//!
//! | Feature | Default | Provides |
//! |---------|---------|----------|
//! | `mock` | yes | [`backends::mock::MockApi`] and [`factory::mock_factory`] |

pub mod api;
pub mod backends;
pub mod client;
pub mod cloudapi;
pub mod config;
pub mod entity;
pub mod error;
pub mod factory;
pub mod manager;
pub mod session;
pub mod validation;

pub use api::VcdApi;
pub use client::Client;
pub use cloudapi::CloudApiClient;
pub use config::{AuthConfig, ConnectParams};
pub use entity::{EntityRef, Org, Vdc};
pub use error::{Result, VcdError};
pub use manager::ClientManager;
pub use session::{BearerToken, TokenKind};
