//! [`VcdApi`](crate::VcdApi) implementations.

pub mod rest;

#[cfg(feature = "mock")]
pub mod mock;
