//! # SarWatch Cloud
//!
//! Client for the remote processing service that hosts building footprints,
//! Sentinel-1 radar stacks and population rasters.
//!
//! The analysis pipeline talks to data through the [`provider`] traits. This
//! crate implements them with an async [`ServiceClient`], a blocking
//! [`ServiceProvider`] facade and an LRU [`CachedRadarProvider`].
//!
//! ## Features
//!
//! - `native` (default): Blocking API via tokio `block_on`

pub mod auth;
pub mod cache;
pub mod client;
pub mod error;
pub mod http;
pub mod models;
pub mod provider;

pub mod sync_api;

pub use auth::{CloudAuth, NoAuth, ServiceAccount, ServiceAccountAuth};
pub use cache::CachedRadarProvider;
pub use client::{ServiceClient, ServiceClientOptions, SERVICE_URL_ENV};
pub use error::{CloudError, Result};
pub use provider::{FootprintProvider, PopulationProvider, RadarProvider, RadarQuery};

#[cfg(feature = "native")]
pub use sync_api::ServiceProvider;
