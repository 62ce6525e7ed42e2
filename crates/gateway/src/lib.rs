//! The documentation gateway.
//!
//! Ties the pipeline together: a [`PackageRegistry`] resolves package
//! versions to content hashes, the fetcher downloads bundles, the cache keeps
//! them, and HTML is rewritten on the way out. [`router`] exposes it all over
//! HTTP.

pub mod error;
mod registry;
mod routes;
mod service;

pub use crate::registry::{HttpRegistry, PackageRegistry, Release, StaticRegistry};
pub use crate::routes::{ClientKey, TrustedProxies, content_security_policy, router, serve};
pub use crate::service::{DocsService, Document, Eviction, ServiceStats, split_version};
