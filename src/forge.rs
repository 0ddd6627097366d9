//! Interface to the repository hosting service.
//!
//! The cascade core only talks to the [`traits::Forge`] trait; the Bitbucket
//! Cloud implementation lives in [`bitbucket`].

/// Bitbucket Cloud REST API client implementation.
pub mod bitbucket;

/// Configuration and authentication for the hosting service.
pub mod config;

/// Typed requests and responses shared by every forge implementation.
pub mod request;

/// Common traits for hosting service abstraction.
pub mod traits;
