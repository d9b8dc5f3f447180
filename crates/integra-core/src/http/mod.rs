//! HTTP transport for remote REST APIs
//!
//! This module provides:
//! - The [`Transport`] seam the request orchestrator talks through
//! - A blocking `reqwest` implementation with basic authentication
//! - Credential handling with environment variable fallback

pub mod auth;
pub mod client;

pub use auth::Credentials;
pub use client::{HttpClientConfig, HttpTransport, Transport};

// Re-export commonly used types
pub use reqwest::{Method, StatusCode};
