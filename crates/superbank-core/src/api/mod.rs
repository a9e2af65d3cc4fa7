//! REST API client module for the bank server.
//!
//! This module provides the `ApiClient` for talking to the bank's HTTP
//! backend: login and registration, cards, history, transfers, payments,
//! the AI assistant and credit products.
//!
//! Requests carry the session's bearer token, except for the login and
//! registration endpoints. A 401 response clears the session.

pub mod client;
pub mod error;

pub use client::ApiClient;
pub use error::ApiError;
