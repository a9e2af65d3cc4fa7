//! Core library for the superbank client.
//!
//! The bank server owns all business logic; this crate owns the client side
//! of the contract with it:
//!
//! - `auth`: credential persistence (`TokenStore`), the session context and
//!   the two-step login flow
//! - `api`: the authenticated HTTP client and typed banking endpoints
//! - `models`: request/response types for cards, transfers, payments, the
//!   assistant and credit products
//! - `utils`: phone/card formatting shared by every front end
//! - `config`: base URL and storage backend selection

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod utils;

pub use api::{ApiClient, ApiError};
pub use auth::{Session, TokenStore};
pub use config::Config;
