//! DigitRestau Core - Shared domain types.
//!
//! This crate provides the types shared by every DigitRestau component:
//! - `client` - Session and state reconciliation engine
//! - `cli` - Command-line front end
//!
//! # Architecture
//!
//! The core crate contains only types and pure helpers - no I/O, no storage
//! access, no HTTP clients. This keeps it lightweight and allows it to be used
//! anywhere, including in tests that never touch a network.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for identifiers, emails, prices and statuses
//! - [`models`] - Catalog, order, cart and user entities

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod models;
pub mod types;

pub use models::*;
pub use types::*;
