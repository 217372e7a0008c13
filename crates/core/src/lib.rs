//! Velvet Core - Shared types library.
//!
//! This crate provides the types shared by every Velvet component:
//! - `api` - HTTP server issuing tokens and serving the product catalog
//! - `client` - Session and cart library used by front ends
//! - `cli` - Command-line tools for migrations and seeding
//!
//! # Architecture
//!
//! The core crate contains only types and constants - no I/O, no database
//! access, no HTTP clients. Both sides of the token flow agree on claim names
//! and wire DTOs through this crate.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, emails, roles, products, cart items and auth DTOs

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
