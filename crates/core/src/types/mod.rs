//! Core types for Velvet.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod auth;
pub mod cart;
pub mod claims;
pub mod email;
pub mod id;
pub mod product;
pub mod role;

pub use auth::{AuthResponse, LoginRequest, RegisterRequest, StatusMessage};
pub use cart::CartItem;
pub use email::{Email, EmailError};
pub use id::*;
pub use product::{NewProduct, Product, ProductError};
pub use role::{Role, RoleParseError};
