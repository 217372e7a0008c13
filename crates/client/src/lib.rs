//! Velvet client library.
//!
//! Everything a front end needs to talk to the Velvet API and keep local
//! state between runs:
//!
//! - [`storage`] - key/value persistence (in memory or a JSON file)
//! - [`token`] - unverified claim extraction from a stored token
//! - [`session`] - anonymous/authenticated state with change notifications
//! - [`cart`] - the persisted shopping cart
//! - [`api`] - HTTP access to the catalog and the auth endpoints
//!
//! # Example
//!
//! ```rust,ignore
//! let storage = Arc::new(FileStorage::new("velvet-state.json"));
//! let api = ApiClient::new(ClientConfig::new("http://localhost:5000")?);
//! let session = Arc::new(SessionStateHolder::new(Arc::clone(&storage), api.credential()));
//! let auth = AuthService::new(api.clone(), Arc::clone(&session), Arc::clone(&storage));
//!
//! auth.login(&LoginRequest::new("alice", "Passw0rd!")).await?;
//! assert!(session.load_state().await.is_authenticated());
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod cart;
pub mod config;
pub mod credential;
pub mod error;
pub mod session;
pub mod storage;
pub mod token;

pub use api::{ApiClient, AuthService, RegisterResult};
pub use cart::{CART_KEY, CartStore};
pub use config::ClientConfig;
pub use credential::BearerCredential;
pub use error::ClientError;
pub use session::{AUTH_TOKEN_KEY, SessionState, SessionStateHolder, SubscriptionId};
pub use storage::{FileStorage, MemoryStorage, Storage, StorageError};
pub use token::{Claim, find_claim, parse_claims};
