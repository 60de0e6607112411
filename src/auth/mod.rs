//! Session state and the unauthorized-prompt hand-off.
//!
//! # Overview
//!
//! - [`Session`]: The persisted credential record (token, role, name)
//! - [`CredentialStore`]: Where the session lives between requests and restarts
//! - [`MemoryCredentialStore`] / [`FileCredentialStore`]: The provided stores
//! - [`AuthNotificationBridge`]: Lets the client ask the UI for an
//!   "unauthorized" prompt
//!
//! The client reads the store on every request and clears it when the backend
//! rejects the session.
//!
//! # Example
//!
//! ```rust
//! use bakery_api::auth::{CredentialStore, MemoryCredentialStore};
//! use bakery_api::Session;
//!
//! let store = MemoryCredentialStore::new();
//! store.save(&Session::new("token", "branch", "Kemang")).unwrap();
//!
//! let session = store.load().unwrap().unwrap();
//! assert_eq!(session.role, "branch");
//! ```

mod notifier;
pub mod session;
mod store;

pub use notifier::{AuthNotificationBridge, AuthNotificationHandler, BridgeRegistration};
pub use session::Session;
pub use store::{CredentialStore, FileCredentialStore, MemoryCredentialStore};
