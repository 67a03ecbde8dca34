//! # Auth crate — credential validation and session arbitration
//!
//! Produces a single coherent session view across two authentication
//! backends and exposes a stable operation surface regardless of which one
//! is active.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`error`] | Typed failure taxonomy ([`AuthError`]) |
//! | [`settings`] | Remote service configuration (`config` crate: defaults → file → env) |
//! | [`session`] | The [`User`] identity and persisted session-marker shape |
//! | [`local`] | Credential store + session marker in the durable KV store, no network |
//! | [`remote`] | [`RemoteIdentity`] contract and auth-change events |
//! | [`http_remote`] | `reqwest`-backed remote client speaking a GoTrue-style REST surface |
//! | [`resolver`] | [`AuthResolver`] — login/register/logout/OAuth with remote-first, local-fallback arbitration |

pub mod error;
pub mod http_remote;
pub mod local;
pub mod remote;
pub mod resolver;
pub mod session;
pub mod settings;

mod password;

pub use error::AuthError;
pub use http_remote::HttpRemote;
pub use local::LocalBackend;
pub use remote::{AuthEvent, OAuthProvider, RemoteIdentity, RemoteSession};
pub use resolver::{validate_registration, AuthResolver};
pub use session::User;
pub use settings::Settings;
