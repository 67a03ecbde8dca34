//! # Remote identity backend contract
//!
//! [`RemoteIdentity`] is the seam between the resolver and an external
//! identity service. The wire protocol is the implementation's business
//! ([`crate::HttpRemote`] speaks a GoTrue-style REST surface); the resolver
//! only relies on the operations below plus the auth-change event stream.
//!
//! Auth-change events ride a `tokio::sync::broadcast` channel so the
//! process-lifetime subscription in the resolver and any number of other
//! listeners can observe sign-ins and sign-outs independently.

use std::future::Future;
use std::str::FromStr;

use tokio::sync::broadcast;

use crate::error::AuthError;

/// Third-party sign-in providers the system understands.
///
/// A closed set: arbitrary strings fail at the boundary with
/// [`AuthError::UnsupportedProvider`] instead of being forwarded for the
/// remote service to reject at runtime. Note the service itself may still
/// reject `Naver` as unsupported; that surfaces as a normal
/// [`AuthError::Remote`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OAuthProvider {
    Google,
    Naver,
}

impl OAuthProvider {
    /// Provider name as sent on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            OAuthProvider::Google => "google",
            OAuthProvider::Naver => "naver",
        }
    }
}

impl FromStr for OAuthProvider {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "google" => Ok(OAuthProvider::Google),
            "naver" => Ok(OAuthProvider::Naver),
            other => Err(AuthError::UnsupportedProvider(other.to_string())),
        }
    }
}

/// An authenticated session as reported by the remote service.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteSession {
    /// Remote-assigned opaque user id.
    pub user_id: String,
    pub email: String,
    pub access_token: String,
}

/// Auth-state change notification from the remote backend.
#[derive(Clone, Debug)]
pub enum AuthEvent {
    SignedIn(RemoteSession),
    SignedOut,
}

/// Async contract for an external identity service.
pub trait RemoteIdentity {
    fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = Result<RemoteSession, AuthError>>;

    fn sign_up(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = Result<(), AuthError>>;

    fn sign_out(&self) -> impl Future<Output = Result<(), AuthError>>;

    /// The currently active remote session, if any.
    fn get_session(&self) -> impl Future<Output = Option<RemoteSession>>;

    /// Dispatch a redirect-based OAuth sign-in. Returns once the delegation
    /// has been dispatched; the eventual session arrives via the event
    /// stream, not as a return value.
    fn sign_in_with_oauth(
        &self,
        provider: OAuthProvider,
        redirect_to: &str,
    ) -> impl Future<Output = Result<(), AuthError>>;

    /// Subscribe to auth-state changes.
    fn subscribe(&self) -> broadcast::Receiver<AuthEvent>;
}
