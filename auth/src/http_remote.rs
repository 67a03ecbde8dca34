//! # HTTP remote identity client
//!
//! [`HttpRemote`] implements [`RemoteIdentity`] against a GoTrue-style REST
//! surface (the auth API exposed by Supabase and compatible services):
//!
//! | Operation | Endpoint |
//! |-----------|----------|
//! | password sign-in | `POST /auth/v1/token?grant_type=password` |
//! | sign-up | `POST /auth/v1/signup` |
//! | sign-out | `POST /auth/v1/logout` |
//! | OAuth delegation | `GET /auth/v1/authorize?provider=…&redirect_to=…` |
//!
//! The publishable API key rides every request in the `apikey` header.
//!
//! Like the service's official browser client, the session is mirrored
//! client-side: a successful sign-in stores the [`RemoteSession`] and
//! publishes [`AuthEvent::SignedIn`] on the broadcast channel; sign-out
//! clears it and publishes [`AuthEvent::SignedOut`]. `get_session` answers
//! from that mirror without a network round trip.

use std::sync::{Arc, Mutex};

use serde::Deserialize;
use tokio::sync::broadcast;
use tracing::debug;

use crate::error::AuthError;
use crate::remote::{AuthEvent, OAuthProvider, RemoteIdentity, RemoteSession};
use crate::settings::Remote;

const EVENT_CHANNEL_CAPACITY: usize = 16;

/// Successful token / sign-up response body.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    user: RemoteUser,
}

#[derive(Debug, Deserialize)]
struct RemoteUser {
    id: String,
    email: String,
}

/// Error response body. The service is inconsistent about the field name,
/// so all known spellings are accepted.
#[derive(Debug, Default, Deserialize)]
struct ErrorResponse {
    msg: Option<String>,
    error_description: Option<String>,
    error: Option<String>,
}

impl ErrorResponse {
    fn message(self, status: reqwest::StatusCode) -> String {
        self.msg
            .or(self.error_description)
            .or(self.error)
            .unwrap_or_else(|| format!("http status {status}"))
    }
}

/// GoTrue-style remote identity client.
pub struct HttpRemote {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
    session: Arc<Mutex<Option<RemoteSession>>>,
    events: broadcast::Sender<AuthEvent>,
}

impl HttpRemote {
    pub fn new(remote: &Remote) -> Result<Self, AuthError> {
        let client = reqwest::ClientBuilder::new()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| AuthError::Remote(e.to_string()))?;
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Ok(Self {
            base_url: remote.url.trim_end_matches('/').to_string(),
            api_key: remote.key.clone(),
            client,
            session: Arc::new(Mutex::new(None)),
            events,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/auth/v1/{path}", self.base_url)
    }

    async fn read_error(response: reqwest::Response) -> AuthError {
        let status = response.status();
        let body: ErrorResponse = response.json().await.unwrap_or_default();
        let message = body.message(status);
        if status.as_u16() == 422 || message.to_lowercase().contains("already registered") {
            AuthError::EmailAlreadyRegistered
        } else if status == reqwest::StatusCode::BAD_REQUEST
            && message.to_lowercase().contains("invalid login credentials")
        {
            AuthError::InvalidCredentials
        } else {
            AuthError::Remote(message)
        }
    }

    fn set_session(&self, session: Option<RemoteSession>) {
        *self.session.lock().unwrap() = session.clone();
        // Nobody listening is fine
        let _ = self.events.send(match session {
            Some(s) => AuthEvent::SignedIn(s),
            None => AuthEvent::SignedOut,
        });
    }
}

impl RemoteIdentity for HttpRemote {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<RemoteSession, AuthError> {
        let response = self
            .client
            .post(self.endpoint("token?grant_type=password"))
            .header("apikey", &self.api_key)
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(|e| AuthError::Remote(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::read_error(response).await);
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::Remote(e.to_string()))?;
        let session = RemoteSession {
            user_id: token.user.id,
            email: token.user.email,
            access_token: token.access_token,
        };
        self.set_session(Some(session.clone()));
        Ok(session)
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<(), AuthError> {
        let response = self
            .client
            .post(self.endpoint("signup"))
            .header("apikey", &self.api_key)
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(|e| AuthError::Remote(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::read_error(response).await);
        }
        debug!(email, "remote sign-up accepted");
        Ok(())
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        let token = self
            .session
            .lock()
            .unwrap()
            .as_ref()
            .map(|s| s.access_token.clone());

        if let Some(token) = token {
            let response = self
                .client
                .post(self.endpoint("logout"))
                .header("apikey", &self.api_key)
                .bearer_auth(token)
                .send()
                .await
                .map_err(|e| AuthError::Remote(e.to_string()))?;
            if !response.status().is_success() {
                return Err(Self::read_error(response).await);
            }
        }
        self.set_session(None);
        Ok(())
    }

    async fn get_session(&self) -> Option<RemoteSession> {
        self.session.lock().unwrap().clone()
    }

    async fn sign_in_with_oauth(
        &self,
        provider: OAuthProvider,
        redirect_to: &str,
    ) -> Result<(), AuthError> {
        let response = self
            .client
            .get(self.endpoint("authorize"))
            .header("apikey", &self.api_key)
            .query(&[("provider", provider.as_str()), ("redirect_to", redirect_to)])
            .send()
            .await
            .map_err(|e| AuthError::Remote(e.to_string()))?;

        // The service answers the delegation with a redirect to the
        // provider's consent page. Anything else is a rejection (e.g. a
        // provider the service does not support).
        let status = response.status();
        if status.is_redirection() || status.is_success() {
            debug!(provider = provider.as_str(), "oauth delegation dispatched");
            Ok(())
        } else {
            Err(Self::read_error(response).await)
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn remote() -> HttpRemote {
        HttpRemote::new(&Remote {
            url: "https://auth.example.com/".into(),
            key: "anon".into(),
            redirect: String::new(),
        })
        .unwrap()
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let remote = remote();
        assert_eq!(
            remote.endpoint("signup"),
            "https://auth.example.com/auth/v1/signup"
        );
    }

    #[tokio::test]
    async fn test_session_mirror_and_events() {
        let remote = remote();
        let mut events = remote.subscribe();
        assert!(remote.get_session().await.is_none());

        let session = RemoteSession {
            user_id: "uid-1".into(),
            email: "a@x.com".into(),
            access_token: "tok".into(),
        };
        remote.set_session(Some(session.clone()));
        assert_eq!(remote.get_session().await, Some(session));
        assert!(matches!(events.recv().await, Ok(AuthEvent::SignedIn(_))));

        remote.set_session(None);
        assert!(remote.get_session().await.is_none());
        assert!(matches!(events.recv().await, Ok(AuthEvent::SignedOut)));
    }

    #[test]
    fn test_error_message_spellings() {
        let body = ErrorResponse {
            msg: None,
            error_description: Some("provider is not enabled".into()),
            error: None,
        };
        assert_eq!(
            body.message(reqwest::StatusCode::BAD_REQUEST),
            "provider is not enabled"
        );

        let empty = ErrorResponse::default();
        assert_eq!(
            empty.message(reqwest::StatusCode::BAD_GATEWAY),
            "http status 502 Bad Gateway"
        );
    }
}
