//! Authentication hook for connecting players.
//!
//! The server never issues tokens. The auth service signs a JWT carrying the
//! user's id and username; the browser presents it when it opens the game
//! socket, and an [`Authenticator`] turns it into an [`Identity`].

use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use rally_protocol::PlayerId;
use serde::{Deserialize, Serialize};

use crate::SessionError;

/// Who is on the other end of a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: PlayerId,
    pub display_name: String,
}

/// Validates a client's auth token and returns their identity.
///
/// # Example
///
/// ```rust
/// use rally_protocol::PlayerId;
/// use rally_session::{Authenticator, Identity, SessionError};
///
/// /// Accepts `"<id>:<name>"`. Development only.
/// struct DevAuthenticator;
///
/// impl Authenticator for DevAuthenticator {
///     async fn authenticate(&self, token: &str) -> Result<Identity, SessionError> {
///         let (id, name) = token
///             .split_once(':')
///             .ok_or_else(|| SessionError::AuthFailed("expected id:name".into()))?;
///         let id = id
///             .parse()
///             .map_err(|_| SessionError::AuthFailed("id must be a number".into()))?;
///         Ok(Identity { id: PlayerId(id), display_name: name.to_string() })
///     }
/// }
/// ```
pub trait Authenticator: Send + Sync + 'static {
    fn authenticate(
        &self,
        token: &str,
    ) -> impl std::future::Future<Output = Result<Identity, SessionError>> + Send;
}

/// Claims issued by the auth service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtClaims {
    pub id: u64,
    pub username: String,
    /// Expiry (Unix seconds). Checked when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<u64>,
}

/// HS256 JWT validation against a shared secret.
#[derive(Clone)]
pub struct JwtAuthenticator {
    key: DecodingKey,
    validation: Validation,
}

impl JwtAuthenticator {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.required_spec_claims.clear();
        validation.validate_aud = false;
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Synchronous validation, shared by the async trait impl.
    pub fn verify(&self, token: &str) -> Result<Identity, SessionError> {
        let data = decode::<JwtClaims>(token, &self.key, &self.validation)
            .map_err(|e| SessionError::AuthFailed(e.to_string()))?;
        let claims = data.claims;
        if claims.username.trim().is_empty() {
            return Err(SessionError::AuthFailed("missing username claim".into()));
        }
        Ok(Identity {
            id: PlayerId(claims.id),
            display_name: claims.username,
        })
    }
}

impl Authenticator for JwtAuthenticator {
    async fn authenticate(&self, token: &str) -> Result<Identity, SessionError> {
        self.verify(token)
    }
}
