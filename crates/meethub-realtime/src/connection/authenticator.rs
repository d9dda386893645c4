//! WebSocket authentication — validates the JWT presented at handshake.

use std::sync::Arc;

use meethub_auth::jwt::decoder::JwtDecoder;
use meethub_core::error::AppError;
use meethub_core::types::id::{SessionId, UserId};
use meethub_entity::user::UserRole;

/// Authenticated connection info extracted from the JWT.
#[derive(Debug, Clone)]
pub struct AuthenticatedConnection {
    /// User ID.
    pub user_id: UserId,
    /// Session ID.
    pub session_id: SessionId,
    /// User role.
    pub role: UserRole,
    /// Username.
    pub username: String,
}

/// Authenticates WebSocket connections using JWT tokens.
#[derive(Clone)]
pub struct WsAuthenticator {
    /// JWT decoder.
    decoder: Arc<JwtDecoder>,
}

impl std::fmt::Debug for WsAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WsAuthenticator").finish()
    }
}

impl WsAuthenticator {
    /// Creates a new WebSocket authenticator.
    pub fn new(decoder: Arc<JwtDecoder>) -> Self {
        Self { decoder }
    }

    /// Authenticates a connection using a JWT token (handshake auth
    /// field or Authorization header).
    pub fn authenticate(&self, token: &str) -> Result<AuthenticatedConnection, AppError> {
        let claims = self.decoder.decode_access_token(token)?;

        Ok(AuthenticatedConnection {
            user_id: UserId::from_uuid(claims.user_id()),
            session_id: SessionId::from_uuid(claims.session_id()),
            role: claims.role,
            username: claims.username,
        })
    }
}
