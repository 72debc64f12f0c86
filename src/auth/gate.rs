//! Identity gate
//!
//! Turns the credential headers of a request into the owner id that scopes
//! every profile operation. Runs before any store access.

use tracing::warn;

use super::jwt::{extract_token_from_header, JwtValidator};
use crate::types::GroveError;

/// Authenticated caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub owner_id: String,
}

/// Verify the caller's credential.
///
/// `authorization` is the `Authorization` header, `auth_token` the legacy
/// `x-auth-token` header. Authorization wins when both are sent.
pub fn authenticate(
    jwt: &JwtValidator,
    authorization: Option<&str>,
    auth_token: Option<&str>,
) -> Result<Identity, GroveError> {
    let raw = [authorization, auth_token]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|h| !h.is_empty());

    let Some(raw) = raw else {
        return Err(GroveError::Unauthenticated(
            "No token, authorization denied".into(),
        ));
    };

    let Some(token) = extract_token_from_header(Some(raw)) else {
        warn!("Rejected malformed credential header");
        return Err(GroveError::InvalidCredential("Token is not valid".into()));
    };

    let result = jwt.verify_token(token);
    match result.claims {
        Some(claims) if result.valid => Ok(Identity {
            owner_id: claims.user.id,
        }),
        _ => {
            let reason = result.error.unwrap_or_else(|| "Token is not valid".into());
            warn!(reason = %reason, "JWT verification failed");
            Err(GroveError::InvalidCredential(reason))
        }
    }
}
