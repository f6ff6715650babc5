use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{TokenGenerator, parse_token};
use crate::error::{Error, Result};
use crate::server::AppState;
use crate::store::Store;
use crate::types::{Token, User};

const ISSUE_ATTEMPTS: usize = 3;

#[derive(Debug)]
pub enum TokenValidationError {
    InvalidScheme,
    InvalidToken,
    TokenExpired,
    InternalError,
}

pub struct ValidatedToken {
    pub token: Token,
    pub user: User,
}

/// Extracts `(username, password)` from a Basic auth header.
pub fn extract_basic_credentials(header: &str) -> Option<(String, String)> {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;

    let encoded = header.strip_prefix("Basic ")?;
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let credentials = String::from_utf8(decoded).ok()?;

    let (username, password) = credentials.split_once(':')?;
    if username.is_empty() {
        return None;
    }

    Some((username.to_string(), password.to_string()))
}

/// Extracts a bearer token from the Authorization header.
/// Returns None if no auth header is present.
pub fn extract_bearer_token(
    auth_header: Option<&str>,
) -> std::result::Result<Option<String>, TokenValidationError> {
    match auth_header {
        Some(header) => match header.strip_prefix("Bearer ") {
            Some(token) if !token.trim().is_empty() => Ok(Some(token.trim().to_string())),
            Some(_) => Err(TokenValidationError::InvalidToken),
            None => Err(TokenValidationError::InvalidScheme),
        },
        None => Ok(None),
    }
}

/// Validates a raw token string against the store.
/// Returns the token together with the user it belongs to.
pub fn validate_token(
    state: &Arc<AppState>,
    raw_token: &str,
) -> std::result::Result<ValidatedToken, TokenValidationError> {
    let (lookup, _secret) =
        parse_token(raw_token).map_err(|_| TokenValidationError::InvalidToken)?;

    let token = state
        .store
        .get_token_by_lookup(&lookup)
        .map_err(|_| TokenValidationError::InternalError)?
        .ok_or(TokenValidationError::InvalidToken)?;

    let generator = TokenGenerator::new();
    if !generator
        .verify(raw_token, &token.token_hash)
        .map_err(|_| TokenValidationError::InternalError)?
    {
        return Err(TokenValidationError::InvalidToken);
    }

    if let Some(expires_at) = &token.expires_at {
        if expires_at < &Utc::now() {
            return Err(TokenValidationError::TokenExpired);
        }
    }

    let user = state
        .store
        .get_user(token.user_id)
        .map_err(|_| TokenValidationError::InternalError)?
        .ok_or(TokenValidationError::InvalidToken)?;

    if let Err(e) = state.store.update_token_last_used(&token.id) {
        tracing::warn!("Failed to update token last_used_at: {e}");
    }

    Ok(ValidatedToken { token, user })
}

/// Checks a username and password against the stored hash.
/// Unknown users and wrong passwords both come back as `None`.
pub fn verify_credentials(store: &dyn Store, username: &str, password: &str) -> Result<Option<User>> {
    let Some(user) = store.get_user_by_username(username)? else {
        return Ok(None);
    };

    let generator = TokenGenerator::new();
    if generator.verify(password, &user.password_hash)? {
        Ok(Some(user))
    } else {
        Ok(None)
    }
}

/// Creates and stores a new token for `user_id`, returning the raw token.
/// Retries when the random lookup collides with an existing token.
pub fn issue_token(
    store: &dyn Store,
    user_id: i64,
    expires_at: Option<DateTime<Utc>>,
) -> Result<(Token, String)> {
    let generator = TokenGenerator::new();

    for _ in 0..ISSUE_ATTEMPTS {
        let (raw_token, lookup, hash) = generator.generate()?;
        let token = Token {
            id: Uuid::new_v4().to_string(),
            token_hash: hash,
            token_lookup: lookup,
            user_id,
            created_at: Utc::now(),
            expires_at,
            last_used_at: None,
        };

        match store.create_token(&token) {
            Ok(()) => return Ok((token, raw_token)),
            Err(Error::TokenLookupCollision) => {
                tracing::debug!("Token lookup collision, retrying");
            }
            Err(e) => return Err(e),
        }
    }

    Err(Error::TokenLookupCollision)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteStore;
    use crate::types::ROLE_ADMIN;
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;

    #[test]
    fn test_extract_basic_credentials() {
        let header = format!("Basic {}", STANDARD.encode("admin:s3cr:et"));
        let (user, pass) = extract_basic_credentials(&header).unwrap();
        assert_eq!(user, "admin");
        assert_eq!(pass, "s3cr:et");

        assert!(extract_basic_credentials("Basic !!!").is_none());
        assert!(extract_basic_credentials(&format!("Basic {}", STANDARD.encode(":pw"))).is_none());
        assert!(extract_basic_credentials("Bearer abc").is_none());
    }

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(
            extract_bearer_token(Some("Bearer abc")).unwrap(),
            Some("abc".to_string())
        );
        assert!(extract_bearer_token(None).unwrap().is_none());
        assert!(matches!(
            extract_bearer_token(Some("Basic abc")),
            Err(TokenValidationError::InvalidScheme)
        ));
        assert!(matches!(
            extract_bearer_token(Some("Bearer ")),
            Err(TokenValidationError::InvalidToken)
        ));
    }

    #[test]
    fn test_verify_credentials_and_issue_token() {
        let store = SqliteStore::in_memory().unwrap();
        store.initialize().unwrap();

        let hash = TokenGenerator::new().hash("sunshine").unwrap();
        let user = store.create_user("admin", &hash, ROLE_ADMIN).unwrap();

        assert!(verify_credentials(&store, "admin", "sunshine").unwrap().is_some());
        assert!(verify_credentials(&store, "admin", "wrong").unwrap().is_none());
        assert!(verify_credentials(&store, "nobody", "sunshine").unwrap().is_none());

        let (token, raw) = issue_token(&store, user.id, None).unwrap();
        assert!(raw.starts_with("solarhub_"));
        let stored = store.get_token_by_lookup(&token.token_lookup).unwrap().unwrap();
        assert_eq!(stored.user_id, user.id);
    }
}
