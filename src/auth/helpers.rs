use std::sync::Arc;

use chrono::Utc;

use super::{TokenGenerator, parse_token};
use crate::server::AppState;
use crate::types::Token;

#[derive(Debug)]
pub enum TokenValidationError {
    InvalidScheme,
    InvalidToken,
    TokenExpired,
    InternalError,
}

/// Validates a raw admin token string against the store.
pub fn validate_token(
    state: &Arc<AppState>,
    raw_token: &str,
) -> Result<Token, TokenValidationError> {
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

    if let Err(e) = state.store.update_token_last_used(&token.id) {
        tracing::warn!("Failed to update token last_used_at: {e}");
    }

    Ok(token)
}

/// Extracts the token from a Bearer Authorization header.
/// Returns None if no auth header is present.
pub fn extract_token_from_header(
    auth_header: Option<&str>,
) -> Result<Option<String>, TokenValidationError> {
    match auth_header {
        Some(header) if header.starts_with("Bearer ") => {
            Ok(header.strip_prefix("Bearer ").map(ToString::to_string))
        }
        Some(_) => Err(TokenValidationError::InvalidScheme),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_bearer_token() {
        let token = extract_token_from_header(Some("Bearer abc123")).unwrap();
        assert_eq!(token.as_deref(), Some("abc123"));
    }

    #[test]
    fn test_extract_missing_header() {
        assert!(extract_token_from_header(None).unwrap().is_none());
    }

    #[test]
    fn test_extract_unsupported_scheme() {
        let result = extract_token_from_header(Some("Basic dXNlcjpwdw=="));
        assert!(matches!(result, Err(TokenValidationError::InvalidScheme)));
    }
}
