use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::Response,
};
use std::collections::HashSet;

use crate::api::state::AppState;

/// Decides whether a bearer token may call the API.
pub trait TokenValidator: Send + Sync {
    fn validate(&self, token: &str) -> bool;
}

/// Accepts a fixed set of tokens, typically from `API_TOKENS`.
#[derive(Debug, Default)]
pub struct StaticTokens {
    tokens: HashSet<String>,
}

impl StaticTokens {
    pub fn new(tokens: impl IntoIterator<Item = String>) -> Self {
        Self {
            tokens: tokens.into_iter().filter(|t| !t.is_empty()).collect(),
        }
    }
}

impl TokenValidator for StaticTokens {
    fn validate(&self, token: &str) -> bool {
        self.tokens.contains(token)
    }
}

pub async fn bearer_auth(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    if !state.config.config.auth.enabled {
        return Ok(next.run(request).await);
    }

    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim);

    match token {
        Some(token) if state.token_validator.validate(token) => Ok(next.run(request).await),
        Some(_) => {
            tracing::warn!(path = %request.uri().path(), "rejected invalid bearer token");
            Err(StatusCode::UNAUTHORIZED)
        }
        None => Err(StatusCode::UNAUTHORIZED),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_tokens_ignore_blank_entries() {
        let validator = StaticTokens::new(vec!["alpha".to_string(), String::new()]);

        assert!(validator.validate("alpha"));
        assert!(!validator.validate(""));
        assert!(!validator.validate("beta"));
    }
}
