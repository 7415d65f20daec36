//! Middleware de autenticación JWT
//!
//! Verifica el bearer token y deja la identidad del llamante
//! (`CallerIdentity`) en las extensions de la request.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use tracing::debug;

use crate::state::AppState;
use crate::utils::{
    errors::AppError,
    jwt::{extract_token_from_header, identity_from_claims, verify_token},
};

/// Middleware de autenticación JWT
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Authorization header required".to_string()))?;

    let token = extract_token_from_header(auth_header)?;
    let claims = verify_token(token, &state.jwt)?;
    let caller = identity_from_claims(&claims)?;

    debug!("🔐 {} autenticado como {}", caller.user_id, caller.role.as_str());
    request.extensions_mut().insert(caller);

    Ok(next.run(request).await)
}
