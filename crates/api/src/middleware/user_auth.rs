//! User JWT authentication middleware.
//!
//! Every request is resolved to a [`Principal`]: a valid bearer token for an
//! active user yields that user with their staff flag and groups, anything
//! else yields the anonymous principal. Staff-only routes add
//! [`require_staff`] on top.

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use domain::models::principal::Principal;
use persistence::repositories::UserRepository;
use shared::jwt::{extract_user_id, JwtConfig};
use uuid::Uuid;

use crate::app::AppState;
use crate::config::JwtAuthConfig;
use crate::error::ApiError;

/// Authenticated user information extracted from JWT.
#[derive(Debug, Clone)]
pub struct UserAuth {
    /// User ID from the JWT subject claim.
    pub user_id: Uuid,
    /// JWT ID (jti) for log correlation.
    pub jti: String,
}

impl UserAuth {
    /// Validates an access token and returns user authentication info.
    pub fn validate(jwt_config: &JwtConfig, token: &str) -> Result<Self, String> {
        let claims = jwt_config
            .validate_access_token(token)
            .map_err(|e| format!("Invalid token: {}", e))?;

        let user_id = extract_user_id(&claims).map_err(|_| "Invalid user ID in token".to_string())?;

        Ok(UserAuth {
            user_id,
            jti: claims.jti,
        })
    }

    /// Creates a JwtConfig from JwtAuthConfig.
    ///
    /// Returns `Ok(None)` when no public key is configured.
    pub fn create_jwt_config(config: &JwtAuthConfig) -> Result<Option<JwtConfig>, String> {
        if config.public_key.trim().is_empty() {
            return Ok(None);
        }
        JwtConfig::with_leeway(
            config.private_key.as_deref(),
            &config.public_key,
            config.access_token_expiry_secs,
            config.leeway_secs,
        )
        .map(Some)
        .map_err(|e| format!("Failed to initialize JWT config: {}", e))
    }
}

/// Returns the bearer token of the Authorization header, if any.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Middleware that resolves the request's principal.
///
/// Missing, invalid or expired tokens and unknown users all resolve to the
/// anonymous principal. Only a database failure aborts the request.
pub async fn resolve_principal(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let auth = match (state.jwt.as_deref(), bearer_token(req.headers())) {
        (Some(jwt), Some(token)) => match UserAuth::validate(jwt, token) {
            Ok(auth) => Some(auth),
            Err(e) => {
                tracing::debug!("JWT validation failed: {}", e);
                None
            }
        },
        _ => None,
    };

    let principal = match auth {
        Some(auth) => {
            let users = UserRepository::new(state.pool.clone());
            match users.find_principal(auth.user_id).await {
                Ok(Some(principal)) => {
                    tracing::debug!(user_id = %auth.user_id, jti = %auth.jti, "Authenticated request");
                    principal
                }
                Ok(None) => {
                    tracing::debug!(user_id = %auth.user_id, "Token for unknown or inactive user");
                    Principal::anonymous()
                }
                Err(e) => return ApiError::from(e).into_response(),
            }
        }
        None => Principal::anonymous(),
    };

    req.extensions_mut().insert(principal);
    next.run(req).await
}

/// Middleware that admits only staff principals.
///
/// Must run after [`resolve_principal`]. Anonymous requests get 401,
/// authenticated non-staff users get 403.
pub async fn require_staff(req: Request<Body>, next: Next) -> Response {
    match staff_check(req.extensions().get::<Principal>()) {
        Ok(()) => next.run(req).await,
        Err(e) => e.into_response(),
    }
}

fn staff_check(principal: Option<&Principal>) -> Result<(), ApiError> {
    match principal {
        Some(p) if p.is_staff => Ok(()),
        Some(p) if p.is_authenticated() => {
            Err(ApiError::Forbidden("Staff access required".to_string()))
        }
        _ => Err(ApiError::Unauthorized(
            "Missing or invalid Authorization header".to_string(),
        )),
    }
}
