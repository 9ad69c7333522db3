//! Principal extractor.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use domain::models::principal::Principal;
use std::convert::Infallible;

/// The principal resolved for the request by the auth middleware.
///
/// Falls back to the anonymous principal when the middleware did not run.
#[derive(Debug, Clone)]
pub struct CurrentPrincipal(pub Principal);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentPrincipal
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(CurrentPrincipal(
            parts
                .extensions
                .get::<Principal>()
                .cloned()
                .unwrap_or_else(Principal::anonymous),
        ))
    }
}
