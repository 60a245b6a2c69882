//! Authentication middleware.
//!
//! Two outcomes per request: the credential verifies, claims and the
//! verifying provider's name are attached to the request, and decoding
//! proceeds; or it does not, the response is 401 immediately and
//! downstream layers never run.

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::debug;

use crate::auth::verifier::TokenVerifier;
use crate::types::AuthContext;

pub async fn authenticate(
    State(verifier): State<Arc<dyn TokenVerifier>>,
    mut request: Request,
    next: Next,
) -> Response {
    let credential = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    let Some(credential) = credential else {
        return unauthorized();
    };

    match verifier.verify(credential).await {
        Ok(claims) => {
            let auth = AuthContext {
                claims,
                provider: verifier.name().to_string(),
            };
            request.extensions_mut().insert(auth);
            next.run(request).await
        }
        Err(e) => {
            debug!(error = %e, "credential verification failed");
            unauthorized()
        }
    }
}

fn unauthorized() -> Response {
    (StatusCode::UNAUTHORIZED, "Unauthorized").into_response()
}
