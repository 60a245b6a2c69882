//! HTTP request handlers.
//!
//! This module provides the edge-facing transport codec: each handler
//! decodes the HTTP request into the operation's domain request (pulling
//! the authenticated subject from the request's claims), dispatches it,
//! and encodes the domain response back to JSON.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    middleware,
    response::IntoResponse,
    routing::get,
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

use crate::auth::authenticate;
use crate::dispatch::{RequestContext, SharedEndpoint};
use crate::error::{GatewayError, Result};
use crate::server::AppState;
use crate::types::{
    AuthContext, CreateProfileRequest, CreateProfileResponse, DeleteProfileRequest,
    DeleteProfileResponse, GetProfileRequest, GetProfileResponse, UpdateProfileRequest,
    UpdateProfileResponse,
};

/// Request body for the create and update operations.
///
/// Absent fields are omitted by callers, not sent as null; `None` therefore
/// means "caller did not specify".
#[derive(Debug, Deserialize)]
pub struct ProfileBody {
    #[serde(default)]
    email: Option<String>,

    #[serde(default)]
    phone_number: Option<String>,

    #[serde(default)]
    user_name: Option<String>,

    #[serde(default)]
    profile_picture: Option<String>,

    #[serde(default)]
    bio: Option<String>,
}

/// Response body for the get operation: the profile plus a marker telling
/// the caller whether they were looking at their own record.
#[derive(Debug, Serialize)]
pub struct GetProfileBody {
    #[serde(flatten)]
    profile: GetProfileResponse,
    authenticated: bool,
}

/// Dispatch one domain request through its retry-wrapped endpoint, keeping
/// the request metrics straight.
async fn dispatch<Req, Resp>(
    state: &AppState,
    endpoint: &SharedEndpoint<Req, Resp>,
    req: Req,
) -> Result<Resp>
where
    Req: Send + Sync + 'static,
    Resp: Send + Sync + 'static,
{
    let cx = RequestContext::new();
    state.metrics.increment_request();
    let result = endpoint.call(&cx, req).await;
    state.metrics.decrement_request();
    if result.is_err() {
        state.metrics.record_error();
    }
    result
}

/// Handle GET /user/:uid.
///
/// The profile is always fetched for the requested uid; when it differs
/// from the caller's own subject the response is marked as an
/// unauthenticated view rather than rejected.
pub async fn get_profile(
    Path(uid): Path<String>,
    State(state): State<Arc<AppState>>,
    auth: Option<Extension<AuthContext>>,
) -> Result<Json<GetProfileBody>> {
    let Extension(auth) = auth.ok_or(GatewayError::AuthContextMissing)?;
    let authenticated = uid == auth.claims.subject;

    let req = GetProfileRequest {
        uuid: uid,
        authenticated,
    };
    let profile = dispatch(&state, &state.endpoints.get_profile, req).await?;

    Ok(Json(GetProfileBody {
        profile,
        authenticated,
    }))
}

/// Handle POST /user.
pub async fn create_profile(
    State(state): State<Arc<AppState>>,
    auth: Option<Extension<AuthContext>>,
    body: std::result::Result<Json<ProfileBody>, JsonRejection>,
) -> Result<Json<CreateProfileResponse>> {
    let Extension(auth) = auth.ok_or(GatewayError::AuthContextMissing)?;
    let Json(body) = body.map_err(|e| GatewayError::Decode(e.body_text()))?;

    let req = CreateProfileRequest {
        uuid: Some(auth.claims.subject.clone()),
        email: body.email,
        phone_number: body.phone_number,
        user_name: body.user_name,
        profile_picture: body.profile_picture,
        bio: body.bio,
        auth_provider: Some(auth.provider.clone()),
    };
    let resp = dispatch(&state, &state.endpoints.create_profile, req).await?;
    Ok(Json(resp))
}

/// Handle PUT /user.
pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    auth: Option<Extension<AuthContext>>,
    body: std::result::Result<Json<ProfileBody>, JsonRejection>,
) -> Result<Json<UpdateProfileResponse>> {
    let Extension(auth) = auth.ok_or(GatewayError::AuthContextMissing)?;
    let Json(body) = body.map_err(|e| GatewayError::Decode(e.body_text()))?;

    let req = UpdateProfileRequest {
        uuid: Some(auth.claims.subject.clone()),
        email: body.email,
        phone_number: body.phone_number,
        user_name: body.user_name,
        profile_picture: body.profile_picture,
        bio: body.bio,
    };
    let resp = dispatch(&state, &state.endpoints.update_profile, req).await?;
    Ok(Json(resp))
}

/// Handle DELETE /user. Deletes the caller's own profile.
pub async fn delete_profile(
    State(state): State<Arc<AppState>>,
    auth: Option<Extension<AuthContext>>,
) -> Result<Json<DeleteProfileResponse>> {
    let Extension(auth) = auth.ok_or(GatewayError::AuthContextMissing)?;

    let req = DeleteProfileRequest {
        uuid: auth.claims.subject.clone(),
    };
    let resp = dispatch(&state, &state.endpoints.delete_profile, req).await?;
    Ok(Json(resp))
}

/// Health check endpoint.
pub async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "profile-gateway",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Metrics endpoint.
pub async fn metrics_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.metrics.to_json())
}

/// Create the application router.
pub fn create_router(state: Arc<AppState>) -> Router {
    let user_routes = Router::new()
        .route("/user/:uid", get(get_profile))
        .route(
            "/user",
            axum::routing::post(create_profile)
                .put(update_profile)
                .delete(delete_profile),
        )
        .route_layer(middleware::from_fn_with_state(
            state.verifier.clone(),
            authenticate,
        ));

    Router::new()
        .merge(user_routes)
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler))
        .layer(ServiceBuilder::new().layer(CorsLayer::permissive()))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticTokenVerifier;
    use crate::dispatch::Endpoint;
    use crate::server::state::ProfileEndpoints;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use http_body_util::BodyExt;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::ServiceExt; // for oneshot

    struct StubGet {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Endpoint<GetProfileRequest, GetProfileResponse> for StubGet {
        async fn call(
            &self,
            _cx: &RequestContext,
            req: GetProfileRequest,
        ) -> Result<GetProfileResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(GetProfileResponse {
                uuid: Some(req.uuid),
                email: Some("yui@example.com".into()),
                phone_number: None,
                user_name: Some("yui".into()),
                profile_picture: None,
                bio: None,
            })
        }
    }

    struct StubCreate {
        calls: Arc<AtomicUsize>,
        seen: Arc<Mutex<Option<CreateProfileRequest>>>,
    }

    #[async_trait]
    impl Endpoint<CreateProfileRequest, CreateProfileResponse> for StubCreate {
        async fn call(
            &self,
            _cx: &RequestContext,
            req: CreateProfileRequest,
        ) -> Result<CreateProfileResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.seen.lock() = Some(req);
            Ok(CreateProfileResponse {})
        }
    }

    struct StubUpdate;

    #[async_trait]
    impl Endpoint<UpdateProfileRequest, UpdateProfileResponse> for StubUpdate {
        async fn call(
            &self,
            _cx: &RequestContext,
            _req: UpdateProfileRequest,
        ) -> Result<UpdateProfileResponse> {
            Ok(UpdateProfileResponse {})
        }
    }

    struct StubDelete {
        fail_with: Option<&'static str>,
    }

    #[async_trait]
    impl Endpoint<DeleteProfileRequest, DeleteProfileResponse> for StubDelete {
        async fn call(
            &self,
            _cx: &RequestContext,
            _req: DeleteProfileRequest,
        ) -> Result<DeleteProfileResponse> {
            match self.fail_with {
                Some(msg) => Err(GatewayError::Backend(msg.into())),
                None => Ok(DeleteProfileResponse {}),
            }
        }
    }

    struct Fixture {
        router: Router,
        get_calls: Arc<AtomicUsize>,
        create_calls: Arc<AtomicUsize>,
        create_seen: Arc<Mutex<Option<CreateProfileRequest>>>,
    }

    fn fixture_with_delete(fail_with: Option<&'static str>) -> Fixture {
        let get_calls = Arc::new(AtomicUsize::new(0));
        let create_calls = Arc::new(AtomicUsize::new(0));
        let create_seen = Arc::new(Mutex::new(None));

        let endpoints = ProfileEndpoints::with_endpoints(
            Arc::new(StubCreate {
                calls: create_calls.clone(),
                seen: create_seen.clone(),
            }),
            Arc::new(StubGet {
                calls: get_calls.clone(),
            }),
            Arc::new(StubUpdate),
            Arc::new(StubDelete { fail_with }),
        );

        let mut tokens = HashMap::new();
        tokens.insert("good-token".to_string(), "user-1".to_string());
        let verifier = Arc::new(StaticTokenVerifier::new(tokens));

        let state = Arc::new(AppState::new(endpoints, verifier));
        Fixture {
            router: create_router(state),
            get_calls,
            create_calls,
            create_seen,
        }
    }

    fn fixture() -> Fixture {
        fixture_with_delete(None)
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn missing_authorization_is_rejected_before_dispatch() {
        let f = fixture();
        let response = f
            .router
            .oneshot(
                Request::builder()
                    .uri("/user/user-1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"Unauthorized");
        // The backend was never invoked.
        assert_eq!(f.get_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn invalid_token_is_rejected() {
        let f = fixture();
        let response = f
            .router
            .oneshot(
                Request::builder()
                    .uri("/user/user-1")
                    .header(header::AUTHORIZATION, "Bearer wrong")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(f.get_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn get_own_profile_is_an_authenticated_view() {
        let f = fixture();
        let response = f
            .router
            .oneshot(
                Request::builder()
                    .uri("/user/user-1")
                    .header(header::AUTHORIZATION, "Bearer good-token")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["uid"], "user-1");
        assert_eq!(json["authenticated"], true);
    }

    #[tokio::test]
    async fn get_other_profile_is_marked_unauthenticated_not_rejected() {
        let f = fixture();
        let response = f
            .router
            .oneshot(
                Request::builder()
                    .uri("/user/someone-else")
                    .header(header::AUTHORIZATION, "Bearer good-token")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["uid"], "someone-else");
        assert_eq!(json["authenticated"], false);
        assert_eq!(f.get_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn create_uses_subject_and_provider_from_claims() {
        let f = fixture();
        let response = f
            .router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/user")
                    .header(header::AUTHORIZATION, "Bearer good-token")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        r#"{"email":"yui@example.com","user_name":"yui"}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(f.create_calls.load(Ordering::SeqCst), 1);

        let seen = f.create_seen.lock().take().unwrap();
        assert_eq!(seen.uuid.as_deref(), Some("user-1"));
        assert_eq!(seen.email.as_deref(), Some("yui@example.com"));
        assert_eq!(seen.auth_provider.as_deref(), Some("static"));
        assert_eq!(seen.phone_number, None);
    }

    #[tokio::test]
    async fn malformed_json_is_a_bad_request() {
        let f = fixture();
        let response = f
            .router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/user")
                    .header(header::AUTHORIZATION, "Bearer good-token")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from("{not json"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(f.create_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn backend_domain_failure_maps_to_internal_error() {
        let f = fixture_with_delete(Some("user not found"));
        let response = f
            .router
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri("/user")
                    .header(header::AUTHORIZATION, "Bearer good-token")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response).await;
        assert_eq!(json["error"], "backend error: user not found");
    }

    #[tokio::test]
    async fn health_does_not_require_credentials() {
        let f = fixture();
        let response = f
            .router
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
