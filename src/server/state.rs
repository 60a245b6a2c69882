//! Application state for dependency injection.
//!
//! This module provides the application state that is shared
//! between all request handlers, and the assembly of the per-operation
//! dispatch stacks.

use std::sync::Arc;
use std::time::Duration;

use crate::auth::TokenVerifier;
use crate::backend::{
    CreateProfileClient, DeleteProfileClient, GetProfileClient, GrpcProfileClient,
    UpdateProfileClient,
};
use crate::config::Config;
use crate::dispatch::{
    Directory, EndpointCache, Endpointer, GrpcEndpointFactory, Retry, RetryPolicy, RoundRobin,
    SharedEndpoint,
};
use crate::server::metrics::ServiceMetrics;
use crate::types::{
    CreateProfileRequest, CreateProfileResponse, DeleteProfileRequest, DeleteProfileResponse,
    GetProfileRequest, GetProfileResponse, UpdateProfileRequest, UpdateProfileResponse,
};

/// The gateway's callable surface: one retry-wrapped endpoint per profile
/// operation, each backed by its own endpoint cache over the shared
/// directory.
pub struct ProfileEndpoints {
    pub create_profile: SharedEndpoint<CreateProfileRequest, CreateProfileResponse>,
    pub get_profile: SharedEndpoint<GetProfileRequest, GetProfileResponse>,
    pub update_profile: SharedEndpoint<UpdateProfileRequest, UpdateProfileResponse>,
    pub delete_profile: SharedEndpoint<DeleteProfileRequest, DeleteProfileResponse>,
    caches: Vec<Arc<dyn EndpointCache>>,
}

impl ProfileEndpoints {
    /// Build the four dispatch stacks over `directory`.
    ///
    /// Must run inside the tokio runtime: each stack spawns its
    /// endpointer's directory-tracking task.
    pub fn from_config(config: &Config, directory: &Directory) -> Self {
        let policy = RetryPolicy::from_config(config);
        let connect_timeout = config.connect_timeout;

        let (create_profile, create_cache) = stack(directory, connect_timeout, policy, |c| {
            Arc::new(CreateProfileClient::new(c)) as SharedEndpoint<_, _>
        });
        let (get_profile, get_cache) = stack(directory, connect_timeout, policy, |c| {
            Arc::new(GetProfileClient::new(c)) as SharedEndpoint<_, _>
        });
        let (update_profile, update_cache) = stack(directory, connect_timeout, policy, |c| {
            Arc::new(UpdateProfileClient::new(c)) as SharedEndpoint<_, _>
        });
        let (delete_profile, delete_cache) = stack(directory, connect_timeout, policy, |c| {
            Arc::new(DeleteProfileClient::new(c)) as SharedEndpoint<_, _>
        });

        Self {
            create_profile,
            get_profile,
            update_profile,
            delete_profile,
            caches: vec![create_cache, get_cache, update_cache, delete_cache],
        }
    }

    /// Assemble from pre-built endpoints. Useful for tests and for callers
    /// composing their own stacks.
    pub fn with_endpoints(
        create_profile: SharedEndpoint<CreateProfileRequest, CreateProfileResponse>,
        get_profile: SharedEndpoint<GetProfileRequest, GetProfileResponse>,
        update_profile: SharedEndpoint<UpdateProfileRequest, UpdateProfileResponse>,
        delete_profile: SharedEndpoint<DeleteProfileRequest, DeleteProfileResponse>,
    ) -> Self {
        Self {
            create_profile,
            get_profile,
            update_profile,
            delete_profile,
            caches: Vec::new(),
        }
    }

    /// Release every live endpoint handle. Called after the listener has
    /// drained at shutdown.
    pub fn shutdown(&self) {
        for cache in &self.caches {
            cache.close();
        }
    }
}

/// One per-operation dispatch stack: factory -> endpointer -> round robin
/// -> retry.
fn stack<Req, Resp>(
    directory: &Directory,
    connect_timeout: Duration,
    policy: RetryPolicy,
    make: impl Fn(GrpcProfileClient) -> SharedEndpoint<Req, Resp> + Send + Sync + 'static,
) -> (SharedEndpoint<Req, Resp>, Arc<dyn EndpointCache>)
where
    Req: Clone + Send + Sync + 'static,
    Resp: Send + Sync + 'static,
{
    let factory = Arc::new(GrpcEndpointFactory::new(connect_timeout, make));
    let endpointer = Endpointer::new(factory);
    endpointer.subscribe(directory);
    let cache: Arc<dyn EndpointCache> = Arc::new(endpointer.clone());
    let balancer = Arc::new(RoundRobin::new(endpointer));
    let retry: SharedEndpoint<Req, Resp> = Arc::new(Retry::new(balancer, policy));
    (retry, cache)
}

/// Shared application state containing dependencies.
#[derive(Clone)]
pub struct AppState {
    /// Per-operation dispatch endpoints
    pub endpoints: Arc<ProfileEndpoints>,

    /// Credential verification capability
    pub verifier: Arc<dyn TokenVerifier>,

    /// Service metrics
    pub metrics: Arc<ServiceMetrics>,
}

impl AppState {
    /// Create a new application state.
    pub fn new(endpoints: ProfileEndpoints, verifier: Arc<dyn TokenVerifier>) -> Self {
        Self {
            endpoints: Arc::new(endpoints),
            verifier,
            metrics: Arc::new(ServiceMetrics::new()),
        }
    }
}
