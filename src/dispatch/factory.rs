//! Endpoint factory: turns an instance address into a callable endpoint
//! plus a releasable resource handle.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::backend::GrpcProfileClient;
use crate::dispatch::endpoint::SharedEndpoint;
use crate::error::Result;

/// Builds one endpoint per instance address.
///
/// Fails with [`GatewayError::Connection`](crate::error::GatewayError)
/// when the instance cannot be reached to establish the resource.
#[async_trait]
pub trait EndpointFactory<Req, Resp>: Send + Sync {
    async fn build(&self, instance: &str) -> Result<EndpointHandle<Req, Resp>>;
}

/// Pairs an endpoint with a releasable resource.
///
/// The release hook runs exactly once, when the handle is dropped by its
/// owning cache. Releasing invalidates the endpoint for future picks;
/// in-flight calls holding the endpoint's `Arc` simply fail and are
/// absorbed by the retry layer.
pub struct EndpointHandle<Req, Resp> {
    endpoint: SharedEndpoint<Req, Resp>,
    on_release: Option<Box<dyn FnOnce() + Send>>,
}

impl<Req, Resp> EndpointHandle<Req, Resp> {
    /// A handle whose resource is released implicitly when the endpoint is
    /// dropped (the common case for channel-backed endpoints).
    pub fn new(endpoint: SharedEndpoint<Req, Resp>) -> Self {
        Self {
            endpoint,
            on_release: None,
        }
    }

    /// A handle with an explicit release hook.
    pub fn with_release(
        endpoint: SharedEndpoint<Req, Resp>,
        on_release: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            endpoint,
            on_release: Some(Box::new(on_release)),
        }
    }

    /// Clone out the endpoint for a snapshot.
    pub fn endpoint(&self) -> SharedEndpoint<Req, Resp> {
        self.endpoint.clone()
    }
}

impl<Req, Resp> Drop for EndpointHandle<Req, Resp> {
    fn drop(&mut self) {
        if let Some(release) = self.on_release.take() {
            release();
        }
    }
}

/// Factory that dials an instance over gRPC and adapts the resulting
/// channel into one operation's endpoint.
///
/// The adapter closure is injected so one factory type serves all four
/// profile operations; each operation's dispatch stack gets its own
/// factory and therefore its own channels.
pub struct GrpcEndpointFactory<Req, Resp> {
    connect_timeout: Duration,
    make: Arc<dyn Fn(GrpcProfileClient) -> SharedEndpoint<Req, Resp> + Send + Sync>,
}

impl<Req, Resp> GrpcEndpointFactory<Req, Resp> {
    pub fn new(
        connect_timeout: Duration,
        make: impl Fn(GrpcProfileClient) -> SharedEndpoint<Req, Resp> + Send + Sync + 'static,
    ) -> Self {
        Self {
            connect_timeout,
            make: Arc::new(make),
        }
    }
}

#[async_trait]
impl<Req, Resp> EndpointFactory<Req, Resp> for GrpcEndpointFactory<Req, Resp>
where
    Req: Send + Sync + 'static,
    Resp: Send + Sync + 'static,
{
    async fn build(&self, instance: &str) -> Result<EndpointHandle<Req, Resp>> {
        let client = GrpcProfileClient::connect(instance, self.connect_timeout).await?;
        debug!(instance, "built backend endpoint");
        Ok(EndpointHandle::new((self.make)(client)))
    }
}
