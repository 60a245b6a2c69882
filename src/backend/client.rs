//! gRPC client for the profile-service backend.

use async_trait::async_trait;
use std::time::Duration;
use tonic::transport::{Channel, Endpoint as ChannelEndpoint};

use crate::backend::codec;
use crate::backend::proto::user_client::UserClient;
use crate::dispatch::{Endpoint, RequestContext};
use crate::error::{GatewayError, Result};
use crate::types::{
    CreateProfileRequest, CreateProfileResponse, DeleteProfileRequest, DeleteProfileResponse,
    GetProfileRequest, GetProfileResponse, UpdateProfileRequest, UpdateProfileResponse,
};

/// A connected client for one backend instance.
///
/// Wraps a tonic channel; clones share the underlying connection and are
/// safe to invoke concurrently.
#[derive(Clone)]
pub struct GrpcProfileClient {
    inner: UserClient<Channel>,
}

impl GrpcProfileClient {
    /// Dial `instance` and establish the channel.
    ///
    /// Fails with [`GatewayError::Connection`] when the instance cannot be
    /// reached within `connect_timeout`.
    pub async fn connect(instance: &str, connect_timeout: Duration) -> Result<Self> {
        let uri = if instance.contains("://") {
            instance.to_string()
        } else {
            format!("http://{}", instance)
        };

        let endpoint = ChannelEndpoint::from_shared(uri)
            .map_err(|e| {
                GatewayError::Connection(format!("invalid instance address {}: {}", instance, e))
            })?
            .connect_timeout(connect_timeout);

        let channel = endpoint.connect().await.map_err(|e| {
            GatewayError::Connection(format!("failed to connect to {}: {}", instance, e))
        })?;

        Ok(Self {
            inner: UserClient::new(channel),
        })
    }

    fn request<T>(cx: &RequestContext, message: T) -> tonic::Request<T> {
        let mut request = tonic::Request::new(message);
        if let Some(remaining) = cx.remaining() {
            request.set_timeout(remaining);
        }
        if let Ok(id) = cx.id().to_string().parse() {
            request.metadata_mut().insert("x-request-id", id);
        }
        request
    }
}

/// Create-profile endpoint over one backend instance.
pub struct CreateProfileClient {
    client: GrpcProfileClient,
}

impl CreateProfileClient {
    pub fn new(client: GrpcProfileClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Endpoint<CreateProfileRequest, CreateProfileResponse> for CreateProfileClient {
    async fn call(
        &self,
        cx: &RequestContext,
        req: CreateProfileRequest,
    ) -> Result<CreateProfileResponse> {
        let request = GrpcProfileClient::request(cx, codec::encode_create_request(&req));
        let reply = self.client.inner.clone().create(request).await?.into_inner();
        codec::decode_create_reply(reply)
    }
}

/// Get-profile endpoint over one backend instance.
pub struct GetProfileClient {
    client: GrpcProfileClient,
}

impl GetProfileClient {
    pub fn new(client: GrpcProfileClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Endpoint<GetProfileRequest, GetProfileResponse> for GetProfileClient {
    async fn call(&self, cx: &RequestContext, req: GetProfileRequest) -> Result<GetProfileResponse> {
        let request = GrpcProfileClient::request(cx, codec::encode_retrieve_request(&req));
        let reply = self
            .client
            .inner
            .clone()
            .retrieve(request)
            .await?
            .into_inner();
        codec::decode_retrieve_reply(reply)
    }
}

/// Update-profile endpoint over one backend instance.
pub struct UpdateProfileClient {
    client: GrpcProfileClient,
}

impl UpdateProfileClient {
    pub fn new(client: GrpcProfileClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Endpoint<UpdateProfileRequest, UpdateProfileResponse> for UpdateProfileClient {
    async fn call(
        &self,
        cx: &RequestContext,
        req: UpdateProfileRequest,
    ) -> Result<UpdateProfileResponse> {
        let request = GrpcProfileClient::request(cx, codec::encode_update_request(&req));
        let reply = self.client.inner.clone().update(request).await?.into_inner();
        codec::decode_update_reply(reply)
    }
}

/// Delete-profile endpoint over one backend instance.
pub struct DeleteProfileClient {
    client: GrpcProfileClient,
}

impl DeleteProfileClient {
    pub fn new(client: GrpcProfileClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Endpoint<DeleteProfileRequest, DeleteProfileResponse> for DeleteProfileClient {
    async fn call(
        &self,
        cx: &RequestContext,
        req: DeleteProfileRequest,
    ) -> Result<DeleteProfileResponse> {
        let request = GrpcProfileClient::request(cx, codec::encode_delete_request(&req));
        let reply = self.client.inner.clone().delete(request).await?.into_inner();
        codec::decode_delete_reply(reply)
    }
}
