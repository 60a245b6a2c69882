//! Mapping between domain values and backend wire messages.
//!
//! Wire convention: an absent optional field is represented as an empty
//! string, and an empty wire string decodes back to absent — a
//! present-but-empty value does not survive the round trip. The `err`
//! field on every reply carries the backend's failure message; empty means
//! success, and whatever type the failure had on the backend is reduced to
//! that message here.

use crate::backend::proto;
use crate::error::{GatewayError, Result};
use crate::types::{
    CreateProfileRequest, CreateProfileResponse, DeleteProfileRequest, DeleteProfileResponse,
    GetProfileRequest, GetProfileResponse, UpdateProfileRequest, UpdateProfileResponse,
};

fn to_wire(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

fn from_wire(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

fn reply_err(err: String) -> Result<()> {
    if err.is_empty() {
        Ok(())
    } else {
        Err(GatewayError::Backend(err))
    }
}

pub fn encode_create_request(req: &CreateProfileRequest) -> proto::CreateRequest {
    proto::CreateRequest {
        uuid: to_wire(&req.uuid),
        email: to_wire(&req.email),
        phone: to_wire(&req.phone_number),
        name: to_wire(&req.user_name),
        profile: to_wire(&req.profile_picture),
        bio: to_wire(&req.bio),
        auth_provider: to_wire(&req.auth_provider),
    }
}

pub fn decode_create_reply(reply: proto::CreateReply) -> Result<CreateProfileResponse> {
    reply_err(reply.err)?;
    Ok(CreateProfileResponse {})
}

pub fn encode_retrieve_request(req: &GetProfileRequest) -> proto::RetrieveRequest {
    // The authenticated flag shapes only the HTTP response; it never
    // crosses the wire.
    proto::RetrieveRequest {
        uuid: req.uuid.clone(),
    }
}

pub fn decode_retrieve_reply(reply: proto::RetrieveReply) -> Result<GetProfileResponse> {
    reply_err(reply.err)?;
    Ok(GetProfileResponse {
        uuid: from_wire(reply.uuid),
        email: from_wire(reply.email),
        phone_number: from_wire(reply.phone),
        user_name: from_wire(reply.name),
        profile_picture: from_wire(reply.profile),
        bio: from_wire(reply.bio),
    })
}

pub fn encode_update_request(req: &UpdateProfileRequest) -> proto::UpdateRequest {
    proto::UpdateRequest {
        uuid: to_wire(&req.uuid),
        email: to_wire(&req.email),
        phone: to_wire(&req.phone_number),
        name: to_wire(&req.user_name),
        profile: to_wire(&req.profile_picture),
        bio: to_wire(&req.bio),
    }
}

pub fn decode_update_reply(reply: proto::UpdateReply) -> Result<UpdateProfileResponse> {
    reply_err(reply.err)?;
    Ok(UpdateProfileResponse {})
}

pub fn encode_delete_request(req: &DeleteProfileRequest) -> proto::DeleteRequest {
    proto::DeleteRequest {
        uuid: req.uuid.clone(),
    }
}

pub fn decode_delete_reply(reply: proto::DeleteReply) -> Result<DeleteProfileResponse> {
    reply_err(reply.err)?;
    Ok(DeleteProfileResponse {})
}
