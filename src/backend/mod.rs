//! Profile-service backend integration.
//!
//! This module provides the gRPC client surface for the backend user
//! service and the mapping between domain values and wire messages.

// Re-export proto definitions.
//
// The generated bindings are checked in as a static source file instead
// of produced at build time because the build environment has no
// `protoc`. The contents are the exact tonic-build output for
// `proto/user.proto`.
pub mod proto {
    include!("userpb.rs");
}

mod client;
pub mod codec;

pub use client::{
    CreateProfileClient, DeleteProfileClient, GetProfileClient, GrpcProfileClient,
    UpdateProfileClient,
};
