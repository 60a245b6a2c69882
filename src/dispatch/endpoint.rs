//! The generic endpoint abstraction.
//!
//! An [`Endpoint`] is a uniform "(context, request) -> (response, error)"
//! contract, independent of transport. Every layer of the dispatch stack
//! (balancing, retry, the gRPC adapters) composes around it: a decorator is
//! just another `Endpoint` holding an inner one, so transport code and
//! resilience code vary independently.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::Result;

/// A callable unit of work abstracting over transport.
#[async_trait]
pub trait Endpoint<Req, Resp>: Send + Sync {
    /// Invoke the endpoint with a request-scoped context.
    async fn call(&self, cx: &RequestContext, req: Req) -> Result<Resp>;
}

/// Shared handle to an endpoint, cheap to clone per pick.
pub type SharedEndpoint<Req, Resp> = Arc<dyn Endpoint<Req, Resp>>;

/// Request-scoped call context.
///
/// Carries the request id, an optional wall-clock deadline, and the
/// cancellation token that aborts in-flight work when the caller goes away.
#[derive(Debug, Clone)]
pub struct RequestContext {
    id: Uuid,
    deadline: Option<Instant>,
    cancel: CancellationToken,
}

impl RequestContext {
    /// Create a fresh context with no deadline.
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            deadline: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Create a fresh context bounded by `deadline`.
    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            id: Uuid::new_v4(),
            deadline: Some(deadline),
            cancel: CancellationToken::new(),
        }
    }

    /// The request id, stamped once at creation.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The absolute deadline, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left until the deadline. `None` when unbounded; a zero duration
    /// when the deadline has already passed.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// The cancellation token for this call.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Cancel this call and everything derived from it.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Whether the caller has already gone away.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Derive a context for one attempt: same request id, a child token
    /// (parent cancellation still propagates), and the tighter of the two
    /// deadlines.
    pub fn child_with_deadline(&self, deadline: Instant) -> Self {
        let effective = match self.deadline {
            Some(existing) => existing.min(deadline),
            None => deadline,
        };
        Self {
            id: self.id,
            deadline: Some(effective),
            cancel: self.cancel.child_token(),
        }
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}
