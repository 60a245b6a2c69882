//! Failure-budgeted retry around a balancer.
//!
//! The wrapper is itself an [`Endpoint`], so the stack composes as
//! retry(round_robin(endpointer)). Attempts are strictly sequential, which
//! bounds the backend load from a single client call to at most
//! `max_attempts` invocations over time, never in parallel.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::config::Config;
use crate::dispatch::balancer::Balancer;
use crate::dispatch::endpoint::{Endpoint, RequestContext};
use crate::error::{with_timeout, GatewayError, Result};

/// The (max attempts, wall-clock budget) pair bounding one dispatch.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub timeout: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: usize, timeout: Duration) -> Self {
        Self {
            max_attempts,
            timeout,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            max_attempts: config.retry_max_attempts,
            timeout: config.retry_timeout,
        }
    }
}

/// Repeatedly asks the balancer for an endpoint and invokes it until
/// success, exhaustion, deadline expiry, or cancellation.
///
/// A failed attempt may be followed by a pick of the same endpoint again;
/// there is no exclusion list. Only transport-shaped failures are retried
/// (see [`GatewayError::is_retryable`]); a backend-reported domain failure
/// propagates immediately.
pub struct Retry<Req, Resp> {
    balancer: Arc<dyn Balancer<Req, Resp>>,
    policy: RetryPolicy,
}

impl<Req, Resp> Retry<Req, Resp> {
    pub fn new(balancer: Arc<dyn Balancer<Req, Resp>>, policy: RetryPolicy) -> Self {
        Self { balancer, policy }
    }
}

#[async_trait]
impl<Req, Resp> Endpoint<Req, Resp> for Retry<Req, Resp>
where
    Req: Clone + Send + Sync + 'static,
    Resp: Send + Sync + 'static,
{
    async fn call(&self, cx: &RequestContext, req: Req) -> Result<Resp> {
        let budget = Instant::now() + self.policy.timeout;
        let deadline = cx.deadline().map_or(budget, |d| d.min(budget));
        let attempt_cx = cx.child_with_deadline(deadline);

        let mut last_err: Option<GatewayError> = None;

        for attempt in 1..=self.policy.max_attempts {
            if cx.is_cancelled() {
                return Err(GatewayError::Cancelled);
            }

            // Each attempt gets only the time the budget has left, so one
            // slow instance cannot consume the full budget across attempts.
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(GatewayError::DeadlineExceeded);
            }

            let endpoint = match self.balancer.pick() {
                Ok(endpoint) => endpoint,
                Err(e) => {
                    debug!(attempt, error = %e, "endpoint pick failed");
                    last_err = Some(e);
                    continue;
                }
            };

            let outcome = tokio::select! {
                _ = cx.cancellation().cancelled() => return Err(GatewayError::Cancelled),
                result = with_timeout(endpoint.call(&attempt_cx, req.clone()), remaining) => result,
            };

            match outcome {
                Ok(resp) => return Ok(resp),
                Err(e) if e.is_retryable() => {
                    debug!(attempt, error = %e, "attempt failed");
                    last_err = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        let source = last_err.unwrap_or(GatewayError::DeadlineExceeded);
        Err(GatewayError::RetryExhausted {
            attempts: self.policy.max_attempts,
            source: Box::new(source),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::endpoint::SharedEndpoint;
    use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

    /// Rotates over a fixed endpoint list, like the real round robin.
    struct StubBalancer {
        endpoints: Vec<SharedEndpoint<(), String>>,
        counter: AtomicU64,
    }

    impl StubBalancer {
        fn new(endpoints: Vec<SharedEndpoint<(), String>>) -> Self {
            Self {
                endpoints,
                counter: AtomicU64::new(0),
            }
        }
    }

    impl Balancer<(), String> for StubBalancer {
        fn pick(&self) -> Result<SharedEndpoint<(), String>> {
            if self.endpoints.is_empty() {
                return Err(GatewayError::NoEndpoints);
            }
            let n = self.counter.fetch_add(1, Ordering::Relaxed);
            Ok(self.endpoints[(n % self.endpoints.len() as u64) as usize].clone())
        }
    }

    struct AlwaysFails {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Endpoint<(), String> for AlwaysFails {
        async fn call(&self, _cx: &RequestContext, _req: ()) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(GatewayError::Connection("refused".into()))
        }
    }

    struct Succeeds {
        name: &'static str,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Endpoint<(), String> for Succeeds {
        async fn call(&self, _cx: &RequestContext, _req: ()) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.name.to_string())
        }
    }

    struct Hangs;

    #[async_trait]
    impl Endpoint<(), String> for Hangs {
        async fn call(&self, _cx: &RequestContext, _req: ()) -> Result<String> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok("never".to_string())
        }
    }

    struct DomainFailure {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Endpoint<(), String> for DomainFailure {
        async fn call(&self, _cx: &RequestContext, _req: ()) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(GatewayError::Backend("user not found".into()))
        }
    }

    #[tokio::test]
    async fn always_failing_backend_makes_exactly_k_attempts() {
        let calls = Arc::new(AtomicUsize::new(0));
        let balancer = Arc::new(StubBalancer::new(vec![Arc::new(AlwaysFails {
            calls: calls.clone(),
        })]));
        let retry = Retry::new(balancer, RetryPolicy::new(3, Duration::from_secs(5)));

        let err = retry.call(&RequestContext::new(), ()).await.unwrap_err();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        match err {
            GatewayError::RetryExhausted { attempts, source } => {
                assert_eq!(attempts, 3);
                assert!(matches!(*source, GatewayError::Connection(_)));
            }
            other => panic!("expected RetryExhausted, got {other}"),
        }
    }

    #[tokio::test]
    async fn expired_deadline_stops_before_attempts_are_exhausted() {
        let balancer = Arc::new(StubBalancer::new(vec![
            Arc::new(Hangs) as SharedEndpoint<(), String>
        ]));
        let retry = Retry::new(balancer, RetryPolicy::new(5, Duration::from_millis(30)));

        let start = Instant::now();
        let err = retry.call(&RequestContext::new(), ()).await.unwrap_err();
        assert!(matches!(err, GatewayError::DeadlineExceeded));
        // Strictly fewer than 5 attempt timeouts elapsed.
        assert!(start.elapsed() < Duration::from_millis(150));
    }

    #[tokio::test]
    async fn failing_instance_is_absorbed_within_budget() {
        // Directory {B, A}: B fails once, then A succeeds on the retry.
        let failing = Arc::new(AtomicUsize::new(0));
        let succeeding = Arc::new(AtomicUsize::new(0));
        let balancer = Arc::new(StubBalancer::new(vec![
            Arc::new(AlwaysFails {
                calls: failing.clone(),
            }) as SharedEndpoint<(), String>,
            Arc::new(Succeeds {
                name: "a:1",
                calls: succeeding.clone(),
            }),
        ]));
        let retry = Retry::new(balancer, RetryPolicy::new(2, Duration::from_secs(5)));

        let resp = retry.call(&RequestContext::new(), ()).await.unwrap();
        assert_eq!(resp, "a:1");
        assert_eq!(failing.load(Ordering::SeqCst), 1);
        assert_eq!(succeeding.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn domain_failure_is_not_retried() {
        let calls = Arc::new(AtomicUsize::new(0));
        let balancer = Arc::new(StubBalancer::new(vec![Arc::new(DomainFailure {
            calls: calls.clone(),
        })]));
        let retry = Retry::new(balancer, RetryPolicy::new(3, Duration::from_secs(5)));

        let err = retry.call(&RequestContext::new(), ()).await.unwrap_err();
        assert!(matches!(err, GatewayError::Backend(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn empty_balancer_burns_attempts_and_reports_the_cause() {
        let balancer = Arc::new(StubBalancer::new(Vec::new()));
        let retry = Retry::new(balancer, RetryPolicy::new(3, Duration::from_secs(1)));

        let err = retry.call(&RequestContext::new(), ()).await.unwrap_err();
        match err {
            GatewayError::RetryExhausted { source, .. } => {
                assert!(matches!(*source, GatewayError::NoEndpoints));
            }
            other => panic!("expected RetryExhausted, got {other}"),
        }
    }

    #[tokio::test]
    async fn cancellation_aborts_an_in_flight_attempt() {
        let balancer = Arc::new(StubBalancer::new(vec![
            Arc::new(Hangs) as SharedEndpoint<(), String>
        ]));
        let retry = Retry::new(balancer, RetryPolicy::new(3, Duration::from_secs(3600)));

        let cx = RequestContext::new();
        let canceller = cx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            canceller.cancel();
        });

        let start = Instant::now();
        let err = retry.call(&cx, ()).await.unwrap_err();
        assert!(matches!(err, GatewayError::Cancelled));
        // Aborted well within one attempt's budget, not after the full one.
        assert!(start.elapsed() < Duration::from_secs(2));
    }
}
