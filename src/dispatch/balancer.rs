//! Round-robin endpoint selection.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::dispatch::endpoint::SharedEndpoint;
use crate::dispatch::endpointer::Endpointer;
use crate::error::{GatewayError, Result};

/// Selection policy choosing one endpoint per call.
pub trait Balancer<Req, Resp>: Send + Sync {
    /// Pick an endpoint from the current snapshot. Fails with
    /// [`GatewayError::NoEndpoints`] when the snapshot is empty.
    fn pick(&self) -> Result<SharedEndpoint<Req, Resp>>;
}

/// Pure uniform rotation over the endpointer's snapshot: no affinity, no
/// weighting. The counter increments atomically per pick, so concurrent
/// callers spread evenly.
pub struct RoundRobin<Req, Resp> {
    endpointer: Endpointer<Req, Resp>,
    counter: AtomicU64,
}

impl<Req, Resp> RoundRobin<Req, Resp> {
    pub fn new(endpointer: Endpointer<Req, Resp>) -> Self {
        Self {
            endpointer,
            counter: AtomicU64::new(0),
        }
    }
}

impl<Req, Resp> Balancer<Req, Resp> for RoundRobin<Req, Resp>
where
    Req: Send + Sync + 'static,
    Resp: Send + Sync + 'static,
{
    fn pick(&self) -> Result<SharedEndpoint<Req, Resp>> {
        let snapshot = self.endpointer.snapshot();
        if snapshot.is_empty() {
            return Err(GatewayError::NoEndpoints);
        }
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        Ok(snapshot[(n % snapshot.len() as u64) as usize].clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::endpoint::{Endpoint, RequestContext};
    use crate::dispatch::factory::{EndpointFactory, EndpointHandle};
    use async_trait::async_trait;
    use std::collections::BTreeSet;
    use std::sync::Arc;

    struct Echo {
        instance: String,
    }

    #[async_trait]
    impl Endpoint<(), String> for Echo {
        async fn call(&self, _cx: &RequestContext, _req: ()) -> Result<String> {
            Ok(self.instance.clone())
        }
    }

    struct EchoFactory;

    #[async_trait]
    impl EndpointFactory<(), String> for EchoFactory {
        async fn build(&self, instance: &str) -> Result<EndpointHandle<(), String>> {
            Ok(EndpointHandle::new(Arc::new(Echo {
                instance: instance.to_string(),
            })))
        }
    }

    async fn endpointer_of(instances: &[&str]) -> Endpointer<(), String> {
        let endpointer = Endpointer::new(Arc::new(EchoFactory));
        let set: BTreeSet<String> = instances.iter().map(|s| s.to_string()).collect();
        endpointer.apply(&Arc::new(set)).await;
        endpointer
    }

    #[tokio::test]
    async fn empty_snapshot_fails_with_no_endpoints() {
        let balancer = RoundRobin::new(endpointer_of(&[]).await);
        assert!(matches!(balancer.pick(), Err(GatewayError::NoEndpoints)));
    }

    #[tokio::test]
    async fn n_picks_over_n_instances_hit_each_exactly_once() {
        let instances = ["a:1", "b:2", "c:3", "d:4"];
        let balancer = RoundRobin::new(endpointer_of(&instances).await);
        let cx = RequestContext::new();

        let mut seen = BTreeSet::new();
        for _ in 0..instances.len() {
            let endpoint = balancer.pick().unwrap();
            seen.insert(endpoint.call(&cx, ()).await.unwrap());
        }
        assert_eq!(seen.len(), instances.len());
    }

    #[tokio::test]
    async fn rotation_wraps_around() {
        let balancer = RoundRobin::new(endpointer_of(&["a:1", "b:2"]).await);
        let cx = RequestContext::new();

        let mut order = Vec::new();
        for _ in 0..3 {
            let endpoint = balancer.pick().unwrap();
            order.push(endpoint.call(&cx, ()).await.unwrap());
        }
        assert_eq!(order, vec!["a:1", "b:2", "a:1"]);
    }
}
