//! Instance load balancers for traffic strategies.
//!
//! # Design Decisions
//! - Balancers are stateless apart from an internal counter
//! - Selection borrows from the caller's instance list; no allocation
//! - Empty instance list yields `None`, never a panic

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::algorithm::registry::{AlgorithmRegistry, LoadBalanceCapability, Provider};
use crate::algorithm::{Algorithm, Properties};

/// Picks one compute-node instance for a matched strategy.
pub trait LoadBalanceAlgorithm: Algorithm {
    fn next_instance<'a>(&self, instances: &'a [String]) -> Option<&'a str>;
}

/// Round-robin selector.
/// Stores an internal counter to rotate through instances.
#[derive(Debug, Default)]
pub struct RoundRobinLoadBalancer {
    props: Properties,
    counter: AtomicUsize,
}

/// Uniform random selector.
#[derive(Debug, Default)]
pub struct RandomLoadBalancer {
    props: Properties,
}

impl Algorithm for RoundRobinLoadBalancer {
    fn type_name(&self) -> &'static str {
        "ROUND_ROBIN"
    }

    fn properties(&self) -> &Properties {
        &self.props
    }
}

impl LoadBalanceAlgorithm for RoundRobinLoadBalancer {
    fn next_instance<'a>(&self, instances: &'a [String]) -> Option<&'a str> {
        if instances.is_empty() {
            return None;
        }
        let index = self.counter.fetch_add(1, Ordering::Relaxed) % instances.len();
        Some(instances[index].as_str())
    }
}

impl Algorithm for RandomLoadBalancer {
    fn type_name(&self) -> &'static str {
        "RANDOM"
    }

    fn properties(&self) -> &Properties {
        &self.props
    }
}

impl LoadBalanceAlgorithm for RandomLoadBalancer {
    fn next_instance<'a>(&self, instances: &'a [String]) -> Option<&'a str> {
        if instances.is_empty() {
            return None;
        }
        Some(instances[fastrand::usize(..instances.len())].as_str())
    }
}

fn round_robin(props: &Properties) -> Result<Arc<dyn LoadBalanceAlgorithm>, String> {
    Ok(Arc::new(RoundRobinLoadBalancer {
        props: props.clone(),
        counter: AtomicUsize::new(0),
    }))
}

fn random(props: &Properties) -> Result<Arc<dyn LoadBalanceAlgorithm>, String> {
    Ok(Arc::new(RandomLoadBalancer {
        props: props.clone(),
    }))
}

pub(crate) fn register(registry: &mut AlgorithmRegistry) {
    registry.register::<LoadBalanceCapability>(Provider::new("ROUND_ROBIN", round_robin));
    registry.register::<LoadBalanceCapability>(Provider::new("RANDOM", random));
}
