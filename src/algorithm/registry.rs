//! Algorithm provider registry.
//!
//! # Responsibilities
//! - Hold one provider table per capability kind
//! - Resolve providers by exact type name
//! - Construct instances from descriptors, failing before any side effect
//!
//! # Design Decisions
//! - Populated once during bootstrap through `&mut self`, then shared via Arc
//! - No interior mutability: concurrent reads need no synchronization
//! - Capabilities are marker types so `create` returns the right trait object

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::algorithm::{
    load_balance, shadow, traffic, Algorithm, AlgorithmKind, LoadBalanceAlgorithm, Properties,
    ShadowAlgorithm, TrafficAlgorithm,
};
use crate::error::{RuleError, RuleResult};
use crate::rule::AlgorithmDescriptor;

/// Constructor a provider uses to build an instance from properties.
pub type Constructor<A> = fn(&Properties) -> Result<Arc<A>, String>;

/// A named constructor for one algorithm type.
pub struct Provider<A: ?Sized> {
    type_name: &'static str,
    construct: Constructor<A>,
}

impl<A: ?Sized> Provider<A> {
    pub const fn new(type_name: &'static str, construct: Constructor<A>) -> Self {
        Self {
            type_name,
            construct,
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Build an instance from raw properties.
    pub fn construct(&self, props: &Properties) -> Result<Arc<A>, String> {
        (self.construct)(props)
    }
}

impl<A: ?Sized> Clone for Provider<A> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<A: ?Sized> Copy for Provider<A> {}

impl<A: ?Sized> fmt::Debug for Provider<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Provider")
            .field("type_name", &self.type_name)
            .finish()
    }
}

pub type ProviderTable<A> = HashMap<&'static str, Provider<A>>;

/// A category of algorithms with its own provider table.
pub trait Capability: 'static {
    const KIND: AlgorithmKind;
    type Instance: Algorithm + ?Sized;

    fn table(registry: &AlgorithmRegistry) -> &ProviderTable<Self::Instance>;
    fn table_mut(registry: &mut AlgorithmRegistry) -> &mut ProviderTable<Self::Instance>;
}

/// Shadow-routing algorithms.
#[derive(Debug)]
pub struct ShadowCapability;

/// Traffic-matching algorithms.
#[derive(Debug)]
pub struct TrafficCapability;

/// Instance load balancers used by traffic strategies.
#[derive(Debug)]
pub struct LoadBalanceCapability;

impl Capability for ShadowCapability {
    const KIND: AlgorithmKind = AlgorithmKind::Shadow;
    type Instance = dyn ShadowAlgorithm;

    fn table(registry: &AlgorithmRegistry) -> &ProviderTable<Self::Instance> {
        &registry.shadow
    }

    fn table_mut(registry: &mut AlgorithmRegistry) -> &mut ProviderTable<Self::Instance> {
        &mut registry.shadow
    }
}

impl Capability for TrafficCapability {
    const KIND: AlgorithmKind = AlgorithmKind::Traffic;
    type Instance = dyn TrafficAlgorithm;

    fn table(registry: &AlgorithmRegistry) -> &ProviderTable<Self::Instance> {
        &registry.traffic
    }

    fn table_mut(registry: &mut AlgorithmRegistry) -> &mut ProviderTable<Self::Instance> {
        &mut registry.traffic
    }
}

impl Capability for LoadBalanceCapability {
    const KIND: AlgorithmKind = AlgorithmKind::LoadBalancer;
    type Instance = dyn LoadBalanceAlgorithm;

    fn table(registry: &AlgorithmRegistry) -> &ProviderTable<Self::Instance> {
        &registry.load_balancers
    }

    fn table_mut(registry: &mut AlgorithmRegistry) -> &mut ProviderTable<Self::Instance> {
        &mut registry.load_balancers
    }
}

/// Registration table mapping (capability, type name) to a provider.
#[derive(Default)]
pub struct AlgorithmRegistry {
    shadow: ProviderTable<dyn ShadowAlgorithm>,
    traffic: ProviderTable<dyn TrafficAlgorithm>,
    load_balancers: ProviderTable<dyn LoadBalanceAlgorithm>,
}

impl AlgorithmRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding every built-in provider.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        shadow::register(&mut registry);
        traffic::register(&mut registry);
        load_balance::register(&mut registry);
        tracing::debug!(
            shadow = registry.shadow.len(),
            traffic = registry.traffic.len(),
            load_balancer = registry.load_balancers.len(),
            "Built-in algorithm providers registered"
        );
        registry
    }

    /// Record a provider under capability `C`. A later provider with the same
    /// type name replaces the earlier one.
    pub fn register<C: Capability>(&mut self, provider: Provider<C::Instance>) {
        if C::table_mut(self)
            .insert(provider.type_name(), provider)
            .is_some()
        {
            tracing::warn!(
                kind = %C::KIND,
                type_name = provider.type_name(),
                "Algorithm provider replaced"
            );
        }
    }

    /// Find the provider for `type_name`.
    pub fn resolve<C: Capability>(&self, type_name: &str) -> Option<&Provider<C::Instance>> {
        C::table(self).get(type_name)
    }

    /// Build an instance for the descriptor.
    pub fn create<C: Capability>(
        &self,
        descriptor: &AlgorithmDescriptor,
    ) -> RuleResult<Arc<C::Instance>> {
        let provider = self.resolve::<C>(descriptor.type_name()).ok_or_else(|| {
            RuleError::UnknownAlgorithmType {
                kind: C::KIND,
                type_name: descriptor.type_name().to_string(),
            }
        })?;
        provider
            .construct(descriptor.properties())
            .map_err(|reason| RuleError::InvalidAlgorithm {
                kind: C::KIND,
                type_name: descriptor.type_name().to_string(),
                reason,
            })
    }

    pub fn contains<C: Capability>(&self, type_name: &str) -> bool {
        self.resolve::<C>(type_name).is_some()
    }

    /// Same as [`contains`](Self::contains) with the capability given at runtime.
    pub fn contains_kind(&self, kind: AlgorithmKind, type_name: &str) -> bool {
        match kind {
            AlgorithmKind::Shadow => self.contains::<ShadowCapability>(type_name),
            AlgorithmKind::Traffic => self.contains::<TrafficCapability>(type_name),
            AlgorithmKind::LoadBalancer => self.contains::<LoadBalanceCapability>(type_name),
        }
    }

    /// Registered type names for a capability, sorted.
    pub fn types(&self, kind: AlgorithmKind) -> Vec<&'static str> {
        let mut types: Vec<&'static str> = match kind {
            AlgorithmKind::Shadow => self.shadow.keys().copied().collect(),
            AlgorithmKind::Traffic => self.traffic.keys().copied().collect(),
            AlgorithmKind::LoadBalancer => self.load_balancers.keys().copied().collect(),
        };
        types.sort_unstable();
        types
    }
}

impl fmt::Debug for AlgorithmRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlgorithmRegistry")
            .field("shadow", &self.types(AlgorithmKind::Shadow))
            .field("traffic", &self.types(AlgorithmKind::Traffic))
            .field("load_balancer", &self.types(AlgorithmKind::LoadBalancer))
            .finish()
    }
}
