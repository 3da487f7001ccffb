//! Status engine — validates a request, probes both sides concurrently,
//! and composes the aggregate.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};

use sefaz_core::config::PolicyConfig;
use sefaz_core::{EndpointSource, Environment, RegionCode, SefazConfig};
use sefaz_probe::{FailureKind, ProbeClient, ProbeResult, Transport};
use sefaz_registry::RegionRegistry;

use crate::cache::EndpointCache;
use crate::error::{EngineError, ResolveError};
use crate::heal::AutoHeal;
use crate::resolver::Resolver;
use crate::status::AggregateStatus;

/// Behaviour switches covering the deployment variants of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnginePolicy {
    /// Fall back to the national endpoint when the regional one is unreachable.
    pub fallback: bool,
    /// Rewrite and re-probe a cached endpoint that fails at the transport level.
    pub auto_heal: bool,
    /// Replace transport failures with a simulated in-operation answer.
    pub mock_on_failure: bool,
    /// Resolve the regional endpoint through the cache; when off, both
    /// registry URLs are probed directly on every request.
    pub use_cache: bool,
}

impl Default for EnginePolicy {
    fn default() -> Self {
        Self::from(&PolicyConfig::default())
    }
}

impl From<&PolicyConfig> for EnginePolicy {
    fn from(config: &PolicyConfig) -> Self {
        Self {
            fallback: config.fallback,
            auto_heal: config.auto_heal,
            mock_on_failure: config.mock_on_failure,
            use_cache: config.use_cache,
        }
    }
}

/// Resolves, probes, and aggregates regional and national status.
#[derive(Clone)]
pub struct StatusEngine {
    registry: RegionRegistry,
    client: ProbeClient,
    cache: Arc<EndpointCache>,
    resolver: Resolver,
    healer: AutoHeal,
    policy: EnginePolicy,
}

impl StatusEngine {
    pub fn new(
        registry: RegionRegistry,
        client: ProbeClient,
        cache: Arc<EndpointCache>,
        policy: EnginePolicy,
    ) -> Self {
        let resolver = Resolver::new(
            registry.clone(),
            cache.clone(),
            client.clone(),
            policy.fallback,
        );
        let healer = AutoHeal::new(registry.clone(), cache.clone(), client.clone());
        Self {
            registry,
            client,
            cache,
            resolver,
            healer,
            policy,
        }
    }

    /// Wire an engine from configuration.
    pub fn from_config(
        config: &SefazConfig,
        registry: RegionRegistry,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let client = ProbeClient::new(transport)
            .with_timeouts(config.probe.timeout(), config.probe.reachability_timeout());
        let cache = Arc::new(EndpointCache::new(
            config.cache.ttl(),
            config.cache.failure_threshold,
        ));
        Self::new(registry, client, cache, EnginePolicy::from(&config.policy))
    }

    pub fn registry(&self) -> &RegionRegistry {
        &self.registry
    }

    pub fn cache(&self) -> &Arc<EndpointCache> {
        &self.cache
    }

    pub fn policy(&self) -> EnginePolicy {
        self.policy
    }

    /// Validate raw request input and return the aggregate status.
    ///
    /// `environment` defaults to production. Invalid input fails before any
    /// network activity; every other outcome is reported in the result.
    pub async fn get_status(
        &self,
        region: &str,
        environment: Option<&str>,
    ) -> Result<AggregateStatus, EngineError> {
        let region = RegionCode::parse(region)?;
        let environment = match environment {
            Some(env) => env.parse::<Environment>()?,
            None => Environment::default(),
        };
        Ok(self.status(&region, environment).await)
    }

    /// Probe the regional and national sides concurrently.
    ///
    /// Neither side can cancel or block the other; dropping the returned
    /// future abandons both probes and nothing partial is reported.
    pub async fn status(&self, region: &RegionCode, environment: Environment) -> AggregateStatus {
        let started = Instant::now();
        let ((regional, source), national) = tokio::join!(
            self.regional_side(region, environment),
            self.national_side(region, environment),
        );

        info!(
            %region,
            %environment,
            regional = regional.available(),
            national = national.available(),
            ?source,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "status aggregated"
        );
        AggregateStatus::new(region.clone(), environment, regional, national, source)
    }

    async fn regional_side(
        &self,
        region: &RegionCode,
        environment: Environment,
    ) -> (ProbeResult, EndpointSource) {
        let started = Instant::now();

        if !self.policy.use_cache {
            let Some(url) = self.registry.regional_url(region, environment) else {
                return (
                    ProbeResult::not_configured(format!(
                        "no endpoint configured for {region}/{environment}"
                    )),
                    EndpointSource::None,
                );
            };
            let result = self.client.probe(&url, region.numeric_id()).await;
            return (self.finish(result, started), EndpointSource::Regional);
        }

        let resolved = match self.resolver.resolve(region, environment).await {
            Ok(resolved) => resolved,
            Err(e @ ResolveError::NotConfigured { .. }) => {
                return (ProbeResult::not_configured(e.to_string()), EndpointSource::None);
            }
            Err(e @ ResolveError::NoEndpointAvailable { .. }) => {
                let result = ProbeResult::no_active_endpoint(e.to_string());
                return (self.finish(result, started), EndpointSource::None);
            }
        };

        if resolved.source == EndpointSource::NationalFallback {
            if !resolved.regional_configured {
                let result = ProbeResult::not_configured(format!(
                    "no endpoint configured for {region}/{environment}; national fallback active at {}",
                    resolved.url
                ));
                return (result, EndpointSource::NationalFallback);
            }
            let result = ProbeResult::transport_failure(
                format!(
                    "regional endpoint unreachable; national fallback active at {}",
                    resolved.url
                ),
                started,
            );
            return (self.finish(result, started), EndpointSource::NationalFallback);
        }

        let result = self.client.probe(&resolved.url, region.numeric_id()).await;
        if !result.is_transport_failure() {
            self.cache.record_success(region, environment, &resolved.url);
            return (self.finish(result, started), EndpointSource::Regional);
        }

        // Only a "gone" reply from a cached URL means the URL went stale;
        // timeouts and 5xx are outages and just count against the cache.
        if resolved.from_cache && self.policy.auto_heal && result.is_retired_endpoint() {
            if let Some(healed) = self.healer.heal(region, environment, &resolved.url).await {
                return (self.finish(healed, started), EndpointSource::Regional);
            }
            debug!(%region, url = %resolved.url, "no heal rule applies");
        }
        self.cache.record_failure(region, environment, &resolved.url);
        (self.finish(result, started), EndpointSource::Regional)
    }

    async fn national_side(&self, region: &RegionCode, environment: Environment) -> ProbeResult {
        let started = Instant::now();
        let Some(url) = self.registry.national_url(environment) else {
            return ProbeResult::not_configured(format!(
                "no national endpoint configured for {environment}"
            ));
        };
        let result = self.client.probe(&url, region.numeric_id()).await;
        self.finish(result, started)
    }

    /// Apply mock-on-failure to a side's final result.
    fn finish(&self, result: ProbeResult, started: Instant) -> ProbeResult {
        if self.policy.mock_on_failure
            && matches!(
                result.failure(),
                Some(FailureKind::Transport | FailureKind::NoActiveEndpoint)
            )
        {
            debug!(reason = result.reason_text(), "substituting simulated status");
            return ProbeResult::simulated(started);
        }
        result
    }
}
