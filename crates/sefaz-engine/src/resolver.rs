//! Endpoint resolver — picks the URL to probe for a region.
//!
//! Cached entries are trusted without a liveness check. On a miss, the
//! regional URL gets a cheap reachability check; if that fails (or the
//! region has no URL) the national URL is checked and, when reachable,
//! cached under the region's key so later requests skip the regional check.

use std::sync::Arc;

use tracing::{debug, info, warn};

use sefaz_core::{EndpointSource, Environment, RegionCode};
use sefaz_probe::ProbeClient;
use sefaz_registry::RegionRegistry;

use crate::cache::EndpointCache;
use crate::error::ResolveError;

/// The URL chosen for a region and where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEndpoint {
    pub url: String,
    pub source: EndpointSource,
    /// True when the URL was served from the cache without any check.
    pub from_cache: bool,
    /// False when the registry has no regional URL for the key.
    pub regional_configured: bool,
}

#[derive(Clone)]
pub struct Resolver {
    registry: RegionRegistry,
    cache: Arc<EndpointCache>,
    client: ProbeClient,
    fallback: bool,
}

impl Resolver {
    pub fn new(
        registry: RegionRegistry,
        cache: Arc<EndpointCache>,
        client: ProbeClient,
        fallback: bool,
    ) -> Self {
        Self {
            registry,
            cache,
            client,
            fallback,
        }
    }

    pub fn cache(&self) -> &Arc<EndpointCache> {
        &self.cache
    }

    /// Resolve the endpoint to probe for `region` in `environment`.
    pub async fn resolve(
        &self,
        region: &RegionCode,
        environment: Environment,
    ) -> Result<ResolvedEndpoint, ResolveError> {
        let regional = self.registry.regional_url(region, environment);
        let regional_configured = regional.is_some();

        if let Some(cached) = self.cache.get(region, environment) {
            debug!(%region, %environment, url = %cached.url, "endpoint cache hit");
            return Ok(ResolvedEndpoint {
                url: cached.url,
                source: cached.source,
                from_cache: true,
                regional_configured,
            });
        }

        let national = if self.fallback {
            self.registry.national_url(environment)
        } else {
            None
        };

        if regional.is_none() && national.is_none() {
            return Err(ResolveError::NotConfigured {
                region: region.clone(),
                environment,
            });
        }

        let mut failures = Vec::new();

        if let Some(url) = regional {
            match self.client.check_reachable(&url).await {
                Ok(()) => {
                    self.cache
                        .insert(region, environment, &url, EndpointSource::Regional);
                    return Ok(ResolvedEndpoint {
                        url,
                        source: EndpointSource::Regional,
                        from_cache: false,
                        regional_configured,
                    });
                }
                Err(e) => {
                    warn!(%region, %environment, %url, error = %e, "regional endpoint unreachable");
                    failures.push(format!("regional: {e}"));
                }
            }
        } else {
            debug!(%region, %environment, "no regional endpoint configured");
        }

        if let Some(url) = national {
            match self.client.check_reachable(&url).await {
                Ok(()) => {
                    info!(%region, %environment, %url, "falling back to national endpoint");
                    self.cache
                        .insert(region, environment, &url, EndpointSource::NationalFallback);
                    return Ok(ResolvedEndpoint {
                        url,
                        source: EndpointSource::NationalFallback,
                        from_cache: false,
                        regional_configured,
                    });
                }
                Err(e) => {
                    warn!(%region, %environment, %url, error = %e, "national endpoint unreachable");
                    failures.push(format!("national: {e}"));
                }
            }
        }

        Err(ResolveError::NoEndpointAvailable {
            region: region.clone(),
            environment,
            detail: failures.join("; "),
        })
    }
}
