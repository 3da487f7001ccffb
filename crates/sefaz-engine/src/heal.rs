//! Auto-heal — single-hop repair of a stale regional endpoint.

use std::sync::{Arc, LazyLock};

use regex::Regex;
use tracing::{error, info, warn};

use sefaz_core::{EndpointSource, Environment, RegionCode};
use sefaz_probe::{ProbeClient, ProbeResult};
use sefaz_registry::RegionRegistry;

use crate::cache::EndpointCache;

/// Service name followed by its version number, e.g. `NfeStatusServico2`.
static VERSION_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(StatusServico)(\d+)").expect("version marker pattern is valid")
});

/// Rewrite the last service version marker in `url` to the next known version.
///
/// Version 2 jumps straight to 4 (there was never a published 3 for the
/// 4.00 layout); any other version is incremented. Returns `None` when the
/// URL carries no version marker.
pub fn next_endpoint_version(url: &str) -> Option<String> {
    let caps = VERSION_MARKER.captures_iter(url).last()?;
    let whole = caps.get(0)?;
    let name = caps.get(1)?.as_str();
    let version: u32 = caps.get(2)?.as_str().parse().ok()?;
    let next = match version {
        2 => 4,
        n => n.checked_add(1)?,
    };
    Some(format!(
        "{}{name}{next}{}",
        &url[..whole.start()],
        &url[whole.end()..]
    ))
}

/// Repairs a cached regional URL whose server reports the service gone.
#[derive(Clone)]
pub struct AutoHeal {
    registry: RegionRegistry,
    cache: Arc<EndpointCache>,
    client: ProbeClient,
}

impl AutoHeal {
    pub fn new(registry: RegionRegistry, cache: Arc<EndpointCache>, client: ProbeClient) -> Self {
        Self {
            registry,
            cache,
            client,
        }
    }

    /// Rewrite `failing_url`, persist it, and probe the replacement once.
    ///
    /// Returns `None` when no rewrite rule applies; the caller keeps the
    /// original failure in that case. If the replacement cannot be talked
    /// to either, the registry entry goes back to `failing_url`; it is never
    /// left more than one version ahead of the last working URL.
    pub async fn heal(
        &self,
        region: &RegionCode,
        environment: Environment,
        failing_url: &str,
    ) -> Option<ProbeResult> {
        let candidate = next_endpoint_version(failing_url)?;
        info!(%region, %environment, from = %failing_url, to = %candidate, "auto-heal rewriting endpoint");

        let persisted = self.persist(region, environment, &candidate).await;
        self.cache.invalidate(region, environment);

        let result = self.client.probe(&candidate, region.numeric_id()).await;
        if result.is_transport_failure() {
            warn!(%region, %environment, url = %candidate, reason = result.reason_text(), "auto-heal re-probe failed");
            if persisted && self.persist(region, environment, failing_url).await {
                info!(%region, %environment, url = %failing_url, "auto-heal restored previous endpoint");
            }
        } else {
            self.cache
                .insert(region, environment, &candidate, EndpointSource::Regional);
            info!(%region, %environment, url = %candidate, "auto-heal re-probe got through");
        }
        Some(result)
    }

    /// Write the regional URL on the blocking pool; the registry fsyncs.
    async fn persist(&self, region: &RegionCode, environment: Environment, url: &str) -> bool {
        let registry = self.registry.clone();
        let code = region.clone();
        let target = url.to_string();
        let outcome = tokio::task::spawn_blocking(move || {
            registry.set_regional_url(&code, environment, &target)
        })
        .await;

        match outcome {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                error!(%region, %environment, %url, error = %e, "auto-heal could not persist endpoint");
                false
            }
            Err(e) => {
                error!(%region, %environment, %url, error = %e, "auto-heal registry write task failed");
                false
            }
        }
    }
}
