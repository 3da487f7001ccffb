//! Validated-endpoint cache.
//!
//! Maps `(region, environment)` to the URL that last passed a reachability
//! check. Entries are trusted until they expire or accumulate
//! `failure_threshold` consecutive transport failures.
//!
//! Backed by a sharded map, so lookups for one region never wait on writes
//! for another and each entry is replaced as a whole.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::{debug, warn};

use sefaz_core::{EndpointSource, Environment, RegionCode};

type CacheKey = (RegionCode, Environment);

/// A resolved endpoint and its failure bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedEndpoint {
    pub url: String,
    pub source: EndpointSource,
    pub validated_at: Instant,
    consecutive_failures: u32,
}

impl CachedEndpoint {
    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }
}

/// Concurrency-safe endpoint cache owned by the resolver.
#[derive(Debug)]
pub struct EndpointCache {
    entries: DashMap<CacheKey, CachedEndpoint>,
    ttl: Duration,
    failure_threshold: u32,
}

impl EndpointCache {
    pub fn new(ttl: Duration, failure_threshold: u32) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            failure_threshold: failure_threshold.max(1),
        }
    }

    /// Fresh entry for the key, dropping it first if it has expired.
    pub fn get(&self, region: &RegionCode, environment: Environment) -> Option<CachedEndpoint> {
        let key = (region.clone(), environment);
        {
            let entry = self.entries.get(&key)?;
            if entry.validated_at.elapsed() < self.ttl {
                return Some(entry.clone());
            }
        }
        // The read guard must be gone before removing from the same shard.
        self.entries
            .remove_if(&key, |_, e| e.validated_at.elapsed() >= self.ttl);
        debug!(%region, %environment, "cached endpoint expired");
        None
    }

    pub fn insert(
        &self,
        region: &RegionCode,
        environment: Environment,
        url: &str,
        source: EndpointSource,
    ) {
        self.entries.insert(
            (region.clone(), environment),
            CachedEndpoint {
                url: url.to_string(),
                source,
                validated_at: Instant::now(),
                consecutive_failures: 0,
            },
        );
        debug!(%region, %environment, %url, ?source, "endpoint cached");
    }

    /// Count a transport failure against `url`. Returns true if the entry was dropped.
    ///
    /// Ignored when the cached URL has already moved on.
    pub fn record_failure(&self, region: &RegionCode, environment: Environment, url: &str) -> bool {
        let key = (region.clone(), environment);
        let invalidate = match self.entries.get_mut(&key) {
            Some(mut entry) if entry.url == url => {
                entry.consecutive_failures += 1;
                entry.consecutive_failures >= self.failure_threshold
            }
            _ => return false,
        };
        if invalidate {
            self.entries.remove_if(&key, |_, e| e.url == url);
            warn!(
                %region,
                %environment,
                %url,
                threshold = self.failure_threshold,
                "cached endpoint invalidated after consecutive failures"
            );
        }
        invalidate
    }

    /// Reset the failure count after a probe got through.
    pub fn record_success(&self, region: &RegionCode, environment: Environment, url: &str) {
        if let Some(mut entry) = self.entries.get_mut(&(region.clone(), environment)) {
            if entry.url == url {
                entry.consecutive_failures = 0;
            }
        }
    }

    pub fn invalidate(&self, region: &RegionCode, environment: Environment) -> bool {
        let removed = self.entries.remove(&(region.clone(), environment)).is_some();
        if removed {
            debug!(%region, %environment, "cached endpoint invalidated");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
