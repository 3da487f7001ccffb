//! The per-request aggregate returned by the engine.

use serde::Serialize;

use sefaz_core::{EndpointSource, Environment, RegionCode};
use sefaz_probe::ProbeResult;

/// Regional and national outcomes for one request, kept side by side.
///
/// Built fresh for every request and never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregateStatus {
    region: RegionCode,
    environment: Environment,
    #[serde(rename = "status_regional")]
    regional: ProbeResult,
    #[serde(rename = "status_national")]
    national: ProbeResult,
    regional_source: EndpointSource,
}

impl AggregateStatus {
    pub(crate) fn new(
        region: RegionCode,
        environment: Environment,
        regional: ProbeResult,
        national: ProbeResult,
        regional_source: EndpointSource,
    ) -> Self {
        Self {
            region,
            environment,
            regional,
            national,
            regional_source,
        }
    }

    pub fn region(&self) -> &RegionCode {
        &self.region
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }

    pub fn regional(&self) -> &ProbeResult {
        &self.regional
    }

    pub fn national(&self) -> &ProbeResult {
        &self.national
    }

    pub fn regional_source(&self) -> EndpointSource {
        self.regional_source
    }
}
