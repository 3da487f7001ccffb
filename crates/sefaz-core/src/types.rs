//! Shared types used across the SEFAZ status crates.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::InputError;

/// Registry key reserved for the national (jurisdiction-independent) endpoint.
pub const NATIONAL_KEY: &str = "NATIONAL";

/// Federative units and their IBGE `cUF` codes.
///
/// The numeric identifier is part of every outbound envelope and never
/// changes for a given unit.
pub const REGION_TABLE: [(&str, &str); 27] = [
    ("AC", "12"),
    ("AL", "27"),
    ("AP", "16"),
    ("AM", "13"),
    ("BA", "29"),
    ("CE", "23"),
    ("DF", "53"),
    ("ES", "32"),
    ("GO", "52"),
    ("MA", "21"),
    ("MT", "51"),
    ("MS", "50"),
    ("MG", "31"),
    ("PA", "15"),
    ("PB", "25"),
    ("PR", "41"),
    ("PE", "26"),
    ("PI", "22"),
    ("RJ", "33"),
    ("RN", "24"),
    ("RS", "43"),
    ("RO", "11"),
    ("RR", "14"),
    ("SC", "42"),
    ("SP", "35"),
    ("SE", "28"),
    ("TO", "17"),
];

/// Look up the IBGE numeric identifier for a canonical region code.
pub fn numeric_id_for(code: &str) -> Option<&'static str> {
    REGION_TABLE
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, id)| *id)
}

// ── Environment ────────────────────────────────────────────────────

/// Deployment target of an endpoint.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Production,
    Homologation,
}

impl Environment {
    pub const ALL: [Environment; 2] = [Environment::Production, Environment::Homologation];

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Production => "production",
            Environment::Homologation => "homologation",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "production" => Ok(Environment::Production),
            "homologation" => Ok(Environment::Homologation),
            _ => Err(InputError::InvalidEnvironment(s.to_string())),
        }
    }
}

// ── Region ─────────────────────────────────────────────────────────

/// Canonical (upper-case) two-letter region code known to the IBGE table.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RegionCode(String);

impl RegionCode {
    /// Parse a code case-insensitively, rejecting anything outside the table.
    pub fn parse(input: &str) -> Result<Self, InputError> {
        let canonical = input.trim().to_ascii_uppercase();
        if canonical.len() != 2 || numeric_id_for(&canonical).is_none() {
            return Err(InputError::InvalidRegion(input.to_string()));
        }
        Ok(Self(canonical))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// IBGE numeric identifier. Always present for a parsed code.
    pub fn numeric_id(&self) -> &'static str {
        numeric_id_for(&self.0).unwrap_or_default()
    }
}

impl fmt::Display for RegionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for RegionCode {
    type Error = InputError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RegionCode> for String {
    fn from(code: RegionCode) -> Self {
        code.0
    }
}

/// A region with its numeric identifier and configured endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub code: RegionCode,
    pub numeric_id: String,
    /// Status service URL per environment; missing entries are "not configured".
    pub environments: BTreeMap<Environment, String>,
}

impl Region {
    pub fn url(&self, environment: Environment) -> Option<&str> {
        self.environments.get(&environment).map(String::as_str)
    }
}

/// Which endpoint answered for the regional side of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndpointSource {
    /// The region's own endpoint.
    Regional,
    /// The national endpoint, standing in for an unreachable regional one.
    NationalFallback,
    /// No endpoint could be resolved.
    None,
}
