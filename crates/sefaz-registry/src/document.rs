//! The persisted registry document and its built-in seed.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use sefaz_core::{Environment, NATIONAL_KEY, REGION_TABLE, RegionCode};

use crate::error::{RegistryError, RegistryResult};

const NATIONAL_PRODUCTION_URL: &str =
    "https://www.nfe.fazenda.gov.br/NFeStatusServico/NFeStatusServico2.asmx";
const NATIONAL_HOMOLOGATION_URL: &str =
    "https://hom.nfe.fazenda.gov.br/NFeStatusServico/NFeStatusServico2.asmx";

/// Endpoint URLs keyed by region code (or `NATIONAL`), then environment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegistryDocument {
    entries: BTreeMap<String, BTreeMap<Environment, String>>,
}

impl RegistryDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// The stock endpoint set: every federative unit plus the national service.
    pub fn builtin() -> Self {
        let mut doc = Self::new();
        for (code, _) in REGION_TABLE {
            let host = code.to_ascii_lowercase();
            doc.set(
                code,
                Environment::Production,
                format!("https://nfe.sefaz.{host}.gov.br/nfeweb/services/NfeStatusServico2.asmx"),
            );
            doc.set(
                code,
                Environment::Homologation,
                format!(
                    "https://homologacao.nfe.sefaz.{host}.gov.br/nfeweb/services/NfeStatusServico2.asmx"
                ),
            );
        }
        doc.set(NATIONAL_KEY, Environment::Production, NATIONAL_PRODUCTION_URL);
        doc.set(NATIONAL_KEY, Environment::Homologation, NATIONAL_HOMOLOGATION_URL);
        doc
    }

    /// Parse and validate a JSON document, canonicalizing region keys.
    pub fn from_json(bytes: &[u8]) -> RegistryResult<Self> {
        let raw: BTreeMap<String, BTreeMap<Environment, String>> =
            serde_json::from_slice(bytes).map_err(|e| RegistryError::Deserialize(e.to_string()))?;

        let mut doc = Self::new();
        for (key, envs) in raw {
            let key = canonical_key(&key)?;
            for (env, url) in envs {
                validate_url(&key, env, &url)?;
                doc.set(&key, env, url);
            }
        }
        Ok(doc)
    }

    pub fn to_json(&self) -> RegistryResult<Vec<u8>> {
        serde_json::to_vec_pretty(self).map_err(|e| RegistryError::Serialize(e.to_string()))
    }

    pub fn get(&self, key: &str, environment: Environment) -> Option<&str> {
        self.entries
            .get(key)
            .and_then(|envs| envs.get(&environment))
            .map(String::as_str)
    }

    /// All configured environments for a key (empty when the key is absent).
    pub fn environments(&self, key: &str) -> BTreeMap<Environment, String> {
        self.entries.get(key).cloned().unwrap_or_default()
    }

    pub fn set(&mut self, key: &str, environment: Environment, url: impl Into<String>) {
        self.entries
            .entry(key.to_string())
            .or_default()
            .insert(environment, url.into());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn canonical_key(key: &str) -> RegistryResult<String> {
    if key.eq_ignore_ascii_case(NATIONAL_KEY) {
        return Ok(NATIONAL_KEY.to_string());
    }
    RegionCode::parse(key)
        .map(String::from)
        .map_err(|e| RegistryError::InvalidDocument(e.to_string()))
}

fn validate_url(key: &str, environment: Environment, url: &str) -> RegistryResult<()> {
    if url.starts_with("https://") || url.starts_with("http://") {
        Ok(())
    } else {
        Err(RegistryError::InvalidDocument(format!(
            "{key}/{environment}: not an http(s) URL: {url:?}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_covers_every_region_and_national() {
        let doc = RegistryDocument::builtin();
        assert_eq!(doc.len(), REGION_TABLE.len() + 1);
        assert_eq!(
            doc.get("SP", Environment::Production),
            Some("https://nfe.sefaz.sp.gov.br/nfeweb/services/NfeStatusServico2.asmx")
        );
        assert!(doc.get(NATIONAL_KEY, Environment::Homologation).is_some());
    }

    #[test]
    fn from_json_canonicalizes_keys() {
        let doc = RegistryDocument::from_json(
            br#"{"sp": {"production": "https://sp.example/ws"}, "national": {"homologation": "http://nat.example/ws"}}"#,
        )
        .unwrap();
        assert_eq!(doc.get("SP", Environment::Production), Some("https://sp.example/ws"));
        assert_eq!(doc.get(NATIONAL_KEY, Environment::Homologation), Some("http://nat.example/ws"));
        assert_eq!(doc.get("SP", Environment::Homologation), None);
    }

    #[test]
    fn from_json_rejects_unknown_region() {
        let err = RegistryDocument::from_json(br#"{"XX": {"production": "https://x"}}"#).unwrap_err();
        assert!(matches!(err, RegistryError::InvalidDocument(_)));
    }

    #[test]
    fn from_json_rejects_unknown_environment() {
        let err = RegistryDocument::from_json(br#"{"SP": {"staging": "https://x"}}"#).unwrap_err();
        assert!(matches!(err, RegistryError::Deserialize(_)));
    }

    #[test]
    fn from_json_rejects_non_http_url() {
        let err = RegistryDocument::from_json(br#"{"SP": {"production": "ftp://x"}}"#).unwrap_err();
        assert!(matches!(err, RegistryError::InvalidDocument(_)));
    }

    #[test]
    fn json_round_trip_preserves_entries() {
        let doc = RegistryDocument::builtin();
        let parsed = RegistryDocument::from_json(&doc.to_json().unwrap()).unwrap();
        assert_eq!(parsed, doc);
    }
}
