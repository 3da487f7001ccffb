//! RegionRegistry — shared, atomically persisted view of the registry document.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use tracing::{debug, info};

use sefaz_core::{Environment, NATIONAL_KEY, REGION_TABLE, Region, RegionCode};

use crate::document::RegistryDocument;
use crate::error::{RegistryError, RegistryResult};

/// Thread-safe region registry, optionally backed by a JSON file.
///
/// Cloning is cheap; all clones share the same document.
#[derive(Clone)]
pub struct RegionRegistry {
    doc: Arc<RwLock<Arc<RegistryDocument>>>,
    path: Option<Arc<PathBuf>>,
    /// Serializes writers so read-modify-persist-swap never interleaves.
    writer: Arc<Mutex<()>>,
}

impl RegionRegistry {
    /// Load a registry from an existing file.
    pub fn open(path: &Path) -> RegistryResult<Self> {
        let bytes = std::fs::read(path)?;
        let doc = RegistryDocument::from_json(&bytes)?;
        debug!(?path, keys = doc.len(), "registry loaded");
        Ok(Self::with_document(doc, Some(path.to_path_buf())))
    }

    /// Load a registry, seeding the file with the built-in endpoints if it is missing.
    pub fn open_or_seed(path: &Path) -> RegistryResult<Self> {
        if path.exists() {
            return Self::open(path);
        }
        let registry = Self::with_document(RegistryDocument::builtin(), Some(path.to_path_buf()));
        registry.save()?;
        info!(?path, "registry seeded with built-in endpoints");
        Ok(registry)
    }

    /// Create an ephemeral registry that never touches disk.
    pub fn in_memory(doc: RegistryDocument) -> Self {
        Self::with_document(doc, None)
    }

    fn with_document(doc: RegistryDocument, path: Option<PathBuf>) -> Self {
        Self {
            doc: Arc::new(RwLock::new(Arc::new(doc))),
            path: path.map(Arc::new),
            writer: Arc::new(Mutex::new(())),
        }
    }

    /// Current document. Readers hold a consistent snapshot even across writes.
    pub fn snapshot(&self) -> Arc<RegistryDocument> {
        self.doc
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref().map(PathBuf::as_path)
    }

    // ── Reads ──────────────────────────────────────────────────────

    /// Look up a region by (case-insensitive) code.
    pub fn lookup(&self, code: &str) -> RegistryResult<Region> {
        let code =
            RegionCode::parse(code).map_err(|_| RegistryError::NotFound(format!("region {code:?}")))?;
        Ok(self.region(&code))
    }

    /// Numeric identifier of a region.
    pub fn numeric_id(&self, code: &str) -> RegistryResult<String> {
        RegionCode::parse(code)
            .map(|c| c.numeric_id().to_string())
            .map_err(|_| RegistryError::NotFound(format!("region {code:?}")))
    }

    /// Region view for an already validated code.
    pub fn region(&self, code: &RegionCode) -> Region {
        Region {
            code: code.clone(),
            numeric_id: code.numeric_id().to_string(),
            environments: self.snapshot().environments(code.as_str()),
        }
    }

    pub fn regional_url(&self, code: &RegionCode, environment: Environment) -> Option<String> {
        self.snapshot()
            .get(code.as_str(), environment)
            .map(str::to_string)
    }

    pub fn national_url(&self, environment: Environment) -> Option<String> {
        self.snapshot()
            .get(NATIONAL_KEY, environment)
            .map(str::to_string)
    }

    /// Every known region, in table order.
    pub fn regions(&self) -> Vec<Region> {
        let doc = self.snapshot();
        REGION_TABLE
            .iter()
            .filter_map(|(code, _)| RegionCode::parse(code).ok())
            .map(|code| Region {
                numeric_id: code.numeric_id().to_string(),
                environments: doc.environments(code.as_str()),
                code,
            })
            .collect()
    }

    // ── Writes ─────────────────────────────────────────────────────

    /// Replace a region's URL for one environment and persist.
    pub fn set_regional_url(
        &self,
        code: &RegionCode,
        environment: Environment,
        url: &str,
    ) -> RegistryResult<()> {
        self.update(|doc| doc.set(code.as_str(), environment, url))?;
        info!(region = %code, %environment, %url, "registry entry rewritten");
        Ok(())
    }

    /// Replace the national URL for one environment and persist.
    pub fn set_national_url(&self, environment: Environment, url: &str) -> RegistryResult<()> {
        self.update(|doc| doc.set(NATIONAL_KEY, environment, url))?;
        info!(%environment, %url, "national registry entry rewritten");
        Ok(())
    }

    /// Persist the current document (no-op for in-memory registries).
    pub fn save(&self) -> RegistryResult<()> {
        let _guard = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        self.persist(&self.snapshot())
    }

    /// Apply a mutation on a copy, persist it, then publish it to readers.
    fn update(&self, mutate: impl FnOnce(&mut RegistryDocument)) -> RegistryResult<()> {
        let _guard = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let mut next = (*self.snapshot()).clone();
        mutate(&mut next);
        self.persist(&next)?;
        *self.doc.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(next);
        Ok(())
    }

    fn persist(&self, doc: &RegistryDocument) -> RegistryResult<()> {
        let Some(path) = self.path.as_deref() else {
            return Ok(());
        };
        let bytes = doc.to_json()?;
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(&bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| RegistryError::Io(e.error))?;
        debug!(?path, bytes = bytes.len(), "registry persisted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sp() -> RegionCode {
        RegionCode::parse("SP").unwrap()
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let registry = RegionRegistry::in_memory(RegistryDocument::builtin());
        let region = registry.lookup("sp").unwrap();
        assert_eq!(region.code.as_str(), "SP");
        assert_eq!(region.numeric_id, "35");
        assert!(region.url(Environment::Production).is_some());
    }

    #[test]
    fn lookup_unknown_region_is_not_found() {
        let registry = RegionRegistry::in_memory(RegistryDocument::builtin());
        assert!(matches!(registry.lookup("ZZ"), Err(RegistryError::NotFound(_))));
        assert!(matches!(registry.numeric_id("ZZ"), Err(RegistryError::NotFound(_))));
    }

    #[test]
    fn known_region_without_entries_has_no_urls() {
        let registry = RegionRegistry::in_memory(RegistryDocument::new());
        let region = registry.lookup("RJ").unwrap();
        assert!(region.environments.is_empty());
        assert_eq!(registry.numeric_id("rj").unwrap(), "33");
    }

    #[test]
    fn regions_lists_the_whole_table() {
        let registry = RegionRegistry::in_memory(RegistryDocument::new());
        assert_eq!(registry.regions().len(), REGION_TABLE.len());
    }

    #[test]
    fn snapshot_is_unaffected_by_later_writes() {
        let registry = RegionRegistry::in_memory(RegistryDocument::builtin());
        let before = registry.snapshot();
        registry
            .set_regional_url(&sp(), Environment::Production, "https://new.example/ws")
            .unwrap();
        assert_ne!(before.get("SP", Environment::Production), Some("https://new.example/ws"));
        assert_eq!(
            registry.regional_url(&sp(), Environment::Production).as_deref(),
            Some("https://new.example/ws")
        );
    }

    #[test]
    fn seed_then_reopen_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.json");

        let registry = RegionRegistry::open_or_seed(&path).unwrap();
        assert!(path.exists());
        registry
            .set_national_url(Environment::Production, "https://national.example/ws")
            .unwrap();

        let reopened = RegionRegistry::open(&path).unwrap();
        assert_eq!(
            reopened.national_url(Environment::Production).as_deref(),
            Some("https://national.example/ws")
        );
        assert_eq!(reopened.snapshot().len(), REGION_TABLE.len() + 1);
    }

    #[test]
    fn write_leaves_no_temp_files_behind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.json");
        let registry = RegionRegistry::open_or_seed(&path).unwrap();
        registry
            .set_regional_url(&sp(), Environment::Homologation, "https://hom.example/ws")
            .unwrap();

        let files: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn failed_persist_keeps_previous_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing-dir").join("registry.json");
        let registry =
            RegionRegistry::with_document(RegistryDocument::builtin(), Some(path.clone()));

        let original = registry.regional_url(&sp(), Environment::Production);
        assert!(registry
            .set_regional_url(&sp(), Environment::Production, "https://new.example/ws")
            .is_err());
        assert_eq!(registry.regional_url(&sp(), Environment::Production), original);
    }

    #[test]
    fn open_rejects_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.json");
        std::fs::write(&path, b"{not json").unwrap();
        assert!(matches!(
            RegionRegistry::open(&path),
            Err(RegistryError::Deserialize(_))
        ));
    }

    #[test]
    fn concurrent_readers_see_whole_urls() {
        let registry = RegionRegistry::in_memory(RegistryDocument::builtin());
        let candidates = ["https://a.example/ws", "https://b.example/ws"];

        std::thread::scope(|s| {
            let writer = registry.clone();
            s.spawn(move || {
                for i in 0..200 {
                    writer
                        .set_regional_url(&sp(), Environment::Production, candidates[i % 2])
                        .unwrap();
                }
            });
            for _ in 0..4 {
                let reader = registry.clone();
                s.spawn(move || {
                    for _ in 0..200 {
                        let url = reader.regional_url(&sp(), Environment::Production).unwrap();
                        assert!(
                            url.starts_with("https://nfe.sefaz.sp") || candidates.contains(&url.as_str())
                        );
                    }
                });
            }
        });
    }
}
