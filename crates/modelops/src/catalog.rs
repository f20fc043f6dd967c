//! Static catalog of manageable models.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;

use crate::error::CatalogError;
use crate::{ArtifactSpec, ExecutionBackend, ModelDescriptor, ModelFamily, Quantization};

/// Catalog entry as written in a JSON catalog file. `local_path` is derived
/// from the models root and the key.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogEntry {
    pub key: String,
    pub family: ModelFamily,
    pub remote_id: String,
    #[serde(default = "default_revision")]
    pub revision: String,
    pub estimated_memory_mb: u64,
    pub backend_hints: Vec<ExecutionBackend>,
    #[serde(default)]
    pub quantization: Option<Quantization>,
    pub artifacts: Vec<ArtifactSpec>,
}

fn default_revision() -> String {
    "main".to_string()
}

/// Read-only `key -> ModelDescriptor` lookup. Cheap to clone.
#[derive(Clone, Debug)]
pub struct ModelCatalog {
    models_root: PathBuf,
    entries: Arc<BTreeMap<String, Arc<ModelDescriptor>>>,
}

impl ModelCatalog {
    pub fn from_entries(
        models_root: impl Into<PathBuf>,
        entries: Vec<CatalogEntry>,
    ) -> Result<Self, CatalogError> {
        let models_root = models_root.into();
        let mut map = BTreeMap::new();

        for e in entries {
            if e.backend_hints.is_empty() {
                return Err(CatalogError::File(format!("{}: backend_hints is empty", e.key)));
            }
            let descriptor = ModelDescriptor {
                local_path: models_root.join(dir_name(&e.key)),
                key: e.key.clone(),
                family: e.family,
                remote_id: e.remote_id,
                revision: e.revision,
                estimated_memory_mb: e.estimated_memory_mb,
                backend_hints: e.backend_hints,
                quantization: e.quantization,
                artifacts: e.artifacts,
            };
            if map.insert(e.key.clone(), Arc::new(descriptor)).is_some() {
                return Err(CatalogError::DuplicateKey(e.key));
            }
        }

        Ok(Self { models_root, entries: Arc::new(map) })
    }

    pub fn from_json_file(models_root: impl Into<PathBuf>, path: &Path) -> Result<Self, CatalogError> {
        let bytes = std::fs::read(path)
            .map_err(|e| CatalogError::File(format!("{}: {e}", path.display())))?;
        let entries: Vec<CatalogEntry> = serde_json::from_slice(&bytes)
            .map_err(|e| CatalogError::File(format!("{}: {e}", path.display())))?;
        Self::from_entries(models_root, entries)
    }

    /// The models this service ships with.
    pub fn builtin(models_root: impl Into<PathBuf>) -> Self {
        Self::from_entries(models_root, builtin_entries())
            .expect("builtin catalog keys are unique")
    }

    pub fn get(&self, key: &str) -> Result<Arc<ModelDescriptor>, CatalogError> {
        self.entries
            .get(key)
            .cloned()
            .ok_or_else(|| CatalogError::UnknownKey(key.to_string()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(|k| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<ModelDescriptor>> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn models_root(&self) -> &Path {
        &self.models_root
    }
}

/// Repo ids contain '/', keys may too; normalize for the filesystem.
fn dir_name(key: &str) -> String {
    key.replace('/', "__")
}

fn hf_model_artifacts(shards: &[&str], companions: &[&str]) -> Vec<ArtifactSpec> {
    let mut out = vec![ArtifactSpec::new("config.json")];
    out.extend(companions.iter().map(|f| ArtifactSpec::new(f)));
    out.extend(shards.iter().map(|f| ArtifactSpec::new(f)));
    out
}

fn builtin_entries() -> Vec<CatalogEntry> {
    vec![
        CatalogEntry {
            key: "gemma-3-12b".into(),
            family: ModelFamily::CausalLm,
            remote_id: "google/gemma-3-12b-it".into(),
            revision: default_revision(),
            estimated_memory_mb: 24_500,
            backend_hints: vec![ExecutionBackend::Sdpa, ExecutionBackend::Eager],
            quantization: Some(Quantization::Bf16),
            artifacts: hf_model_artifacts(
                &[
                    "model-00001-of-00005.safetensors",
                    "model-00002-of-00005.safetensors",
                    "model-00003-of-00005.safetensors",
                    "model-00004-of-00005.safetensors",
                    "model-00005-of-00005.safetensors",
                ],
                &["tokenizer.json", "tokenizer_config.json", "generation_config.json"],
            ),
        },
        CatalogEntry {
            key: "phi-4-reasoning".into(),
            family: ModelFamily::CausalLm,
            remote_id: "microsoft/Phi-4-reasoning-plus".into(),
            revision: default_revision(),
            estimated_memory_mb: 29_500,
            backend_hints: vec![ExecutionBackend::FlashAttention2, ExecutionBackend::Eager],
            quantization: Some(Quantization::Bf16),
            artifacts: hf_model_artifacts(
                &[
                    "model-00001-of-00006.safetensors",
                    "model-00002-of-00006.safetensors",
                    "model-00003-of-00006.safetensors",
                    "model-00004-of-00006.safetensors",
                    "model-00005-of-00006.safetensors",
                    "model-00006-of-00006.safetensors",
                ],
                &["tokenizer.json", "tokenizer_config.json", "generation_config.json"],
            ),
        },
        CatalogEntry {
            key: "phi-4-multimodal".into(),
            family: ModelFamily::Multimodal,
            remote_id: "microsoft/Phi-4-multimodal-instruct".into(),
            revision: default_revision(),
            estimated_memory_mb: 11_500,
            backend_hints: vec![ExecutionBackend::FlashAttention2, ExecutionBackend::Eager],
            quantization: Some(Quantization::Bf16),
            artifacts: hf_model_artifacts(
                &["model-00001-of-00003.safetensors", "model-00002-of-00003.safetensors", "model-00003-of-00003.safetensors"],
                &["tokenizer.json", "preprocessor_config.json", "processor_config.json", "modeling_phi4mm.py"],
            ),
        },
        CatalogEntry {
            key: "gemma-3n-E4B".into(),
            family: ModelFamily::EdgeRuntime,
            remote_id: "google/gemma-3n-E4B-it-litert-lm-preview".into(),
            revision: default_revision(),
            estimated_memory_mb: 4_400,
            backend_hints: vec![ExecutionBackend::Gpu, ExecutionBackend::Cpu],
            quantization: Some(Quantization::Int4),
            artifacts: vec![ArtifactSpec::new("gemma-3n-E4B-it-int4.litertlm")],
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_lookup_and_paths() {
        let cat = ModelCatalog::builtin("/srv/models");
        assert_eq!(cat.len(), 4);
        let d = cat.get("phi-4-multimodal").unwrap();
        assert_eq!(d.family, ModelFamily::Multimodal);
        assert_eq!(d.local_path, PathBuf::from("/srv/models/phi-4-multimodal"));
        assert_eq!(d.backend_hints.last(), Some(&ExecutionBackend::Eager));
    }

    #[test]
    fn unknown_key_is_the_only_lookup_error() {
        let cat = ModelCatalog::builtin("/srv/models");
        assert!(matches!(cat.get("gpt-9"), Err(CatalogError::UnknownKey(k)) if k == "gpt-9"));
    }

    #[test]
    fn duplicate_keys_rejected() {
        let mut entries = builtin_entries();
        entries.push(entries[0].clone());
        assert!(matches!(
            ModelCatalog::from_entries("/m", entries),
            Err(CatalogError::DuplicateKey(_))
        ));
    }

    #[test]
    fn json_catalog_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        std::fs::write(
            &path,
            r#"[{
                "key": "tiny",
                "family": "causal_lm",
                "remote_id": "org/tiny-model",
                "estimated_memory_mb": 512,
                "backend_hints": ["sdpa", "eager"],
                "artifacts": [{"rel_path": "model.safetensors", "size": 1024}]
            }]"#,
        )
        .unwrap();

        let cat = ModelCatalog::from_json_file(dir.path(), &path).unwrap();
        let d = cat.get("tiny").unwrap();
        assert_eq!(d.revision, "main");
        assert_eq!(d.artifacts[0].size, Some(1024));
        assert_eq!(d.local_path, dir.path().join("tiny"));
    }
}
