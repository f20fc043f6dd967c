use std::path::Path;

use crate::{ArtifactSpec, Hash32, ModelFile};

/// Deterministic manifest hash:
/// - sort by rel_path (bytewise)
/// - hash bytes: "<rel_path>\n<size>\n" for each file
pub fn manifest_hash(mut files: Vec<ModelFile>) -> Hash32 {
    files.sort_by(|a, b| a.rel_path.cmp(&b.rel_path));

    let mut hasher = blake3::Hasher::new();
    for f in files {
        hasher.update(f.rel_path.as_bytes());
        hasher.update(b"\n");
        hasher.update(f.size.to_string().as_bytes());
        hasher.update(b"\n");
    }
    hasher.finalize().into()
}

/// Checks every expected artifact under `dir`. Returns the observed files,
/// or one message per missing / empty / wrongly sized artifact.
pub fn verify_artifacts(dir: &Path, specs: &[ArtifactSpec]) -> Result<Vec<ModelFile>, Vec<String>> {
    let mut files = Vec::with_capacity(specs.len());
    let mut problems = Vec::new();

    for spec in specs {
        let path = dir.join(&spec.rel_path);
        let meta = match std::fs::metadata(&path) {
            Ok(m) if m.is_file() => m,
            Ok(_) => {
                problems.push(format!("{}: not a regular file", spec.rel_path));
                continue;
            }
            Err(_) => {
                problems.push(format!("{}: missing", spec.rel_path));
                continue;
            }
        };

        let size = meta.len();
        if size == 0 {
            problems.push(format!("{}: empty", spec.rel_path));
            continue;
        }
        if let Some(expected) = spec.size {
            if expected != size {
                problems.push(format!("{}: size {size}, expected {expected}", spec.rel_path));
                continue;
            }
        }
        files.push(ModelFile { rel_path: spec.rel_path.clone(), size });
    }

    if problems.is_empty() && !specs.is_empty() {
        Ok(files)
    } else if specs.is_empty() {
        Err(vec!["descriptor lists no artifacts".to_string()])
    } else {
        Err(problems)
    }
}
