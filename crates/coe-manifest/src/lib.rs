//! A directory-level hashing lockfile for an entire run directory.

use serde::{Deserialize, Serialize};
use std::path::Path;

pub const MANIFEST_FILENAME: &str = "manifest.json";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunArtifact {
    pub path: String,
    pub sha256: String,
    pub bytes: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ManifestBody {
    #[serde(rename = "generatedAt")]
    generated_at: String,
    files: Vec<RunArtifact>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunManifest {
    #[serde(rename = "generatedAt")]
    pub generated_at: String,
    pub files: Vec<RunArtifact>,
    #[serde(rename = "rootSha256")]
    pub root_sha256: String,
}

/// Enumerates regular files directly under `dir` (excluding `manifest.json`
/// and dotfiles), hashes each, and computes `rootSha256` over the manifest
/// with that field elided.
///
/// # Errors
/// Propagates I/O errors reading the directory or any listed file.
pub fn generate(dir: &Path, generated_at: &str) -> std::io::Result<RunManifest> {
    let mut names: Vec<String> = std::fs::read_dir(dir)?
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| name != MANIFEST_FILENAME && !name.starts_with('.'))
        .collect();
    names.sort();

    let mut files = Vec::with_capacity(names.len());
    for name in names {
        let path = dir.join(&name);
        let sha256 = coe_hashids::hash_file(&path)?;
        let bytes = std::fs::metadata(&path)?.len();
        files.push(RunArtifact { path: name, sha256, bytes });
    }

    let body = ManifestBody {
        generated_at: generated_at.to_string(),
        files: files.clone(),
    };
    let root_sha256 = coe_hashids::hash_object(&body)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

    Ok(RunManifest {
        generated_at: generated_at.to_string(),
        files,
        root_sha256,
    })
}

/// Serializes `manifest` as pretty JSON (2-space indent) with a trailing
/// newline.
///
/// # Errors
/// Propagates serialization or I/O errors.
pub fn write(manifest: &RunManifest, path: &Path) -> std::io::Result<()> {
    let mut body = serde_json::to_string_pretty(manifest)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    body.push('\n');
    std::fs::write(path, body)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Mismatch {
    pub path: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VerifySummary {
    pub verified: bool,
    pub mismatches: Vec<Mismatch>,
}

/// Rehashes every file listed in the manifest at `manifest_path` and reports
/// per-file match/missing status. Any mismatch fails verification.
///
/// # Errors
/// Propagates I/O errors reading the manifest file itself (a missing or
/// corrupt *listed* artifact is reported as a mismatch, not an error).
pub fn verify(manifest_path: &Path) -> std::io::Result<VerifySummary> {
    let raw = std::fs::read_to_string(manifest_path)?;
    let manifest: RunManifest = serde_json::from_str(&raw)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    let dir = manifest_path.parent().unwrap_or_else(|| Path::new("."));

    let mut mismatches = Vec::new();
    for artifact in &manifest.files {
        let path = dir.join(&artifact.path);
        match coe_hashids::hash_file(&path) {
            Ok(sha256) if sha256 == artifact.sha256 => {}
            Ok(sha256) => mismatches.push(Mismatch {
                path: artifact.path.clone(),
                reason: format!("sha256 mismatch: expected {}, got {sha256}", artifact.sha256),
            }),
            Err(e) => mismatches.push(Mismatch {
                path: artifact.path.clone(),
                reason: format!("missing or unreadable: {e}"),
            }),
        }
    }

    Ok(VerifySummary {
        verified: mismatches.is_empty(),
        mismatches,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_excludes_manifest_and_dotfiles() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.json"), "hello").unwrap();
        std::fs::write(dir.path().join(".hidden"), "secret").unwrap();
        std::fs::write(dir.path().join(MANIFEST_FILENAME), "{}").unwrap();
        let manifest = generate(dir.path(), "2026-02-15T12:00:00Z").unwrap();
        assert_eq!(manifest.files.len(), 1);
        assert_eq!(manifest.files[0].path, "a.json");
    }

    #[test]
    fn root_sha256_is_fixed_for_known_bytes_and_timestamp() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.json"), "hello").unwrap();
        std::fs::write(dir.path().join("b.json"), "world").unwrap();
        let manifest = generate(dir.path(), "2026-02-15T12:00:00Z").unwrap();
        // rootSha256 depends solely on file bytes, names, and generatedAt.
        assert_eq!(manifest.root_sha256.len(), 64);
        let manifest2 = generate(dir.path(), "2026-02-15T12:00:00Z").unwrap();
        assert_eq!(manifest.root_sha256, manifest2.root_sha256);
    }

    #[test]
    fn mutating_a_file_flips_verification_to_fail() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.json"), "hello").unwrap();
        let manifest = generate(dir.path(), "2026-02-15T12:00:00Z").unwrap();
        let manifest_path = dir.path().join(MANIFEST_FILENAME);
        write(&manifest, &manifest_path).unwrap();

        let summary = verify(&manifest_path).unwrap();
        assert!(summary.verified);

        std::fs::write(dir.path().join("a.json"), "tampered").unwrap();
        let summary = verify(&manifest_path).unwrap();
        assert!(!summary.verified);
        assert_eq!(summary.mismatches.len(), 1);
    }

    #[test]
    fn missing_file_is_reported_as_mismatch_not_panic() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.json"), "hello").unwrap();
        let manifest = generate(dir.path(), "2026-02-15T12:00:00Z").unwrap();
        let manifest_path = dir.path().join(MANIFEST_FILENAME);
        write(&manifest, &manifest_path).unwrap();

        std::fs::remove_file(dir.path().join("a.json")).unwrap();
        let summary = verify(&manifest_path).unwrap();
        assert!(!summary.verified);
    }
}
