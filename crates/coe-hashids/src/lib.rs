//! Stable content hashing, canonical JSON, deterministic ids.
//!
//! All functions here are pure: none read `now()` or mutable state, so equal
//! inputs always produce equal outputs — an id must never depend on `now`
//! or the raw transport response.
//!
//! Canonicalization follows JCS (`serde_json_canonicalizer`, RFC 8785):
//! sorted object keys at every level, no insignificant whitespace, shortest
//! round-trip numeric form. The content hash itself is SHA-256, chosen so
//! that the documented replay recipes (`curl`, `sha256sum`) match the ids
//! this crate produces — see DESIGN.md for the rationale.

use serde::Serialize;
use sha2::{Digest, Sha256};
use std::io::Read;
use std::path::Path;

/// SHA-256 of UTF-8 bytes, lowercase hex64.
#[must_use]
pub fn hash_string(s: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(s.as_bytes());
    hex::encode(hasher.finalize())
}

/// Streaming SHA-256 over a file's raw bytes (no newline normalization).
///
/// # Errors
/// Propagates any I/O error encountered while reading `path`.
pub fn hash_file(path: impl AsRef<Path>) -> std::io::Result<String> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// SHA-256 over the RFC 8785 (JCS) canonical JSON serialization of `value`.
///
/// # Errors
/// Returns an error if `value` cannot be serialized to JSON or canonicalized.
pub fn hash_object<T: Serialize>(value: &T) -> serde_json::Result<String> {
    let canonical = canonical_json(value)?;
    Ok(hash_string(&canonical))
}

/// RFC 8785 canonical JSON string for `value`: keys sorted lexicographically
/// at every object level, no insignificant whitespace, shortest round-trip
/// number form, minimal string escaping.
///
/// # Errors
/// Returns an error if `value` cannot be serialized to a `serde_json::Value`.
pub fn canonical_json<T: Serialize>(value: &T) -> serde_json::Result<String> {
    let json_value = serde_json::to_value(value)?;
    let bytes =
        serde_json_canonicalizer::to_vec(&json_value).expect("canonicalization of JSON Value cannot fail");
    Ok(String::from_utf8(bytes).expect("JCS output is always valid UTF-8"))
}

/// `chk.<namespace>.<hash12>` — deterministic id for a `Check`.
///
/// `hash12` is the first 12 hex chars of `hash_string(namespace + "\0" + normalized_query)`.
/// Callers must pass an already-normalized, canonical query string so that
/// equal queries (modulo normalization) yield equal ids.
#[must_use]
pub fn check_id(namespace: &str, normalized_query: &str) -> String {
    let full = hash_string(&format!("{namespace}\u{0}{normalized_query}"));
    format!("chk.{namespace}.{}", &full[..12])
}

/// `ev.<checkId-tail>.<seq>` — deterministic id for an `Evidence` record.
///
/// `seq` is a stable ordinal per check (0 for the primary evidence record).
#[must_use]
pub fn evidence_id(check_id: &str, seq: u32) -> String {
    let tail = check_id.rsplit('.').next().unwrap_or(check_id);
    format!("ev.{tail}.{seq}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn hash_string_is_hex64() {
        let h = hash_string("hello");
        assert_eq!(h.len(), 64);
        assert!(h.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn hash_object_ignores_key_order() {
        let a = json!({"b": 2, "a": 1});
        let b = json!({"a": 1, "b": 2});
        assert_eq!(hash_object(&a).unwrap(), hash_object(&b).unwrap());
    }

    #[test]
    fn hash_object_distinguishes_different_values() {
        let a = json!({"a": 1});
        let b = json!({"a": 2});
        assert_ne!(hash_object(&a).unwrap(), hash_object(&b).unwrap());
    }

    #[test]
    fn check_id_is_deterministic_and_namespaced() {
        let id1 = check_id("npm", "{\"name\":\"foo\"}");
        let id2 = check_id("npm", "{\"name\":\"foo\"}");
        assert_eq!(id1, id2);
        assert!(id1.starts_with("chk.npm."));
        assert_eq!(id1.len(), "chk.npm.".len() + 12);
    }

    #[test]
    fn check_id_differs_across_namespace() {
        let npm = check_id("npm", "{\"name\":\"foo\"}");
        let pypi = check_id("pypi", "{\"name\":\"foo\"}");
        assert_ne!(npm, pypi);
    }

    #[test]
    fn evidence_id_uses_check_id_tail_and_seq() {
        let chk = check_id("npm", "{\"name\":\"foo\"}");
        let ev = evidence_id(&chk, 0);
        let tail = chk.rsplit('.').next().unwrap();
        assert_eq!(ev, format!("ev.{tail}.0"));
    }

    #[test]
    fn hash_file_streams_bytes_without_normalization() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, "hello\r\nworld").unwrap();
        let h1 = hash_file(&path).unwrap();
        let h2 = hash_string("hello\r\nworld");
        assert_eq!(h1, h2);
    }

    proptest! {
        #[test]
        fn check_id_deterministic_prop(ns in "[a-z_]{1,20}", q in "\\PC{0,40}") {
            let a = check_id(&ns, &q);
            let b = check_id(&ns, &q);
            prop_assert_eq!(a, b);
        }
    }
}
