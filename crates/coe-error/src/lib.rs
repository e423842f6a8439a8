//! Crate-wide error taxonomy for the Clearance Opinion Engine.
//!
//! Errors carry a stable `COE.<CATEGORY>.<TYPE>` code so that callers — the
//! CLI, report renderers, or a third-party replay tool — can match on the
//! code string without depending on this crate's enum layout.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A structured error surfaced to a caller.
///
/// Local adapter/transport failures do NOT produce a `CoeError`; they degrade
/// to a `Check` with `status=unknown` and an entry in `Check.errors` instead
/// (see `coe-adapters`). `CoeError` is reserved for failures that abort the
/// run: cache I/O, manifest verification, and configuration/programmer errors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    pub context: Option<String>,
}

impl ErrorDetail {
    #[must_use]
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            context: None,
        }
    }

    #[must_use]
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}

/// Stable error codes. Adapter-specific `_FAIL`/`_RATE_LIMITED` codes are
/// built per-namespace at the call site (`coe.adapter_fail_code`).
pub mod codes {
    pub const INIT_NO_ARGS: &str = "COE.INIT.NO_ARGS";
    pub const INIT_BAD_CHANNEL: &str = "COE.INIT.BAD_CHANNEL";
    pub const RENDER_WRITE_FAIL: &str = "COE.RENDER.WRITE_FAIL";
    pub const LOCK_MISMATCH: &str = "COE.LOCK.MISMATCH";
    pub const CACHE_IO_FAIL: &str = "COE.CACHE.IO_FAIL";
    pub const CONFIG_INVALID: &str = "COE.CONFIG.INVALID";
}

/// Build the per-namespace adapter failure code, e.g. `COE.ADAPTER.NPM_FAIL`.
#[must_use]
pub fn adapter_fail_code(namespace: &str) -> String {
    format!("COE.ADAPTER.{}_FAIL", namespace.to_uppercase())
}

/// Build the per-namespace rate-limit code, e.g. `COE.ADAPTER.DOMAIN_RATE_LIMITED`.
/// Standardizes on one code shape for every namespace, registries and
/// domain lookups alike.
#[must_use]
pub fn adapter_rate_limited_code(namespace: &str) -> String {
    format!("COE.ADAPTER.{}_RATE_LIMITED", namespace.to_uppercase())
}

/// Top-level library error type. Library code returns this; only the CLI
/// maps it to a process exit code.
#[derive(Error, Debug)]
pub enum CoeError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("cache I/O error at {path}: {source}")]
    CacheIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("manifest write failed at {path}: {reason}")]
    ManifestWrite { path: String, reason: String },

    #[error("manifest verification failed: {mismatches} file(s) mismatched")]
    ManifestMismatch { mismatches: usize },

    #[error("unknown channel/namespace: {0}")]
    BadChannel(String),

    #[error("missing candidate mark")]
    NoArgs,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoeError {
    /// Process exit code: `0` success, `1` manifest mismatch, `2`
    /// configuration/usage errors.
    #[must_use]
    pub fn to_exit_code(&self) -> i32 {
        match self {
            Self::ManifestMismatch { .. } => 1,
            Self::Config(_) | Self::BadChannel(_) | Self::NoArgs => 2,
            _ => 1,
        }
    }

    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Config(_) => codes::CONFIG_INVALID,
            Self::CacheIo { .. } => codes::CACHE_IO_FAIL,
            Self::ManifestWrite { .. } => codes::RENDER_WRITE_FAIL,
            Self::ManifestMismatch { .. } => codes::LOCK_MISMATCH,
            Self::BadChannel(_) => codes::INIT_BAD_CHANNEL,
            Self::NoArgs => codes::INIT_NO_ARGS,
            Self::Io(_) | Self::Json(_) => codes::CACHE_IO_FAIL,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adapter_fail_code_uppercases_namespace() {
        assert_eq!(adapter_fail_code("npm"), "COE.ADAPTER.NPM_FAIL");
        assert_eq!(adapter_fail_code("github_org"), "COE.ADAPTER.GITHUB_ORG_FAIL");
    }

    #[test]
    fn exit_codes_match_table() {
        assert_eq!(CoeError::NoArgs.to_exit_code(), 2);
        assert_eq!(
            CoeError::ManifestMismatch { mismatches: 1 }.to_exit_code(),
            1
        );
        assert_eq!(CoeError::Config("bad".into()).to_exit_code(), 2);
    }
}
