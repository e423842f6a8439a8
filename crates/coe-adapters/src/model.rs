//! The `Check`/`Evidence` data model shared by every namespace adapter.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// The closed set of namespaces COE can check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Namespace {
    GithubOrg,
    GithubRepo,
    Npm,
    Pypi,
    Crates,
    Dockerhub,
    HuggingfaceModel,
    HuggingfaceSpace,
    Domain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Available,
    Taken,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Authority {
    Authoritative,
    Indicative,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Claimability {
    ClaimableNow,
    NotClaimable,
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorEntry {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Check {
    pub id: String,
    pub namespace: Namespace,
    pub query: serde_json::Value,
    pub status: Status,
    pub authority: Authority,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claimability: Option<Claimability>,
    #[serde(rename = "observedAt")]
    pub observed_at: String,
    #[serde(rename = "evidenceRef")]
    pub evidence_ref: String,
    pub errors: Vec<ErrorEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvidenceSource {
    pub system: String,
    pub url: String,
    pub method: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Evidence {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub source: EvidenceSource,
    #[serde(rename = "observedAt")]
    pub observed_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bytes: Option<u64>,
    pub repro: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}
