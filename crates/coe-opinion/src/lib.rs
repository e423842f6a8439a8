//! Weighted aggregation of the sorted checks and radar hits into a single
//! tiered opinion.

use coe_adapters::{Authority, Check, Namespace, Status};
use coe_config::Weights;
use serde::{Deserialize, Serialize};

const PRIMARY_NAMESPACES: &[Namespace] = &[Namespace::Npm, Namespace::GithubOrg, Namespace::GithubRepo, Namespace::Pypi];
const SECONDARY_NAMESPACES: &[Namespace] = &[
    Namespace::Crates,
    Namespace::Dockerhub,
    Namespace::HuggingfaceModel,
    Namespace::HuggingfaceSpace,
];
const COLLISION_THRESHOLD: f64 = 0.75;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Tier {
    Green,
    Yellow,
    Red,
}

/// A near-collision hit from the variant/radar pass.
#[derive(Debug, Clone)]
pub struct RadarHit {
    pub variant: String,
    pub namespace: Namespace,
    pub similarity: f64,
}

/// Whether any check run against a variant category came back `taken`, for
/// the linguistic-cleanliness dimension.
#[derive(Debug, Clone)]
pub struct VariantCategoryResult {
    pub category: String,
    pub any_taken: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BreakdownEntry {
    pub dimension: String,
    pub weight: f64,
    pub value: f64,
    pub contribution: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Opinion {
    pub tier: Tier,
    pub score: u8,
    pub breakdown: Vec<BreakdownEntry>,
    pub rationale: String,
}

fn check_score(status: Status) -> f64 {
    match status {
        Status::Available => 1.0,
        Status::Unknown => 0.5,
        Status::Taken => 0.0,
    }
}

fn mean_score(checks: &[Check], namespaces: &[Namespace]) -> f64 {
    let relevant: Vec<f64> = checks
        .iter()
        .filter(|c| namespaces.contains(&c.namespace))
        .map(|c| check_score(c.status))
        .collect();
    if relevant.is_empty() {
        return 0.5;
    }
    relevant.iter().sum::<f64>() / relevant.len() as f64
}

fn collision_score(radar_hits: &[RadarHit]) -> f64 {
    let max_similarity = radar_hits
        .iter()
        .filter(|h| h.similarity > COLLISION_THRESHOLD)
        .map(|h| h.similarity)
        .fold(0.0_f64, f64::max);
    1.0 - max_similarity
}

fn linguistic_score(categories: &[VariantCategoryResult]) -> f64 {
    if categories.is_empty() {
        return 1.0;
    }
    let taken = categories.iter().filter(|c| c.any_taken).count();
    1.0 - (taken as f64 / categories.len() as f64)
}

fn tier_from_score(score: u8) -> Tier {
    if score >= 85 {
        Tier::Green
    } else if score >= 60 {
        Tier::Yellow
    } else {
        Tier::Red
    }
}

/// Aggregates `checks` and `radar_hits` into one `Opinion`.
/// `weights` must already be validated to sum to 1.0 (`Weights::validate`).
#[must_use]
pub fn score(
    checks: &[Check],
    radar_hits: &[RadarHit],
    variant_categories: &[VariantCategoryResult],
    weights: &Weights,
) -> Opinion {
    let dims: [(&str, f64, f64); 5] = [
        (
            "primary-namespaces-available",
            weights.primary_namespaces_available,
            mean_score(checks, PRIMARY_NAMESPACES),
        ),
        (
            "secondary-namespaces-available",
            weights.secondary_namespaces_available,
            mean_score(checks, SECONDARY_NAMESPACES),
        ),
        (
            "domain-available",
            weights.domain_available,
            mean_score(checks, &[Namespace::Domain]),
        ),
        (
            "no-close-collisions",
            weights.no_close_collisions,
            collision_score(radar_hits),
        ),
        (
            "linguistic-cleanliness",
            weights.linguistic_cleanliness,
            linguistic_score(variant_categories),
        ),
    ];

    let breakdown: Vec<BreakdownEntry> = dims
        .iter()
        .map(|(dimension, weight, value)| BreakdownEntry {
            dimension: (*dimension).to_string(),
            weight: *weight,
            value: *value,
            contribution: weight * value * 100.0,
        })
        .collect();

    let raw = dims.iter().map(|(_, w, v)| w * v).sum::<f64>();
    let score = (raw * 100.0).round().clamp(0.0, 100.0) as u8;

    let authoritative_taken_primary = checks
        .iter()
        .filter(|c| {
            PRIMARY_NAMESPACES.contains(&c.namespace)
                && c.authority == Authority::Authoritative
                && c.status == Status::Taken
        })
        .count();

    let mut tier = tier_from_score(score);
    if authoritative_taken_primary >= 2 {
        tier = Tier::Red;
    } else if authoritative_taken_primary == 1 && tier == Tier::Green {
        tier = Tier::Yellow;
    }

    let rationale = format!(
        "score {score} ({tier:?}); {authoritative_taken_primary} authoritative taken hit(s) in primary namespaces"
    );

    Opinion {
        tier,
        score,
        breakdown,
        rationale,
    }
}
