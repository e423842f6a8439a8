//! CLI surface. `main.rs` only maps this module's `Result` to a process
//! exit code; all logic lives here.

use clap::{Parser, Subcommand};
use coe_adapters::{
    Check, CratesAdapter, DockerhubAdapter, DomainAdapter, Evidence, GithubOrgAdapter,
    GithubRepoAdapter, HuggingfaceModelAdapter, HuggingfaceSpaceAdapter, Namespace, NpmAdapter,
    PypiAdapter, Status,
};
use coe_cache::Cache;
use coe_config::CoeConfig;
use coe_error::CoeError;
use coe_opinion::{RadarHit, VariantCategoryResult};
use coe_runner::{CancellationToken, CheckTask};
use coe_transport_http::HttpTransport;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "coe", version, about = "Clearance opinions for project names across public namespaces")]
pub struct Cli {
    #[arg(long, global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Produce a clearance opinion for a candidate mark.
    Check {
        mark: String,
        #[arg(long)]
        cache_dir: Option<PathBuf>,
        #[arg(long = "tld")]
        tlds: Vec<String>,
    },
    /// Directory-level hashing lockfile.
    Manifest {
        #[command(subcommand)]
        action: ManifestAction,
    },
    /// Inspect or clear the content-addressed cache.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
    /// Environment sanity check.
    Doctor,
}

#[derive(Subcommand)]
pub enum ManifestAction {
    Generate { dir: PathBuf },
    Verify { manifest_path: PathBuf },
}

#[derive(Subcommand)]
pub enum CacheAction {
    Stats { dir: PathBuf },
    Clear {
        dir: PathBuf,
        #[arg(long)]
        expired_only: bool,
    },
}

#[derive(Serialize)]
struct CheckOutput {
    opinion: coe_opinion::Opinion,
    checks: Vec<Check>,
    evidence: Vec<Evidence>,
}

/// # Errors
/// Returns an error for missing/invalid arguments, cache I/O failures, or
/// manifest verification failures — see [`CoeError::to_exit_code`].
pub fn run() -> Result<(), CoeError> {
    let cli = Cli::parse();
    crate::logging::init(cli.verbose);

    let Some(command) = cli.command else {
        return Err(CoeError::NoArgs);
    };

    let runtime = tokio::runtime::Runtime::new().map_err(CoeError::Io)?;
    runtime.block_on(dispatch(command))
}

async fn dispatch(command: Command) -> Result<(), CoeError> {
    match command {
        Command::Check { mark, cache_dir, tlds } => run_check(&mark, cache_dir, tlds).await,
        Command::Manifest { action } => run_manifest(action),
        Command::Cache { action } => run_cache(action),
        Command::Doctor => run_doctor(),
    }
}

fn now_iso8601() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}

async fn run_check(mark: &str, cache_dir: Option<PathBuf>, tlds: Vec<String>) -> Result<(), CoeError> {
    let cwd = std::env::current_dir().map_err(CoeError::Io)?;
    let mut config = CoeConfig::load(&cwd)?;
    if !tlds.is_empty() {
        config.tlds = tlds;
    }

    let cache = match config.resolve_cache_dir(cache_dir) {
        Some(dir) => Some(Arc::new(
            Cache::new(dir, coe_cache::CacheOptions::default()).map_err(CoeError::Io)?,
        )),
        None => None,
    };

    let transport = Arc::new(
        HttpTransport::new(Duration::from_secs(config.timeout_seconds))
            .map_err(|e| CoeError::Config(e.to_string()))?,
    );
    let now = now_iso8601();

    let tasks = build_check_tasks(mark, &config, transport.clone(), cache.clone(), &now);
    let results = coe_runner::run_batch(tasks, config.concurrency_limit, CancellationToken::new()).await?;

    let (radar_hits, variant_categories) = run_radar(mark, transport, cache, &now).await?;

    let checks: Vec<Check> = results.iter().map(|(c, _)| c.clone()).collect();
    let evidence: Vec<Evidence> = results.iter().map(|(_, e)| e.clone()).collect();
    let opinion = coe_opinion::score(&checks, &radar_hits, &variant_categories, &config.weights);

    let output = CheckOutput { opinion, checks, evidence };
    println!(
        "{}",
        coe_hashids::canonical_json(&output).map_err(CoeError::Json)?
    );
    Ok(())
}

fn build_check_tasks(
    mark: &str,
    config: &CoeConfig,
    transport: Arc<HttpTransport>,
    cache: Option<Arc<Cache>>,
    now: &str,
) -> Vec<CheckTask> {
    let mut tasks = Vec::new();
    let a = &config.adapters;

    macro_rules! push_single {
        ($enabled:expr, $namespace:expr, $adapter:ty) => {
            if $enabled {
                let transport = transport.clone();
                let cache = cache.clone();
                let mark = mark.to_string();
                let now = now.to_string();
                tasks.push(CheckTask {
                    namespace: $namespace,
                    query_key: mark.clone(),
                    future: Box::pin(async move {
                        let adapter = <$adapter>::new(transport);
                        cached_check($namespace, &serde_json::json!({ "name": mark }), cache, &now, adapter.check(&mark, &now)).await
                    }),
                });
            }
        };
    }

    push_single!(a.npm, Namespace::Npm, NpmAdapter<HttpTransport>);
    push_single!(a.pypi, Namespace::Pypi, PypiAdapter<HttpTransport>);
    push_single!(a.crates, Namespace::Crates, CratesAdapter<HttpTransport>);
    push_single!(a.dockerhub, Namespace::Dockerhub, DockerhubAdapter<HttpTransport>);
    push_single!(a.huggingface_model, Namespace::HuggingfaceModel, HuggingfaceModelAdapter<HttpTransport>);
    push_single!(a.huggingface_space, Namespace::HuggingfaceSpace, HuggingfaceSpaceAdapter<HttpTransport>);

    if a.github_org {
        let transport = transport.clone();
        let cache = cache.clone();
        let mark = mark.to_string();
        let now = now.to_string();
        tasks.push(CheckTask {
            namespace: Namespace::GithubOrg,
            query_key: mark.clone(),
            future: Box::pin(async move {
                let adapter = GithubOrgAdapter::new(transport);
                cached_check(
                    Namespace::GithubOrg,
                    &serde_json::json!({ "org": mark }),
                    cache,
                    &now,
                    adapter.check(&mark, &now),
                )
                .await
            }),
        });
    }

    if a.github_repo {
        let transport = transport.clone();
        let cache = cache.clone();
        let mark = mark.to_string();
        let now = now.to_string();
        tasks.push(CheckTask {
            namespace: Namespace::GithubRepo,
            query_key: format!("{mark}/{mark}"),
            future: Box::pin(async move {
                let adapter = GithubRepoAdapter::new(transport);
                cached_check(
                    Namespace::GithubRepo,
                    &serde_json::json!({ "owner": mark, "name": mark }),
                    cache,
                    &now,
                    adapter.check(&mark, &mark, &now),
                )
                .await
            }),
        });
    }

    if a.domain {
        for tld in &config.tlds {
            let transport = transport.clone();
            let cache = cache.clone();
            let mark = mark.to_string();
            let tld = tld.clone();
            let now = now.to_string();
            let fqdn = format!("{mark}.{tld}");
            tasks.push(CheckTask {
                namespace: Namespace::Domain,
                query_key: fqdn.clone(),
                future: Box::pin(async move {
                    let adapter = DomainAdapter::new(transport);
                    cached_check(
                        Namespace::Domain,
                        &serde_json::json!({ "candidateMark": mark, "value": fqdn }),
                        cache,
                        &now,
                        adapter.check(&mark, &fqdn, &now),
                    )
                    .await
                }),
            });
        }
    }

    tasks
}

async fn cached_check(
    namespace: Namespace,
    query: &serde_json::Value,
    cache: Option<Arc<Cache>>,
    now: &str,
    live: impl std::future::Future<Output = (Check, Evidence)>,
) -> Result<(Check, Evidence), CoeError> {
    let namespace_str = namespace.to_string();
    if let Some(cache) = &cache
        && let Some(entry) = cache.get::<_, (Check, Evidence)>(&namespace_str, query, ENGINE_VERSION)
    {
        return Ok(entry.data);
    }
    let result = live.await;
    if let Some(cache) = &cache {
        cache
            .set(&namespace_str, query, ENGINE_VERSION, &result)
            .map_err(|source| CoeError::CacheIo {
                path: format!("cache entry for adapter '{namespace_str}'"),
                source,
            })?;
    }
    let _ = now;
    Ok(result)
}

/// Runs every variant in the generated set (already capped per-category by
/// `coe_variants::generate`) through the npm adapter to surface
/// near-collisions, and tracks which variant categories came back `taken`
/// for the linguistic-cleanliness scoring dimension.
async fn run_radar(
    mark: &str,
    transport: Arc<HttpTransport>,
    cache: Option<Arc<Cache>>,
    now: &str,
) -> Result<(Vec<RadarHit>, Vec<VariantCategoryResult>), CoeError> {
    let set = coe_variants::generate(mark);
    let mut tokenized = set.tokenized.clone();
    tokenized.sort();
    let mut homoglyph = set.homoglyph.clone();
    homoglyph.sort();
    let mut edit_distance = set.edit_distance.clone();
    edit_distance.sort();

    let mut categorized: Vec<(&'static str, String)> = Vec::new();
    categorized.extend(tokenized.into_iter().map(|v| ("tokenized", v)));
    categorized.push(("phonetic", set.phonetic.clone()));
    categorized.extend(homoglyph.into_iter().map(|v| ("homoglyph", v)));
    categorized.extend(edit_distance.into_iter().map(|v| ("edit_distance", v)));

    let mut hits = Vec::new();
    let mut any_taken: std::collections::HashMap<&'static str, bool> = std::collections::HashMap::new();

    let adapter = NpmAdapter::new(transport);
    for (category, variant) in categorized {
        let (check, _evidence) = cached_check(
            Namespace::Npm,
            &serde_json::json!({ "name": variant }),
            cache.clone(),
            now,
            adapter.check(&variant, now),
        )
        .await?;
        let entry = any_taken.entry(category).or_insert(false);
        if check.status == Status::Taken {
            *entry = true;
            hits.push(RadarHit {
                variant: variant.clone(),
                namespace: Namespace::Npm,
                similarity: coe_variants::similarity(&set.normalized, &variant),
            });
        }
    }

    let variant_categories = any_taken
        .into_iter()
        .map(|(category, taken)| VariantCategoryResult {
            category: category.to_string(),
            any_taken: taken,
        })
        .collect();

    Ok((hits, variant_categories))
}

fn run_manifest(action: ManifestAction) -> Result<(), CoeError> {
    match action {
        ManifestAction::Generate { dir } => {
            let manifest = coe_manifest::generate(&dir, &now_iso8601()).map_err(CoeError::Io)?;
            let path = dir.join(coe_manifest::MANIFEST_FILENAME);
            coe_manifest::write(&manifest, &path).map_err(CoeError::Io)?;
            println!("wrote {}", path.display());
            Ok(())
        }
        ManifestAction::Verify { manifest_path } => {
            let summary = coe_manifest::verify(&manifest_path).map_err(CoeError::Io)?;
            println!(
                "{}",
                serde_json::to_string_pretty(&summary).map_err(CoeError::Json)?
            );
            if summary.verified {
                Ok(())
            } else {
                Err(CoeError::ManifestMismatch {
                    mismatches: summary.mismatches.len(),
                })
            }
        }
    }
}

fn run_cache(action: CacheAction) -> Result<(), CoeError> {
    match action {
        CacheAction::Stats { dir } => {
            let cache = Cache::new(dir, coe_cache::CacheOptions::default()).map_err(CoeError::Io)?;
            let stats = cache.stats();
            println!(
                "{}",
                serde_json::to_string_pretty(&stats).map_err(CoeError::Json)?
            );
            Ok(())
        }
        CacheAction::Clear { dir, expired_only } => {
            let cache = Cache::new(dir, coe_cache::CacheOptions::default()).map_err(CoeError::Io)?;
            let result = cache.clear(expired_only);
            println!(
                "{}",
                serde_json::to_string_pretty(&result).map_err(CoeError::Json)?
            );
            Ok(())
        }
    }
}

fn run_doctor() -> Result<(), CoeError> {
    let token_present = coe_redaction::github_token().is_some();
    println!("GITHUB_TOKEN present: {token_present}");

    match std::env::var("COE_CACHE_DIR") {
        Ok(dir) => {
            let writable = std::fs::create_dir_all(&dir).is_ok();
            println!("COE_CACHE_DIR ({dir}) writable: {writable}");
        }
        Err(_) => println!("COE_CACHE_DIR not set; cache disabled unless --cache-dir is passed"),
    }
    Ok(())
}
