//! Per-namespace adapters. Each is a thin factory over a shared
//! [`Transport`] reference; the common per-check algorithm lives in
//! [`execute`] so namespace structs only supply a URL, headers, and a status
//! mapping.

use crate::model::{Authority, Check, Claimability, ErrorEntry, Evidence, EvidenceSource, Namespace, Status};
use crate::transport::{RequestInit, Transport, TransportError, TransportResponse};
use serde_json::json;
use std::sync::Arc;

type StatusOutcome = (Status, Authority, Option<Claimability>, Option<ErrorEntry>);

fn percent_encode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(b as char);
            }
            _ => out.push_str(&format!("%{b:02X}")),
        }
    }
    out
}

/// Builds a replay command for `Evidence.repro`. Header values are redacted
/// (`coe_redaction::redact`) so a persisted or printed evidence record never
/// carries `GITHUB_TOKEN` in the clear.
fn curl_command(url: &str, method: &str, headers: &[(String, String)]) -> String {
    let mut cmd = format!("curl -s -X {method}");
    for (name, value) in headers {
        cmd.push_str(&format!(" -H '{name}: {}'", coe_redaction::redact(value)));
    }
    cmd.push_str(&format!(" '{url}'"));
    cmd
}

/// Status mapping shared by every namespace whose registry gives a clean
/// 200/404 taken-vs-available signal (github, npm, pypi, crates, dockerhub,
/// huggingface). Open question in the source design notes is resolved here:
/// every namespace emits a uniform `_RATE_LIMITED` code on HTTP 429.
fn map_registry_status(namespace: Namespace, status: u16) -> StatusOutcome {
    let ns = namespace.to_string();
    match status {
        200 => (Status::Taken, Authority::Authoritative, None, None),
        404 => (Status::Available, Authority::Authoritative, None, None),
        429 => (
            Status::Unknown,
            Authority::Indicative,
            None,
            Some(ErrorEntry {
                code: coe_error::adapter_rate_limited_code(&ns),
                message: "rate limited (HTTP 429)".into(),
                context: None,
            }),
        ),
        other => (
            Status::Unknown,
            Authority::Indicative,
            None,
            Some(ErrorEntry {
                code: coe_error::adapter_fail_code(&ns),
                message: format!("unexpected status {other}"),
                context: None,
            }),
        ),
    }
}

fn map_domain_status(status: u16) -> StatusOutcome {
    match status {
        200 => (
            Status::Taken,
            Authority::Authoritative,
            Some(Claimability::NotClaimable),
            None,
        ),
        404 => (
            Status::Available,
            Authority::Authoritative,
            Some(Claimability::ClaimableNow),
            None,
        ),
        429 => (
            Status::Unknown,
            Authority::Indicative,
            Some(Claimability::Unknown),
            Some(ErrorEntry {
                code: coe_error::adapter_rate_limited_code("domain"),
                message: "rate limited (HTTP 429)".into(),
                context: None,
            }),
        ),
        other => (
            Status::Unknown,
            Authority::Indicative,
            Some(Claimability::Unknown),
            Some(ErrorEntry {
                code: coe_error::adapter_fail_code("domain"),
                message: format!("unexpected status {other}"),
                context: None,
            }),
        ),
    }
}

#[allow(clippy::too_many_arguments)]
async fn execute(
    transport: &dyn Transport,
    namespace: Namespace,
    query: serde_json::Value,
    normalized_query: &str,
    url: String,
    init: RequestInit,
    now: &str,
    map_status: impl Fn(u16) -> StatusOutcome,
) -> (Check, Evidence) {
    let id = coe_hashids::check_id(&namespace.to_string(), normalized_query);
    let evidence_ref = coe_hashids::evidence_id(&id, 0);
    let system = namespace.to_string();
    let method = init.method.clone();
    let headers = init.headers.clone();

    match transport.call(&url, init).await {
        Ok(TransportResponse { status, body }) => {
            let (status, authority, claimability, error) = map_status(status);
            let sha256 = coe_hashids::hash_string(&body);
            let bytes = body.len() as u64;
            let repro = vec![curl_command(&url, &method, &headers)];
            let check = Check {
                id,
                namespace,
                query,
                status,
                authority,
                claimability,
                observed_at: now.to_string(),
                evidence_ref: evidence_ref.clone(),
                errors: error.into_iter().collect(),
            };
            let evidence = Evidence {
                id: evidence_ref,
                kind: "http_response".into(),
                source: EvidenceSource { system, url, method },
                observed_at: now.to_string(),
                sha256: Some(sha256),
                bytes: Some(bytes),
                repro,
                notes: None,
            };
            (check, evidence)
        }
        Err(TransportError(message)) => {
            let code = coe_error::adapter_fail_code(&system);
            let repro = vec![curl_command(&url, &method, &headers)];
            let check = Check {
                id,
                namespace,
                query,
                status: Status::Unknown,
                authority: Authority::Indicative,
                claimability: None,
                observed_at: now.to_string(),
                evidence_ref: evidence_ref.clone(),
                errors: vec![ErrorEntry {
                    code,
                    message: message.clone(),
                    context: None,
                }],
            };
            let evidence = Evidence {
                id: evidence_ref,
                kind: "http_response".into(),
                source: EvidenceSource { system, url, method },
                observed_at: now.to_string(),
                sha256: None,
                bytes: None,
                repro,
                notes: Some(message),
            };
            (check, evidence)
        }
    }
}

fn github_headers() -> RequestInit {
    let mut init = RequestInit::get().with_header("Accept", "application/vnd.github+json");
    if let Some(token) = coe_redaction::github_token() {
        init = init.with_header("Authorization", format!("Bearer {token}"));
    }
    init
}

macro_rules! single_name_adapter {
    ($adapter:ident, $namespace:expr, $url_fmt:expr, $accept:expr) => {
        pub struct $adapter<T: Transport> {
            transport: Arc<T>,
        }

        impl<T: Transport> $adapter<T> {
            #[must_use]
            pub fn new(transport: Arc<T>) -> Self {
                Self { transport }
            }

            pub async fn check(&self, name: &str, now: &str) -> (Check, Evidence) {
                let query = json!({ "name": name });
                let normalized = coe_hashids::canonical_json(&query).expect("query is always serializable");
                let url = format!($url_fmt, percent_encode(name));
                let init = RequestInit::get().with_header("Accept", $accept);
                execute(
                    self.transport.as_ref(),
                    $namespace,
                    query,
                    &normalized,
                    url,
                    init,
                    now,
                    |status| map_registry_status($namespace, status),
                )
                .await
            }
        }
    };
}

single_name_adapter!(NpmAdapter, Namespace::Npm, "https://registry.npmjs.org/{}", "application/json");
single_name_adapter!(PypiAdapter, Namespace::Pypi, "https://pypi.org/pypi/{}/json", "application/json");
single_name_adapter!(CratesAdapter, Namespace::Crates, "https://crates.io/api/v1/crates/{}", "application/json");
single_name_adapter!(DockerhubAdapter, Namespace::Dockerhub, "https://hub.docker.com/v2/repositories/{}/", "application/json");
single_name_adapter!(HuggingfaceModelAdapter, Namespace::HuggingfaceModel, "https://huggingface.co/api/models/{}", "application/json");
single_name_adapter!(HuggingfaceSpaceAdapter, Namespace::HuggingfaceSpace, "https://huggingface.co/api/spaces/{}", "application/json");

pub struct GithubOrgAdapter<T: Transport> {
    transport: Arc<T>,
}

impl<T: Transport> GithubOrgAdapter<T> {
    #[must_use]
    pub fn new(transport: Arc<T>) -> Self {
        Self { transport }
    }

    pub async fn check(&self, org: &str, now: &str) -> (Check, Evidence) {
        let query = json!({ "org": org });
        let normalized = coe_hashids::canonical_json(&query).expect("query is always serializable");
        let url = format!("https://api.github.com/orgs/{}", percent_encode(org));
        execute(
            self.transport.as_ref(),
            Namespace::GithubOrg,
            query,
            &normalized,
            url,
            github_headers(),
            now,
            |status| map_registry_status(Namespace::GithubOrg, status),
        )
        .await
    }
}

pub struct GithubRepoAdapter<T: Transport> {
    transport: Arc<T>,
}

impl<T: Transport> GithubRepoAdapter<T> {
    #[must_use]
    pub fn new(transport: Arc<T>) -> Self {
        Self { transport }
    }

    pub async fn check(&self, owner: &str, name: &str, now: &str) -> (Check, Evidence) {
        let query = json!({ "owner": owner, "name": name });
        let normalized = coe_hashids::canonical_json(&query).expect("query is always serializable");
        let url = format!(
            "https://api.github.com/repos/{}/{}",
            percent_encode(owner),
            percent_encode(name)
        );
        execute(
            self.transport.as_ref(),
            Namespace::GithubRepo,
            query,
            &normalized,
            url,
            github_headers(),
            now,
            |status| map_registry_status(Namespace::GithubRepo, status),
        )
        .await
    }
}

pub struct DomainAdapter<T: Transport> {
    transport: Arc<T>,
}

impl<T: Transport> DomainAdapter<T> {
    #[must_use]
    pub fn new(transport: Arc<T>) -> Self {
        Self { transport }
    }

    pub async fn check(&self, candidate_mark: &str, fqdn: &str, now: &str) -> (Check, Evidence) {
        let query = json!({ "candidateMark": candidate_mark, "value": fqdn });
        let normalized = coe_hashids::canonical_json(&query).expect("query is always serializable");
        let url = format!("https://rdap.org/domain/{}", percent_encode(fqdn));
        let init = RequestInit::get().with_header("Accept", "application/rdap+json");
        execute(
            self.transport.as_ref(),
            Namespace::Domain,
            query,
            &normalized,
            url,
            init,
            now,
            map_domain_status,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct FixedTransport {
        response: Mutex<Option<Result<TransportResponse, TransportError>>>,
    }

    #[async_trait]
    impl Transport for FixedTransport {
        async fn call(&self, _url: &str, _init: RequestInit) -> Result<TransportResponse, TransportError> {
            self.response
                .lock()
                .unwrap()
                .take()
                .expect("transport called more than once in this test")
        }
    }

    #[tokio::test]
    async fn npm_404_is_available_and_authoritative() {
        let transport = Arc::new(FixedTransport {
            response: Mutex::new(Some(Ok(TransportResponse {
                status: 404,
                body: String::new(),
            }))),
        });
        let adapter = NpmAdapter::new(transport);
        let (check, evidence) = adapter.check("new-package", "2026-01-01T00:00:00Z").await;
        assert_eq!(check.status, Status::Available);
        assert_eq!(check.authority, Authority::Authoritative);
        assert!(evidence.repro[0].starts_with("curl"));
    }

    #[tokio::test]
    async fn github_org_200_is_taken() {
        let transport = Arc::new(FixedTransport {
            response: Mutex::new(Some(Ok(TransportResponse {
                status: 200,
                body: "{}".into(),
            }))),
        });
        let adapter = GithubOrgAdapter::new(transport);
        let (check, _) = adapter.check("existing-org", "2026-01-01T00:00:00Z").await;
        assert_eq!(check.status, Status::Taken);
        assert_eq!(check.authority, Authority::Authoritative);
    }

    #[tokio::test]
    async fn transport_error_yields_unknown_with_fail_code() {
        let transport = Arc::new(FixedTransport {
            response: Mutex::new(Some(Err(TransportError("ECONNREFUSED".into())))),
        });
        let adapter = NpmAdapter::new(transport);
        let (check, evidence) = adapter.check("whatever", "2026-01-01T00:00:00Z").await;
        assert_eq!(check.status, Status::Unknown);
        assert_eq!(check.authority, Authority::Indicative);
        assert!(check.errors[0].code.starts_with("COE.ADAPTER.") && check.errors[0].code.ends_with("_FAIL"));
        assert!(evidence.sha256.is_none());
        assert!(evidence.notes.is_some());
    }

    #[tokio::test]
    async fn domain_rate_limited_sets_claimability_unknown() {
        let transport = Arc::new(FixedTransport {
            response: Mutex::new(Some(Ok(TransportResponse {
                status: 429,
                body: String::new(),
            }))),
        });
        let adapter = DomainAdapter::new(transport);
        let (check, _) = adapter.check("acme", "example.com", "2026-01-01T00:00:00Z").await;
        assert_eq!(check.status, Status::Unknown);
        assert_eq!(check.claimability, Some(Claimability::Unknown));
        assert_eq!(check.errors[0].code, "COE.ADAPTER.DOMAIN_RATE_LIMITED");
    }

    #[tokio::test]
    async fn check_id_is_deterministic_across_two_runs() {
        let make = || {
            Arc::new(FixedTransport {
                response: Mutex::new(Some(Ok(TransportResponse {
                    status: 404,
                    body: String::new(),
                }))),
            })
        };
        let (c1, e1) = NpmAdapter::new(make()).check("foo", "2026-01-01T00:00:00Z").await;
        let (c2, e2) = NpmAdapter::new(make()).check("foo", "2026-01-02T00:00:00Z").await;
        assert_eq!(c1.id, c2.id);
        assert_eq!(e1.id, e2.id);
        assert_eq!(e1.sha256, e2.sha256);
    }

    #[test]
    fn curl_command_redacts_bearer_token() {
        let headers = vec![(
            "Authorization".to_string(),
            "Bearer ghp_supersecrettoken1234567890".to_string(),
        )];
        let cmd = curl_command("https://api.github.com/orgs/acme", "GET", &headers);
        assert!(!cmd.contains("supersecrettoken"));
        assert!(cmd.contains("[REDACTED]"));
    }
}
