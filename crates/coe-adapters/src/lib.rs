//! One adapter per namespace in the closed set, each a pure function of
//! `(query, transport, now)` producing a `(Check, Evidence)` pair.

mod adapters;
mod model;
mod transport;

pub use adapters::{
    CratesAdapter, DockerhubAdapter, DomainAdapter, GithubOrgAdapter, GithubRepoAdapter,
    HuggingfaceModelAdapter, HuggingfaceSpaceAdapter, NpmAdapter, PypiAdapter,
};
pub use model::{Authority, Check, Claimability, ErrorEntry, Evidence, EvidenceSource, Namespace, Status};
pub use transport::{RequestInit, Transport, TransportError, TransportResponse};
