//! `Transport` — the sole seam between an adapter and the outside world.
//! `coe-adapters` never depends on `reqwest`; a concrete implementation
//! lives in `coe-transport-http`.

use async_trait::async_trait;

#[derive(Debug, Clone, Default)]
pub struct RequestInit {
    pub method: String,
    pub headers: Vec<(String, String)>,
}

impl RequestInit {
    #[must_use]
    pub fn get() -> Self {
        Self {
            method: "GET".into(),
            headers: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

#[derive(Debug, Clone)]
pub struct TransportError(pub String);

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for TransportError {}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn call(&self, url: &str, init: RequestInit) -> Result<TransportResponse, TransportError>;
}
