//! Hover and definition lookups
//!
//! [`LookupService`] is the external code-intelligence backend. The
//! [`LookupGateway`] wraps it and normalizes its outcomes: "unsupported" is
//! treated as no result and never reported as a failure, anything else that
//! goes wrong becomes an inert [`LookupResult::Error`].

use crate::position::SemanticPosition;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;

/// Descriptive hover text for a symbol
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HoverContent {
    /// Paragraphs or code blocks, rendered in order
    pub contents: Vec<String>,
    /// Char range of the symbol on its line, when the service knows it
    pub range: Option<(usize, usize)>,
}

impl HoverContent {
    pub fn is_empty(&self) -> bool {
        self.contents.iter().all(|c| c.trim().is_empty())
    }
}

/// Errors reported by a lookup backend
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error("lookup not supported for this position")]
    Unsupported,
    #[error("no information for this position")]
    NotFound,
    #[error("lookup service unavailable: {0}")]
    Unavailable(String),
    #[error("lookup failed: {0}")]
    Failed(String),
}

/// Normalized lookup error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupErrorKind {
    /// The service has nothing for this position
    NoInfo,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupResult {
    Empty,
    /// Hover content plus the definition target, when already known
    Found(HoverContent, Option<String>),
    Error(LookupErrorKind),
}

/// Outcome of a definition lookup
pub type DefinitionOutcome = Result<Option<String>, LookupErrorKind>;

/// Code-intelligence backend answering point queries.
///
/// Both queries must be side-effect free, since they can be issued
/// redundantly for the same position.
pub trait LookupService: Send + Sync + 'static {
    fn fetch_hover(
        &self,
        position: &SemanticPosition,
    ) -> impl Future<Output = Result<Option<HoverContent>, ServiceError>> + Send;

    /// URL or location of the symbol's definition
    fn fetch_definition(
        &self,
        position: &SemanticPosition,
    ) -> impl Future<Output = Result<Option<String>, ServiceError>> + Send;
}

/// Issues one hover and one definition query per position; no caching, no retries
pub struct LookupGateway<S> {
    service: Arc<S>,
}

impl<S> Clone for LookupGateway<S> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
        }
    }
}

impl<S: LookupService> LookupGateway<S> {
    pub fn new(service: Arc<S>) -> Self {
        Self { service }
    }

    pub async fn fetch_hover(&self, position: &SemanticPosition) -> LookupResult {
        match self.service.fetch_hover(position).await {
            Ok(Some(content)) if !content.is_empty() => LookupResult::Found(content, None),
            Ok(_) | Err(ServiceError::Unsupported) => LookupResult::Empty,
            Err(err) => LookupResult::Error(normalize_failure("hover", position, err)),
        }
    }

    pub async fn fetch_definition_target(&self, position: &SemanticPosition) -> DefinitionOutcome {
        match self.service.fetch_definition(position).await {
            Ok(target) => Ok(target.filter(|t| !t.is_empty())),
            Err(ServiceError::Unsupported) => Ok(None),
            Err(err) => Err(normalize_failure("definition", position, err)),
        }
    }
}

fn normalize_failure(
    query: &'static str,
    position: &SemanticPosition,
    err: ServiceError,
) -> LookupErrorKind {
    match err {
        ServiceError::Unsupported | ServiceError::NotFound => {
            tracing::debug!(query, %position, "no lookup information");
            LookupErrorKind::NoInfo
        }
        other => {
            tracing::warn!(query, %position, error = %other, "lookup failed");
            LookupErrorKind::Failed(other.to_string())
        }
    }
}
