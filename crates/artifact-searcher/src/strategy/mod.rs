use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{Result, SearchError};
use crate::request::{ArtifactRequest, ResolvedArtifact};

pub use cloud::{CloudSearch, CloudSearchOpts, ProviderSearchers, SearcherFactory};
pub use direct::{
    convert_nexus_repo_url_to_index_view, create_full_url, DirectProbe, DEFAULT_PROBE_CONCURRENCY,
};

mod cloud;
mod direct;

/// One way of locating an artifact. A failed resolution carries the reason
/// it failed, which the [`StrategyChain`] logs before moving on.
#[async_trait]
pub trait ResolutionStrategy: Debug + Send + Sync {
    fn name(&self) -> &'static str;

    async fn resolve(&self, request: &ArtifactRequest) -> Result<ResolvedArtifact>;
}

/// Tries strategies in order and returns the first success.
#[derive(Clone, Debug, Default)]
pub struct StrategyChain {
    strategies: Vec<Arc<dyn ResolutionStrategy>>,
}

impl StrategyChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then(mut self, strategy: impl ResolutionStrategy + 'static) -> Self {
        self.strategies.push(Arc::new(strategy));
        self
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    pub async fn resolve(&self, request: &ArtifactRequest) -> Option<ResolvedArtifact> {
        for strategy in &self.strategies {
            match strategy.resolve(request).await {
                Ok(resolved) => {
                    tracing::info!(
                        "Resolved {request} via {}: {}",
                        strategy.name(),
                        resolved.url
                    );
                    return Some(resolved);
                }
                Err(SearchError::NotApplicable(reason)) => {
                    tracing::debug!("Skipping {} for {request}: {reason}", strategy.name());
                }
                Err(e) => {
                    tracing::warn!("{} resolution failed for {request}: {e}", strategy.name());
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use envgene_common::{Application, FileExtension};
    use pretty_assertions::assert_eq;

    use super::*;

    #[derive(Debug)]
    struct Fixed {
        name: &'static str,
        outcome: Option<&'static str>,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl ResolutionStrategy for Fixed {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn resolve(&self, _request: &ArtifactRequest) -> Result<ResolvedArtifact> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.outcome {
                Some(url) => Ok(ResolvedArtifact {
                    url: url.into(),
                    repository: None,
                    local_path: None,
                    strategy: self.name,
                }),
                None => Err(SearchError::NoSearchResults("x".into())),
            }
        }
    }

    #[async_std::test]
    async fn first_success_wins() {
        let calls = Arc::new(AtomicUsize::new(0));
        let chain = StrategyChain::new()
            .then(Fixed {
                name: "failing",
                outcome: None,
                calls: calls.clone(),
            })
            .then(Fixed {
                name: "second",
                outcome: Some("https://b"),
                calls: calls.clone(),
            })
            .then(Fixed {
                name: "third",
                outcome: Some("https://c"),
                calls: calls.clone(),
            });
        let request = ArtifactRequest::new(Application::default(), FileExtension::Json, "1.0.0");
        let resolved = chain.resolve(&request).await.unwrap();
        assert_eq!(resolved.url, "https://b");
        assert_eq!(resolved.strategy, "second");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(chain.names(), vec!["failing", "second", "third"]);
    }

    #[async_std::test]
    async fn exhausted_chain_is_none() {
        let chain = StrategyChain::new().then(Fixed {
            name: "failing",
            outcome: None,
            calls: Arc::new(AtomicUsize::new(0)),
        });
        let request = ArtifactRequest::new(Application::default(), FileExtension::Json, "1.0.0");
        assert_eq!(chain.resolve(&request).await, None);
    }
}
