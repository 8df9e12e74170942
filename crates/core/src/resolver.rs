use crate::models::{
    CatalogueItem, KeywordOverride, RankedItem, Recommendation, ResolutionPath, ResolverConfig,
};
use crate::normalize::normalize;
use crate::snapshot::CatalogueSnapshot;
use crate::traits::EmbeddingProvider;
use crate::RetrievalError;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, info};

pub const DEFAULT_TOP_K: usize = 5;

pub struct HybridResolver {
    provider: Arc<dyn EmbeddingProvider>,
    config: ResolverConfig,
    embed_gate: Option<Semaphore>,
    snapshot: RwLock<Option<Arc<CatalogueSnapshot>>>,
}

impl HybridResolver {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, config: ResolverConfig) -> Self {
        let embed_gate = config
            .max_concurrent_embeddings
            .or_else(|| provider.max_concurrency())
            .map(|permits| Semaphore::new(permits.max(1)));

        Self {
            provider,
            config,
            embed_gate,
            snapshot: RwLock::new(None),
        }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub async fn rebuild(
        &self,
        items: Vec<CatalogueItem>,
    ) -> Result<Arc<CatalogueSnapshot>, RetrievalError> {
        let snapshot = {
            let _permit = self.acquire_embed_permit().await?;
            Arc::new(CatalogueSnapshot::build(items, self.provider.as_ref()).await?)
        };

        let previous = self
            .snapshot
            .write()
            .map_err(|error| RetrievalError::Internal(format!("lock poisoned: {error}")))?
            .replace(Arc::clone(&snapshot));

        info!(
            snapshot_id = %snapshot.id(),
            replaced = ?previous.map(|old| old.id()),
            "catalogue snapshot swapped in"
        );

        Ok(snapshot)
    }

    pub fn snapshot(&self) -> Result<Arc<CatalogueSnapshot>, RetrievalError> {
        self.snapshot
            .read()
            .map_err(|error| RetrievalError::Internal(format!("lock poisoned: {error}")))?
            .clone()
            .ok_or(RetrievalError::NotReady)
    }

    pub fn is_ready(&self) -> bool {
        self.snapshot().is_ok()
    }

    pub async fn recommend(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<CatalogueItem>, RetrievalError> {
        Ok(self.recommend_detailed(query, top_k).await?.into_items())
    }

    pub async fn recommend_detailed(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<Recommendation, RetrievalError> {
        self.recommend_with_timeout(query, top_k, self.config.embedding_timeout)
            .await
    }

    /// `timeout` bounds the embedding call, including time queued for a permit.
    pub async fn recommend_with_timeout(
        &self,
        query: &str,
        top_k: usize,
        timeout: Option<Duration>,
    ) -> Result<Recommendation, RetrievalError> {
        let snapshot = self.snapshot()?;

        if query.trim().is_empty() {
            return Err(RetrievalError::EmptyQuery);
        }

        let normalized_query = normalize(query);
        if let Some((rule, positions)) = self.keyword_override(&normalized_query, &snapshot) {
            debug!(
                keyword = %rule.keyword,
                matched = positions.len(),
                "keyword override served query"
            );

            let hits = positions
                .into_iter()
                .take(top_k)
                .map(|position| RankedItem {
                    position,
                    score: None,
                    item: snapshot.items()[position].clone(),
                })
                .collect();

            return Ok(Recommendation {
                query: query.to_string(),
                resolution: ResolutionPath::KeywordOverride {
                    keyword: rule.keyword.clone(),
                },
                hits,
            });
        }

        let hits = if top_k == 0 || snapshot.is_empty() {
            Vec::new()
        } else {
            self.vector_hits(query, top_k, timeout, &snapshot).await?
        };

        debug!(hits = hits.len(), "vector search served query");

        Ok(Recommendation {
            query: query.to_string(),
            resolution: ResolutionPath::Vector,
            hits,
        })
    }

    fn keyword_override<'a>(
        &'a self,
        normalized_query: &str,
        snapshot: &CatalogueSnapshot,
    ) -> Option<(&'a KeywordOverride, Vec<usize>)> {
        self.config
            .overrides
            .iter()
            .filter(|rule| rule.is_triggered(normalized_query))
            .find_map(|rule| {
                let positions = snapshot
                    .items()
                    .iter()
                    .enumerate()
                    .filter(|(_, item)| rule.matches(item))
                    .map(|(position, _)| position)
                    .collect::<Vec<_>>();

                (!positions.is_empty()).then_some((rule, positions))
            })
    }

    async fn vector_hits(
        &self,
        query: &str,
        top_k: usize,
        timeout: Option<Duration>,
        snapshot: &CatalogueSnapshot,
    ) -> Result<Vec<RankedItem>, RetrievalError> {
        let embed = async {
            let _permit = self.acquire_embed_permit().await?;
            self.provider
                .embed_one(query)
                .await
                .map_err(RetrievalError::from)
        };

        let query_vector = match timeout {
            Some(limit) => tokio::time::timeout(limit, embed)
                .await
                .map_err(|_| RetrievalError::Timeout(limit))??,
            None => embed.await?,
        };

        snapshot
            .index()
            .search(&query_vector, top_k)?
            .into_iter()
            .map(|neighbor| {
                let item = snapshot.item(neighbor.position).ok_or_else(|| {
                    RetrievalError::Internal(format!(
                        "index position {} outside catalogue of {}",
                        neighbor.position,
                        snapshot.len()
                    ))
                })?;

                Ok(RankedItem {
                    position: neighbor.position,
                    score: Some(neighbor.score),
                    item: item.clone(),
                })
            })
            .collect()
    }

    async fn acquire_embed_permit(
        &self,
    ) -> Result<Option<tokio::sync::SemaphorePermit<'_>>, RetrievalError> {
        match &self.embed_gate {
            Some(gate) => gate
                .acquire()
                .await
                .map(Some)
                .map_err(|error| RetrievalError::Internal(error.to_string())),
            None => Ok(None),
        }
    }
}
