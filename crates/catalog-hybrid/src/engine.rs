//! Hybrid merge and ranking.
//!
//! One query embedding, one nearest-neighbour lookup and one substring
//! lookup, run concurrently and fused into a single capped ranking:
//!
//! - semantic hit: `(1 - distance) * semantic_weight`
//! - lexical hit: `+ keyword_bonus` on an existing entry, or a new entry
//!   scored `keyword_bonus`
//!
//! Candidates whose product is missing, deleted, unpublished or outside the
//! query's store are dropped before fusion.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use catalog_core::config::RankingSettings;
use catalog_core::error::{Error, Result};
use catalog_core::traits::{Embedder, LexicalSearch, ProductStore, VectorIndex};
use catalog_core::types::{
    Product, ProductId, ProductSummary, Provenance, RankedResult, ScoredCandidate, SearchQuery,
};

pub struct HybridSearchEngine {
    embedder: Arc<dyn Embedder>,
    vectors: Arc<dyn VectorIndex>,
    lexical: Arc<dyn LexicalSearch>,
    products: Arc<dyn ProductStore>,
    ranking: RankingSettings,
    dimension: usize,
}

impl HybridSearchEngine {
    /// `dimension` is the vector collection's dimension; a query embedding of
    /// any other length is a configuration error.
    pub fn new(
        embedder: Arc<dyn Embedder>,
        vectors: Arc<dyn VectorIndex>,
        lexical: Arc<dyn LexicalSearch>,
        products: Arc<dyn ProductStore>,
        ranking: RankingSettings,
        dimension: usize,
    ) -> Self {
        Self { embedder, vectors, lexical, products, ranking, dimension }
    }

    pub fn ranking(&self) -> &RankingSettings { &self.ranking }

    /// User-facing search. Every failure except a fatal one is logged and
    /// turned into an empty result; `ranking.deadline_ms` bounds the call.
    pub async fn search(&self, query: &SearchQuery) -> Result<RankedResult> {
        match self.ranking.deadline_ms {
            Some(ms) => self.search_with_deadline(query, Instant::now() + Duration::from_millis(ms)).await,
            None => degrade(query, self.try_search(query).await),
        }
    }

    /// Like [`search`](Self::search) with an explicit deadline. Elapse drops
    /// the outstanding lookups and yields the empty result.
    pub async fn search_with_deadline(&self, query: &SearchQuery, deadline: Instant) -> Result<RankedResult> {
        match tokio::time::timeout_at(deadline, self.try_search(query)).await {
            Ok(outcome) => degrade(query, outcome),
            Err(_) => {
                tracing::warn!(query = %query.text(), "hybrid search deadline elapsed");
                Ok(RankedResult::empty())
            }
        }
    }

    /// The ranking pipeline without failure degradation.
    pub async fn try_search(&self, query: &SearchQuery) -> Result<RankedResult> {
        if query.is_blank() {
            return Ok(RankedResult::empty());
        }
        let vector = self.embedder.embed(query.text()).await?;
        if vector.len() != self.dimension {
            return Err(Error::Configuration(format!(
                "embedding has dimension {}, vector collection expects {}",
                vector.len(),
                self.dimension
            )));
        }

        let (semantic, lexical) = futures::join!(self.semantic(&vector, query), self.lexical(query));
        let (semantic, lexical) = (semantic?, lexical?);
        tracing::debug!(semantic = semantic.len(), lexical = lexical.len(), "retrieved candidates");

        let hits = self.fuse(semantic, lexical);
        tracing::info!(query = %query.text(), hits = hits.len(), "hybrid search");
        Ok(RankedResult { hits })
    }

    async fn semantic(&self, vector: &[f32], query: &SearchQuery) -> Result<Vec<(Product, f64)>> {
        let candidates = self.vectors.search(vector, self.ranking.semantic_limit).await?;
        let mut seen = HashSet::new();
        let mut out = Vec::with_capacity(candidates.len());
        for c in candidates {
            if !seen.insert(c.product_id) {
                continue;
            }
            if let Some(product) = self.visible(c.product_id, query).await? {
                out.push((product, c.similarity()));
            }
        }
        Ok(out)
    }

    async fn lexical(&self, query: &SearchQuery) -> Result<Vec<Product>> {
        let ids = self.lexical.search_text(query.text(), self.ranking.lexical_limit).await?;
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(product) = self.visible(id, query).await? {
                out.push(product);
            }
        }
        Ok(out)
    }

    async fn visible(&self, id: ProductId, query: &SearchQuery) -> Result<Option<Product>> {
        let product = self.products.product_by_id(id).await?;
        match product {
            Some(p) if p.is_searchable(query.store_id()) => Ok(Some(p)),
            Some(_) => {
                tracing::debug!(product_id = id, "dropping hidden candidate");
                Ok(None)
            }
            None => {
                tracing::debug!(product_id = id, "dropping stale candidate");
                Ok(None)
            }
        }
    }

    fn fuse(&self, semantic: Vec<(Product, f64)>, lexical: Vec<Product>) -> Vec<ScoredCandidate> {
        let mut hits: Vec<ScoredCandidate> = Vec::with_capacity(semantic.len() + lexical.len());
        let mut position: HashMap<ProductId, usize> = HashMap::new();
        for (product, similarity) in semantic {
            position.insert(product.id, hits.len());
            hits.push(ScoredCandidate {
                product: ProductSummary::from(&product),
                score: similarity * self.ranking.semantic_weight,
                provenance: Provenance::Semantic,
            });
        }
        let mut bonused = HashSet::new();
        for product in lexical {
            if !bonused.insert(product.id) {
                continue;
            }
            match position.get(&product.id) {
                Some(&i) => {
                    hits[i].score += self.ranking.keyword_bonus;
                    hits[i].provenance = Provenance::Both;
                }
                None => {
                    position.insert(product.id, hits.len());
                    hits.push(ScoredCandidate {
                        product: ProductSummary::from(&product),
                        score: self.ranking.keyword_bonus,
                        provenance: Provenance::Lexical,
                    });
                }
            }
        }
        // stable: equal scores keep discovery order
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(self.ranking.top_n);
        hits
    }
}

fn degrade(query: &SearchQuery, outcome: Result<RankedResult>) -> Result<RankedResult> {
    match outcome {
        Ok(result) => Ok(result),
        Err(e) if e.is_fatal() => Err(e),
        Err(e) => {
            tracing::error!(query = %query.text(), error = %e, "hybrid search failed");
            Ok(RankedResult::empty())
        }
    }
}
