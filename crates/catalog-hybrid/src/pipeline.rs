//! Indexing pipeline: product -> canonical text -> embedding -> upsert.
//!
//! Dictionaries are preloaded once per run. Each product is handled on its
//! own; a failure is logged with the product id and the run moves on. Only
//! fatal errors (a vector of the wrong dimension) abort the run.

use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;

use catalog_core::catalog_text::{build_catalog_text, AttributeLookup};
use catalog_core::error::{Error, Result};
use catalog_core::traits::{AttributeStore, Embedder, ProductStore, VectorIndex};
use catalog_core::types::{IndexEntry, Product};

/// Outcome counts of one indexing run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexingSummary {
    pub candidates: usize,
    pub indexed: usize,
    pub skipped: usize,
    pub failed: usize,
}

enum Outcome {
    Indexed,
    Skipped,
}

pub struct IndexingPipeline {
    embedder: Arc<dyn Embedder>,
    vectors: Arc<dyn VectorIndex>,
    attributes: Arc<dyn AttributeStore>,
    dimension: usize,
    concurrency: usize,
    progress: ProgressBar,
}

impl IndexingPipeline {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        vectors: Arc<dyn VectorIndex>,
        attributes: Arc<dyn AttributeStore>,
        dimension: usize,
    ) -> Self {
        Self { embedder, vectors, attributes, dimension, concurrency: 1, progress: ProgressBar::hidden() }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    /// Products flagged for (re)indexing by the catalog.
    pub async fn index_marked(&self, store: &dyn ProductStore) -> Result<IndexingSummary> {
        let products = store.products_marked_for_indexing().await?;
        self.run(products).await
    }

    /// Every non-deleted product.
    pub async fn index_all(&self, store: &dyn ProductStore) -> Result<IndexingSummary> {
        let products = store.all_products().await?;
        self.run(products).await
    }

    pub async fn run(&self, products: Vec<Product>) -> Result<IndexingSummary> {
        let lookup = AttributeLookup::preload(self.attributes.as_ref()).await?;
        let mut summary = IndexingSummary { candidates: products.len(), ..Default::default() };
        tracing::info!(candidates = summary.candidates, concurrency = self.concurrency, "indexing started");

        self.progress.set_length(products.len() as u64);
        let lookup = &lookup;
        let mut outcomes = stream::iter(products)
            .map(|product| async move {
                let outcome = self.index_one(&product, lookup).await;
                (product.id, outcome)
            })
            .buffer_unordered(self.concurrency);

        while let Some((product_id, outcome)) = outcomes.next().await {
            self.progress.inc(1);
            match outcome {
                Ok(Outcome::Indexed) => summary.indexed += 1,
                Ok(Outcome::Skipped) => {
                    tracing::debug!(product_id, "blank catalog text, skipped");
                    summary.skipped += 1;
                }
                Err(e) if e.is_fatal() => {
                    self.progress.abandon_with_message("aborted");
                    tracing::error!(product_id, error = %e, "indexing aborted");
                    return Err(e);
                }
                Err(e) => {
                    tracing::error!(product_id, error = %e, "failed to index product");
                    summary.failed += 1;
                }
            }
        }
        self.progress.finish_with_message("done");
        tracing::info!(
            indexed = summary.indexed,
            skipped = summary.skipped,
            failed = summary.failed,
            "indexing finished"
        );
        Ok(summary)
    }

    async fn index_one(&self, product: &Product, lookup: &AttributeLookup) -> Result<Outcome> {
        let specifications = self.attributes.product_specifications(product.id).await?;
        let mappings = self.attributes.product_attribute_mappings(product.id).await?;
        let text = build_catalog_text(product, &specifications, &mappings, lookup);
        if text.is_blank() {
            return Ok(Outcome::Skipped);
        }
        let vector = self.embedder.embed(&text.text).await?;
        if vector.len() != self.dimension {
            return Err(Error::Configuration(format!(
                "embedding has dimension {}, vector collection expects {}",
                vector.len(),
                self.dimension
            )));
        }
        let entry = IndexEntry { product_id: product.id, vector, payload: text.into_payload(product) };
        self.vectors.upsert(std::slice::from_ref(&entry)).await?;
        Ok(Outcome::Indexed)
    }
}

/// Bar style used by the CLI.
pub fn progress_bar(len: u64) -> ProgressBar {
    let pb = ProgressBar::new(len);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} products ({percent}%) {msg}")
    {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb
}
