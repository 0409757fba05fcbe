#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use catalog_core::config::RankingSettings;
use catalog_core::error::{Error, Result};
use catalog_core::memory::{CatalogSnapshot, MemoryCatalog};
use catalog_core::traits::{AttributeStore, Embedder, LexicalSearch, VectorIndex};
use catalog_core::types::{
    EmbeddingVector, IndexEntry, PredefinedProductAttributeValue, Product, ProductAttribute, ProductAttributeMapping,
    ProductId, ProductSpecificationAttribute, SemanticCandidate, SpecificationAttribute, SpecificationAttributeOption,
};
use catalog_hybrid::HybridSearchEngine;

pub const DIM: usize = 3;

pub enum EmbedBehavior {
    Vector(Vec<f32>),
    Fail,
    Hang,
}

pub struct FakeEmbedder {
    pub behavior: EmbedBehavior,
    pub calls: Mutex<Vec<String>>,
}

impl FakeEmbedder {
    pub fn returning(v: Vec<f32>) -> Self { Self { behavior: EmbedBehavior::Vector(v), calls: Mutex::new(Vec::new()) } }
    pub fn failing() -> Self { Self { behavior: EmbedBehavior::Fail, calls: Mutex::new(Vec::new()) } }
    pub fn hanging() -> Self { Self { behavior: EmbedBehavior::Hang, calls: Mutex::new(Vec::new()) } }
}

#[async_trait]
impl Embedder for FakeEmbedder {
    fn dimension(&self) -> usize { DIM }

    async fn embed(&self, text: &str) -> Result<EmbeddingVector> {
        self.calls.lock().unwrap().push(text.to_string());
        match &self.behavior {
            EmbedBehavior::Vector(v) => Ok(v.clone()),
            EmbedBehavior::Fail => Err(Error::ProviderUnavailable("request timed out".into())),
            EmbedBehavior::Hang => {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(vec![0.0; DIM])
            }
        }
    }
}

/// Returns canned candidates on search, records upserts by id.
#[derive(Default)]
pub struct FakeVectorIndex {
    pub candidates: Vec<SemanticCandidate>,
    pub fail_search: bool,
    pub fail_upsert_for: Vec<ProductId>,
    pub stored: Mutex<BTreeMap<ProductId, IndexEntry>>,
    pub upserts: Mutex<usize>,
}

impl FakeVectorIndex {
    pub fn with_candidates(pairs: &[(ProductId, f32)]) -> Self {
        Self {
            candidates: pairs.iter().map(|&(product_id, distance)| SemanticCandidate { product_id, distance }).collect(),
            ..Default::default()
        }
    }

    pub fn snapshot(&self) -> BTreeMap<ProductId, IndexEntry> { self.stored.lock().unwrap().clone() }
}

#[async_trait]
impl VectorIndex for FakeVectorIndex {
    async fn ensure_collection(&self) -> Result<()> { Ok(()) }

    async fn upsert(&self, entries: &[IndexEntry]) -> Result<()> {
        if entries.iter().any(|e| self.fail_upsert_for.contains(&e.product_id)) {
            return Err(Error::IndexUnavailable("connection reset".into()));
        }
        *self.upserts.lock().unwrap() += 1;
        let mut stored = self.stored.lock().unwrap();
        for e in entries {
            stored.insert(e.product_id, e.clone());
        }
        Ok(())
    }

    async fn search(&self, _vector: &[f32], limit: usize) -> Result<Vec<SemanticCandidate>> {
        if self.fail_search {
            return Err(Error::IndexUnavailable("connection refused".into()));
        }
        Ok(self.candidates.iter().take(limit).copied().collect())
    }
}

pub struct FakeLexical {
    pub ids: Vec<ProductId>,
    pub fail: bool,
}

impl FakeLexical {
    pub fn returning(ids: &[ProductId]) -> Self { Self { ids: ids.to_vec(), fail: false } }
}

#[async_trait]
impl LexicalSearch for FakeLexical {
    async fn search_text(&self, _query: &str, limit: usize) -> Result<Vec<ProductId>> {
        if self.fail {
            return Err(Error::LexicalStore("index corrupted".into()));
        }
        Ok(self.ids.iter().take(limit).copied().collect())
    }
}

/// Wraps a memory catalog; specification lookups for the listed products fail.
pub struct FlakyAttributes {
    pub inner: MemoryCatalog,
    pub failing_products: Vec<ProductId>,
    pub fail_preload: bool,
    pub preloads: Mutex<usize>,
}

#[async_trait]
impl AttributeStore for FlakyAttributes {
    async fn specification_attributes(&self) -> Result<Vec<SpecificationAttribute>> {
        *self.preloads.lock().unwrap() += 1;
        if self.fail_preload {
            return Err(Error::Catalog("database offline".into()));
        }
        self.inner.specification_attributes().await
    }
    async fn specification_options(&self, attribute_id: u32) -> Result<Vec<SpecificationAttributeOption>> {
        self.inner.specification_options(attribute_id).await
    }
    async fn product_specifications(&self, product_id: ProductId) -> Result<Vec<ProductSpecificationAttribute>> {
        if self.failing_products.contains(&product_id) {
            return Err(Error::Catalog(format!("specification lookup failed for {product_id}")));
        }
        self.inner.product_specifications(product_id).await
    }
    async fn product_attributes(&self) -> Result<Vec<ProductAttribute>> { self.inner.product_attributes().await }
    async fn predefined_values(&self, attribute_id: u32) -> Result<Vec<PredefinedProductAttributeValue>> {
        self.inner.predefined_values(attribute_id).await
    }
    async fn product_attribute_mappings(&self, product_id: ProductId) -> Result<Vec<ProductAttributeMapping>> {
        self.inner.product_attribute_mappings(product_id).await
    }
}

pub fn product(id: ProductId, name: &str) -> Product {
    Product { id, name: name.to_string(), short_description: format!("{name} short"), price: id as f64, ..Default::default() }
}

pub fn catalog(products: Vec<Product>) -> Arc<MemoryCatalog> {
    Arc::new(MemoryCatalog::new(CatalogSnapshot { products, ..Default::default() }))
}

pub fn engine(
    embedder: FakeEmbedder,
    vectors: FakeVectorIndex,
    lexical: FakeLexical,
    products: Arc<MemoryCatalog>,
    ranking: RankingSettings,
) -> HybridSearchEngine {
    HybridSearchEngine::new(Arc::new(embedder), Arc::new(vectors), Arc::new(lexical), products, ranking, DIM)
}

pub fn scores(result: &catalog_core::types::RankedResult) -> HashMap<ProductId, f64> {
    result.hits.iter().map(|h| (h.product_id(), h.score)).collect()
}
