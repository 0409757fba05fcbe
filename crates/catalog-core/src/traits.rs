use async_trait::async_trait;

use crate::error::Result;
use crate::types::{
    EmbeddingVector, IndexEntry, PageRequest, Page, PredefinedProductAttributeValue, Product, ProductAttribute,
    ProductAttributeMapping, ProductFilter, ProductId, ProductSpecificationAttribute, SemanticCandidate,
    SpecificationAttribute, SpecificationAttributeOption,
};

/// Text to fixed-length dense vector. One outbound call per invocation, no
/// retries and no caching.
#[async_trait]
pub trait Embedder: Send + Sync {
    fn dimension(&self) -> usize;
    async fn embed(&self, text: &str) -> Result<EmbeddingVector>;
}

/// Dense vector store bound to a single collection.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Create the collection if missing; fail with `SchemaError` when an
    /// existing collection has a different dimension.
    async fn ensure_collection(&self) -> Result<()>;
    /// Last write wins per product id.
    async fn upsert(&self, entries: &[IndexEntry]) -> Result<()>;
    /// At most `limit` hits ordered by ascending distance; empty collection
    /// yields an empty vec.
    async fn search(&self, vector: &[f32], limit: usize) -> Result<Vec<SemanticCandidate>>;
}

/// Case-insensitive substring lookup over product name and short description.
#[async_trait]
pub trait LexicalSearch: Send + Sync {
    async fn search_text(&self, query: &str, limit: usize) -> Result<Vec<ProductId>>;
}

#[async_trait]
pub trait ProductStore: Send + Sync {
    async fn product_by_id(&self, id: ProductId) -> Result<Option<Product>>;
    /// The native relational filter/pagination query.
    async fn search_products(&self, filter: &ProductFilter, page: PageRequest) -> Result<Page<Product>>;
    /// Apply every structural predicate of `filter` (keywords excluded) to
    /// the given candidates. Order of the returned rows is unspecified.
    async fn filter_products(&self, filter: &ProductFilter, candidate_ids: &[ProductId]) -> Result<Vec<Product>>;
    async fn products_marked_for_indexing(&self) -> Result<Vec<Product>>;
    /// Every non-deleted product.
    async fn all_products(&self) -> Result<Vec<Product>>;
}

#[async_trait]
pub trait AttributeStore: Send + Sync {
    async fn specification_attributes(&self) -> Result<Vec<SpecificationAttribute>>;
    async fn specification_options(&self, attribute_id: u32) -> Result<Vec<SpecificationAttributeOption>>;
    async fn product_specifications(&self, product_id: ProductId) -> Result<Vec<ProductSpecificationAttribute>>;
    async fn product_attributes(&self) -> Result<Vec<ProductAttribute>>;
    async fn predefined_values(&self, attribute_id: u32) -> Result<Vec<PredefinedProductAttributeValue>>;
    async fn product_attribute_mappings(&self, product_id: ProductId) -> Result<Vec<ProductAttributeMapping>>;
}
