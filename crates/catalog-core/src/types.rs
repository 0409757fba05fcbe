//! Domain types shared by the catalog store, the indexing pipeline and the
//! ranking engine.

use serde::{Deserialize, Serialize};

pub type ProductId = u64;
pub type EmbeddingVector = Vec<f32>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductType {
    #[default]
    Simple,
    Grouped,
}

/// A catalog entity as the primary store holds it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub short_description: String,
    pub full_description: String,
    pub price: f64,
    pub published: bool,
    pub deleted: bool,
    pub visible_individually: bool,
    pub vendor_id: u32,
    pub product_type: ProductType,
    pub display_order: i32,
    /// Flagged for (re)indexing by the catalog.
    pub mark_as_new: bool,
    /// Empty means "available in every store".
    pub limited_to_stores: Vec<u32>,
    pub category_ids: Vec<u32>,
    pub manufacturer_ids: Vec<u32>,
    pub tag_ids: Vec<u32>,
}

impl Default for Product {
    fn default() -> Self {
        Self {
            id: 0,
            name: String::new(),
            short_description: String::new(),
            full_description: String::new(),
            price: 0.0,
            published: true,
            deleted: false,
            visible_individually: true,
            vendor_id: 0,
            product_type: ProductType::Simple,
            display_order: 0,
            mark_as_new: false,
            limited_to_stores: Vec::new(),
            category_ids: Vec::new(),
            manufacturer_ids: Vec::new(),
            tag_ids: Vec::new(),
        }
    }
}

impl Product {
    pub fn available_in_store(&self, store_id: Option<u32>) -> bool {
        match store_id {
            None | Some(0) => true,
            Some(store) => self.limited_to_stores.is_empty() || self.limited_to_stores.contains(&store),
        }
    }

    /// Whether a shopper-facing search may surface this product.
    pub fn is_searchable(&self, store_id: Option<u32>) -> bool {
        !self.deleted && self.published && self.available_in_store(store_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpecificationAttribute {
    pub id: u32,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpecificationAttributeOption {
    pub id: u32,
    pub specification_attribute_id: u32,
    pub name: String,
}

/// Assignment of a specification option to a product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductSpecificationAttribute {
    pub product_id: ProductId,
    pub option_id: u32,
    #[serde(default)]
    pub custom_value: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductAttribute {
    pub id: u32,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredefinedProductAttributeValue {
    pub id: u32,
    pub product_attribute_id: u32,
    pub name: String,
}

/// A value selected on a product attribute mapping. `id` refers to a
/// predefined value when one exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributeValueSelection {
    #[serde(default)]
    pub id: u32,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductAttributeMapping {
    pub id: u32,
    pub product_id: ProductId,
    pub product_attribute_id: u32,
    #[serde(default)]
    pub values: Vec<AttributeValueSelection>,
}

/// Display projection returned alongside ranked ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductSummary {
    pub id: ProductId,
    pub name: String,
    pub short_description: String,
    pub full_description: String,
    pub price: f64,
}

impl From<&Product> for ProductSummary {
    fn from(p: &Product) -> Self {
        Self {
            id: p.id,
            name: p.name.clone(),
            short_description: p.short_description.clone(),
            full_description: p.full_description.clone(),
            price: p.price,
        }
    }
}

/// Free-text query plus optional store scope. Trimmed on construction and
/// never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    text: String,
    store_id: Option<u32>,
}

impl SearchQuery {
    pub fn new(text: impl AsRef<str>) -> Self {
        Self { text: text.as_ref().trim().to_string(), store_id: None }
    }

    pub fn with_store(mut self, store_id: Option<u32>) -> Self {
        self.store_id = store_id.filter(|s| *s > 0);
        self
    }

    pub fn text(&self) -> &str { &self.text }
    pub fn store_id(&self) -> Option<u32> { self.store_id }
    pub fn is_blank(&self) -> bool { self.text.is_empty() }
}

/// Nearest-neighbour hit from the vector index. Lower distance is closer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SemanticCandidate {
    pub product_id: ProductId,
    pub distance: f32,
}

impl SemanticCandidate {
    pub fn similarity(&self) -> f64 { 1.0 - f64::from(self.distance) }
}

/// Which retrieval method(s) surfaced a candidate.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    Semantic,
    Lexical,
    Both,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredCandidate {
    pub product: ProductSummary,
    pub score: f64,
    pub provenance: Provenance,
}

impl ScoredCandidate {
    pub fn product_id(&self) -> ProductId { self.product.id }
}

/// Ordered output of the hybrid engine, best first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RankedResult {
    pub hits: Vec<ScoredCandidate>,
}

impl RankedResult {
    pub fn empty() -> Self { Self::default() }
    pub fn len(&self) -> usize { self.hits.len() }
    pub fn is_empty(&self) -> bool { self.hits.is_empty() }
    pub fn ids(&self) -> Vec<ProductId> { self.hits.iter().map(ScoredCandidate::product_id).collect() }
}

/// Persisted unit in the vector index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub product_id: ProductId,
    pub vector: EmbeddingVector,
    pub payload: IndexPayload,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexPayload {
    pub name: String,
    pub description: String,
    pub specifications: Vec<String>,
    pub attributes: Vec<String>,
    /// The exact text that was embedded.
    pub text: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    #[default]
    Cosine,
    L2,
    Dot,
}

/// Name, dimension and metric of a vector collection. Fixed at creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionSpec {
    pub name: String,
    pub dimension: usize,
    pub distance: DistanceMetric,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductSort {
    #[default]
    Position,
    NameAsc,
    NameDesc,
    PriceAsc,
    PriceDesc,
}

/// Structural filters of the relational product query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductFilter {
    pub keywords: Option<String>,
    pub search_descriptions: bool,
    pub category_ids: Vec<u32>,
    pub manufacturer_ids: Vec<u32>,
    pub store_id: Option<u32>,
    pub vendor_id: Option<u32>,
    pub product_type: Option<ProductType>,
    pub visible_individually_only: bool,
    pub price_min: Option<f64>,
    pub price_max: Option<f64>,
    pub tag_id: Option<u32>,
    pub specification_option_ids: Vec<u32>,
    /// Include unpublished products.
    pub show_hidden: bool,
    pub override_published: Option<bool>,
    pub sort: ProductSort,
}

impl ProductFilter {
    /// Non-blank keywords, trimmed.
    pub fn keywords(&self) -> Option<&str> {
        self.keywords.as_deref().map(str::trim).filter(|k| !k.is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page_index: usize,
    pub page_size: usize,
}

impl Default for PageRequest {
    fn default() -> Self { Self { page_index: 0, page_size: usize::MAX } }
}

impl PageRequest {
    pub fn new(page_index: usize, page_size: usize) -> Self { Self { page_index, page_size } }

    pub fn skip(&self) -> usize { self.page_index.saturating_mul(self.page_size) }

    /// Slice one page out of an already ordered sequence.
    pub fn apply<T>(&self, items: Vec<T>) -> Page<T> {
        let total_count = items.len();
        let items = items.into_iter().skip(self.skip()).take(self.page_size).collect();
        Page { items, page_index: self.page_index, page_size: self.page_size, total_count }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page_index: usize,
    pub page_size: usize,
    pub total_count: usize,
}

impl<T> Page<T> {
    pub fn empty(page: PageRequest) -> Self {
        Self { items: Vec::new(), page_index: page.page_index, page_size: page.page_size, total_count: 0 }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page_index: self.page_index,
            page_size: self.page_size,
            total_count: self.total_count,
        }
    }
}
