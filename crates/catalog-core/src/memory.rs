//! In-memory catalog store loaded from JSON snapshots.
//!
//! Stands in for the relational catalog database: id lookups, the native
//! filter/sort/paginate product query and the attribute dictionaries.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::traits::{AttributeStore, ProductStore};
use crate::types::{
    Page, PageRequest, PredefinedProductAttributeValue, Product, ProductAttribute, ProductAttributeMapping,
    ProductFilter, ProductId, ProductSort, ProductSpecificationAttribute, SpecificationAttribute,
    SpecificationAttributeOption,
};

/// Serialized form of a catalog (or a slice of one).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogSnapshot {
    pub products: Vec<Product>,
    pub specification_attributes: Vec<SpecificationAttribute>,
    pub specification_options: Vec<SpecificationAttributeOption>,
    pub product_specifications: Vec<ProductSpecificationAttribute>,
    pub product_attributes: Vec<ProductAttribute>,
    pub predefined_values: Vec<PredefinedProductAttributeValue>,
    pub attribute_mappings: Vec<ProductAttributeMapping>,
}

impl CatalogSnapshot {
    pub fn merge(&mut self, other: CatalogSnapshot) {
        self.products.extend(other.products);
        self.specification_attributes.extend(other.specification_attributes);
        self.specification_options.extend(other.specification_options);
        self.product_specifications.extend(other.product_specifications);
        self.product_attributes.extend(other.product_attributes);
        self.predefined_values.extend(other.predefined_values);
        self.attribute_mappings.extend(other.attribute_mappings);
    }
}

#[derive(Debug, Default)]
pub struct MemoryCatalog {
    products: Vec<Product>,
    by_id: HashMap<ProductId, usize>,
    snapshot: CatalogSnapshot,
    specs_by_product: HashMap<ProductId, Vec<ProductSpecificationAttribute>>,
    mappings_by_product: HashMap<ProductId, Vec<ProductAttributeMapping>>,
}

impl MemoryCatalog {
    pub fn new(mut snapshot: CatalogSnapshot) -> Self {
        let products = std::mem::take(&mut snapshot.products);
        // later snapshots override earlier ones for the same id
        let mut by_id = HashMap::new();
        let mut deduped: Vec<Product> = Vec::with_capacity(products.len());
        for p in products {
            match by_id.get(&p.id) {
                Some(&i) => deduped[i] = p,
                None => { by_id.insert(p.id, deduped.len()); deduped.push(p); }
            }
        }
        let mut specs_by_product: HashMap<ProductId, Vec<ProductSpecificationAttribute>> = HashMap::new();
        for s in &snapshot.product_specifications { specs_by_product.entry(s.product_id).or_default().push(s.clone()); }
        let mut mappings_by_product: HashMap<ProductId, Vec<ProductAttributeMapping>> = HashMap::new();
        for m in &snapshot.attribute_mappings { mappings_by_product.entry(m.product_id).or_default().push(m.clone()); }
        Self { products: deduped, by_id, snapshot, specs_by_product, mappings_by_product }
    }

    /// Load and merge every `*.json` snapshot under `dir`, in path order.
    pub fn load_dir(dir: &Path) -> Result<Self> {
        let files = list_json_files(dir);
        if files.is_empty() {
            tracing::warn!(dir = %dir.display(), "no catalog snapshots found");
        }
        let mut snapshot = CatalogSnapshot::default();
        for path in &files {
            let raw = std::fs::read_to_string(path).map_err(|e| Error::Catalog(format!("read {}: {}", path.display(), e)))?;
            let part: CatalogSnapshot = serde_json::from_str(&raw).map_err(|e| Error::Catalog(format!("parse {}: {}", path.display(), e)))?;
            snapshot.merge(part);
        }
        let catalog = Self::new(snapshot);
        tracing::info!(files = files.len(), products = catalog.products.len(), "catalog loaded");
        Ok(catalog)
    }

    pub fn products(&self) -> &[Product] { &self.products }

    fn has_spec_option(&self, product_id: ProductId, option_id: u32) -> bool {
        self.specs_by_product.get(&product_id).is_some_and(|specs| specs.iter().any(|s| s.option_id == option_id))
    }

    /// Every structural predicate except keywords.
    fn matches(&self, p: &Product, f: &ProductFilter) -> bool {
        if p.deleted { return false; }
        if !f.show_hidden && !p.published { return false; }
        if let Some(published) = f.override_published { if p.published != published { return false; } }
        if !p.available_in_store(f.store_id) { return false; }
        if f.visible_individually_only && !p.visible_individually { return false; }
        if let Some(vendor) = f.vendor_id.filter(|v| *v > 0) { if p.vendor_id != vendor { return false; } }
        if let Some(kind) = f.product_type { if p.product_type != kind { return false; } }
        if let Some(min) = f.price_min { if p.price < min { return false; } }
        if let Some(max) = f.price_max { if p.price > max { return false; } }
        let categories: Vec<u32> = f.category_ids.iter().copied().filter(|id| *id > 0).collect();
        if !categories.is_empty() && !p.category_ids.iter().any(|c| categories.contains(c)) { return false; }
        let manufacturers: Vec<u32> = f.manufacturer_ids.iter().copied().filter(|id| *id > 0).collect();
        if !manufacturers.is_empty() && !p.manufacturer_ids.iter().any(|m| manufacturers.contains(m)) { return false; }
        if let Some(tag) = f.tag_id.filter(|t| *t > 0) { if !p.tag_ids.contains(&tag) { return false; } }
        f.specification_option_ids.iter().all(|opt| self.has_spec_option(p.id, *opt))
    }

    fn matches_keywords(p: &Product, keywords: &str, search_descriptions: bool) -> bool {
        let needle = keywords.to_lowercase();
        if p.name.to_lowercase().contains(&needle) { return true; }
        search_descriptions
            && (p.short_description.to_lowercase().contains(&needle) || p.full_description.to_lowercase().contains(&needle))
    }
}

fn sort_products(products: &mut [Product], sort: ProductSort) {
    match sort {
        ProductSort::Position => products.sort_by(|a, b| a.display_order.cmp(&b.display_order).then(a.id.cmp(&b.id))),
        ProductSort::NameAsc => products.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id))),
        ProductSort::NameDesc => products.sort_by(|a, b| b.name.cmp(&a.name).then(a.id.cmp(&b.id))),
        ProductSort::PriceAsc => products.sort_by(|a, b| a.price.total_cmp(&b.price).then(a.id.cmp(&b.id))),
        ProductSort::PriceDesc => products.sort_by(|a, b| b.price.total_cmp(&a.price).then(a.id.cmp(&b.id))),
    }
}

fn list_json_files(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.path().to_path_buf())
        .filter(|p| p.extension().and_then(|s| s.to_str()) == Some("json"))
        .collect();
    files.sort();
    files
}

#[async_trait]
impl ProductStore for MemoryCatalog {
    async fn product_by_id(&self, id: ProductId) -> Result<Option<Product>> {
        Ok(self.by_id.get(&id).map(|&i| self.products[i].clone()))
    }

    async fn search_products(&self, filter: &ProductFilter, page: PageRequest) -> Result<Page<Product>> {
        let keywords = filter.keywords();
        let mut hits: Vec<Product> = self
            .products
            .iter()
            .filter(|p| self.matches(p, filter))
            .filter(|p| keywords.map_or(true, |k| Self::matches_keywords(p, k, filter.search_descriptions)))
            .cloned()
            .collect();
        sort_products(&mut hits, filter.sort);
        Ok(page.apply(hits))
    }

    async fn filter_products(&self, filter: &ProductFilter, candidate_ids: &[ProductId]) -> Result<Vec<Product>> {
        Ok(candidate_ids
            .iter()
            .filter_map(|id| self.by_id.get(id).map(|&i| &self.products[i]))
            .filter(|p| self.matches(p, filter))
            .cloned()
            .collect())
    }

    async fn products_marked_for_indexing(&self) -> Result<Vec<Product>> {
        Ok(self.products.iter().filter(|p| p.mark_as_new && !p.deleted).cloned().collect())
    }

    async fn all_products(&self) -> Result<Vec<Product>> {
        Ok(self.products.iter().filter(|p| !p.deleted).cloned().collect())
    }
}

#[async_trait]
impl AttributeStore for MemoryCatalog {
    async fn specification_attributes(&self) -> Result<Vec<SpecificationAttribute>> {
        Ok(self.snapshot.specification_attributes.clone())
    }

    async fn specification_options(&self, attribute_id: u32) -> Result<Vec<SpecificationAttributeOption>> {
        Ok(self.snapshot.specification_options.iter().filter(|o| o.specification_attribute_id == attribute_id).cloned().collect())
    }

    async fn product_specifications(&self, product_id: ProductId) -> Result<Vec<ProductSpecificationAttribute>> {
        Ok(self.specs_by_product.get(&product_id).cloned().unwrap_or_default())
    }

    async fn product_attributes(&self) -> Result<Vec<ProductAttribute>> {
        Ok(self.snapshot.product_attributes.clone())
    }

    async fn predefined_values(&self, attribute_id: u32) -> Result<Vec<PredefinedProductAttributeValue>> {
        Ok(self.snapshot.predefined_values.iter().filter(|v| v.product_attribute_id == attribute_id).cloned().collect())
    }

    async fn product_attribute_mappings(&self, product_id: ProductId) -> Result<Vec<ProductAttributeMapping>> {
        Ok(self.mappings_by_product.get(&product_id).cloned().unwrap_or_default())
    }
}
