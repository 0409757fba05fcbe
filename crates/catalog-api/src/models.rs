//! Request and response bodies.

use serde::{Deserialize, Serialize};

use catalog_core::types::{PageRequest, ProductFilter, ProductSort, ProductType, ScoredCandidate};

use crate::errors::ApiError;

pub const DEFAULT_PAGE_SIZE: usize = 20;
pub const MAX_PAGE_SIZE: usize = 200;

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
    pub store_id: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResponse {
    pub query: String,
    pub count: usize,
    pub results: Vec<SearchResult>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: u64,
    pub name: String,
    pub short_description: String,
    pub full_description: String,
    pub price: f64,
    pub score: f64,
}

impl From<ScoredCandidate> for SearchResult {
    fn from(hit: ScoredCandidate) -> Self {
        Self {
            id: hit.product.id,
            name: hit.product.name,
            short_description: hit.product.short_description,
            full_description: hit.product.full_description,
            price: hit.product.price,
            score: hit.score,
        }
    }
}

/// Query string of the product listing. Id lists are comma separated.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ProductsParams {
    pub q: Option<String>,
    pub search_descriptions: bool,
    pub category_ids: Option<String>,
    pub manufacturer_ids: Option<String>,
    pub spec_option_ids: Option<String>,
    pub store_id: Option<u32>,
    pub vendor_id: Option<u32>,
    pub product_type: Option<ProductType>,
    pub visible_individually_only: bool,
    pub price_min: Option<f64>,
    pub price_max: Option<f64>,
    pub tag_id: Option<u32>,
    pub sort: Option<ProductSort>,
    pub page: Option<usize>,
    pub page_size: Option<usize>,
}

impl ProductsParams {
    pub fn filter(&self) -> Result<ProductFilter, ApiError> {
        if let (Some(min), Some(max)) = (self.price_min, self.price_max) {
            if min > max {
                return Err(ApiError::BadRequest(format!("price_min {min} exceeds price_max {max}")));
            }
        }
        Ok(ProductFilter {
            keywords: self.q.clone(),
            search_descriptions: self.search_descriptions,
            category_ids: parse_ids("category_ids", self.category_ids.as_deref())?,
            manufacturer_ids: parse_ids("manufacturer_ids", self.manufacturer_ids.as_deref())?,
            store_id: self.store_id,
            vendor_id: self.vendor_id,
            product_type: self.product_type,
            visible_individually_only: self.visible_individually_only,
            price_min: self.price_min,
            price_max: self.price_max,
            tag_id: self.tag_id,
            specification_option_ids: parse_ids("spec_option_ids", self.spec_option_ids.as_deref())?,
            show_hidden: false,
            override_published: None,
            sort: self.sort.unwrap_or_default(),
        })
    }

    pub fn page(&self) -> Result<PageRequest, ApiError> {
        let size = self.page_size.unwrap_or(DEFAULT_PAGE_SIZE);
        if size == 0 || size > MAX_PAGE_SIZE {
            return Err(ApiError::BadRequest(format!("page_size must be 1-{MAX_PAGE_SIZE}")));
        }
        Ok(PageRequest::new(self.page.unwrap_or(0), size))
    }
}

fn parse_ids(name: &str, raw: Option<&str>) -> Result<Vec<u32>, ApiError> {
    let Some(raw) = raw else { return Ok(Vec::new()) };
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<u32>().map_err(|_| ApiError::BadRequest(format!("{name}: '{s}' is not an id"))))
        .collect()
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct IndexParams {
    /// Reindex every product instead of only those marked as new.
    pub all: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IndexResponse {
    pub indexed: usize,
    pub candidates: usize,
    pub skipped: usize,
    pub failed: usize,
}
