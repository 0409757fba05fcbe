//! Product listing that composes the catalog's filter/pagination query with
//! hybrid ranking when a free-text query is present.

use std::collections::HashMap;
use std::sync::Arc;

use catalog_core::error::Result;
use catalog_core::traits::ProductStore;
use catalog_core::types::{Page, PageRequest, Product, ProductFilter, ProductId, SearchQuery};

use crate::engine::HybridSearchEngine;

pub struct FilteredRankedSearch {
    engine: Arc<HybridSearchEngine>,
    products: Arc<dyn ProductStore>,
}

impl FilteredRankedSearch {
    pub fn new(engine: Arc<HybridSearchEngine>, products: Arc<dyn ProductStore>) -> Self {
        Self { engine, products }
    }

    /// Blank `filter.keywords` delegates to the native query untouched.
    /// Otherwise the ranked ids become the candidate set, every structural
    /// predicate still applies, rows come back in rank order and the total
    /// is the size of the filtered set.
    pub async fn search(&self, filter: &ProductFilter, page: PageRequest) -> Result<Page<Product>> {
        let Some(keywords) = filter.keywords() else {
            return self.products.search_products(filter, page).await;
        };
        let query = SearchQuery::new(keywords).with_store(filter.store_id);
        let ranked = self.engine.search(&query).await?;
        if ranked.is_empty() {
            return Ok(Page::empty(page));
        }
        let ids = ranked.ids();
        let rank: HashMap<ProductId, usize> = ids.iter().enumerate().map(|(i, id)| (*id, i)).collect();

        let mut rows = self.products.filter_products(filter, &ids).await?;
        rows.retain(|p| rank.contains_key(&p.id));
        rows.sort_by_key(|p| rank[&p.id]);
        rows.dedup_by_key(|p| p.id);
        tracing::debug!(ranked = ids.len(), filtered = rows.len(), "filtered ranked search");
        Ok(page.apply(rows))
    }
}
