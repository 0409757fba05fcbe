mod common;

use std::sync::Arc;

use catalog_core::config::RankingSettings;
use catalog_core::memory::MemoryCatalog;
use catalog_core::traits::ProductStore;
use catalog_core::types::{PageRequest, Product, ProductFilter, ProductSort};
use catalog_hybrid::{FilteredRankedSearch, HybridSearchEngine};
use common::*;

fn shop() -> Arc<MemoryCatalog> {
    let mut products: Vec<Product> = (1..=4)
        .map(|id| Product { category_ids: vec![if id == 4 { 8 } else { 7 }], ..product(id, "Baking item") })
        .collect();
    products.push(Product { published: false, category_ids: vec![7], ..product(5, "Hidden item") });
    catalog(products)
}

fn listing(embedder: Arc<FakeEmbedder>, store: Arc<MemoryCatalog>) -> FilteredRankedSearch {
    let engine = HybridSearchEngine::new(
        embedder,
        Arc::new(FakeVectorIndex::with_candidates(&[(5, 0.05), (3, 0.1), (1, 0.3), (4, 0.4)])),
        Arc::new(FakeLexical::returning(&[2])),
        store.clone(),
        RankingSettings::default(),
        DIM,
    );
    FilteredRankedSearch::new(Arc::new(engine), store)
}

fn ids(products: &[Product]) -> Vec<u64> { products.iter().map(|p| p.id).collect() }

#[tokio::test]
async fn blank_query_is_a_passthrough() {
    let store = shop();
    let embedder = Arc::new(FakeEmbedder::returning(vec![1.0, 0.0, 0.0]));
    let search = listing(embedder.clone(), store.clone());
    let filter = ProductFilter { keywords: Some("  ".into()), sort: ProductSort::PriceDesc, ..Default::default() };
    let page = PageRequest::new(0, 3);

    let ranked = search.search(&filter, page).await.unwrap();
    let native = store.search_products(&filter, page).await.unwrap();
    assert_eq!(ids(&ranked.items), ids(&native.items));
    assert_eq!(ranked.total_count, native.total_count);
    assert_eq!(ids(&ranked.items), vec![4, 3, 2]);
    assert_eq!(ranked.total_count, 4);
    assert!(embedder.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn rows_follow_rank_order_after_filters() {
    let search = listing(Arc::new(FakeEmbedder::returning(vec![1.0, 0.0, 0.0])), shop());
    let filter = ProductFilter { keywords: Some("baking".into()), category_ids: vec![7], ..Default::default() };

    let first = search.search(&filter, PageRequest::new(0, 2)).await.unwrap();
    assert_eq!(ids(&first.items), vec![3, 1]);
    assert_eq!(first.total_count, 3);

    let second = search.search(&filter, PageRequest::new(1, 2)).await.unwrap();
    assert_eq!(ids(&second.items), vec![2]);
    assert_eq!(second.total_count, 3);
}

#[tokio::test]
async fn structural_filters_still_apply() {
    let search = listing(Arc::new(FakeEmbedder::returning(vec![1.0, 0.0, 0.0])), shop());
    let filter = ProductFilter { keywords: Some("baking".into()), price_max: Some(2.5), ..Default::default() };
    let page = search.search(&filter, PageRequest::default()).await.unwrap();
    assert_eq!(ids(&page.items), vec![1, 2]);

    // show_hidden lets the relational path keep unpublished rows, but the
    // engine never ranks them
    let filter = ProductFilter { keywords: Some("hidden".into()), show_hidden: true, ..Default::default() };
    let page = search.search(&filter, PageRequest::default()).await.unwrap();
    assert!(!ids(&page.items).contains(&5));
}

#[tokio::test]
async fn engine_failure_yields_an_empty_page() {
    let search = listing(Arc::new(FakeEmbedder::failing()), shop());
    let filter = ProductFilter { keywords: Some("baking".into()), ..Default::default() };
    let page = search.search(&filter, PageRequest::new(0, 10)).await.unwrap();
    assert!(page.items.is_empty());
    assert_eq!(page.total_count, 0);
}
