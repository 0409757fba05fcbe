use std::fs;
use tempfile::TempDir;

use catalog_core::config::{Config, EmbeddingProviderKind};
use catalog_core::memory::MemoryCatalog;
use catalog_core::traits::{AttributeStore, ProductStore};
use catalog_core::types::{PageRequest, ProductFilter, ProductSort};

const SNAPSHOT_A: &str = r#"{
  "products": [
    {"id": 1, "name": "Granulated Sugar", "short_description": "White cane sugar", "price": 2.5, "category_ids": [10], "display_order": 2},
    {"id": 2, "name": "Brown Sugar", "short_description": "Soft and moist", "price": 3.0, "category_ids": [10], "display_order": 1},
    {"id": 3, "name": "Sea Salt", "price": 1.0, "category_ids": [11], "published": false},
    {"id": 4, "name": "Old Sugar", "price": 1.5, "deleted": true, "mark_as_new": true}
  ],
  "specification_attributes": [{"id": 1, "name": "Weight"}],
  "specification_options": [{"id": 100, "specification_attribute_id": 1, "name": "1 kg"}],
  "product_specifications": [{"product_id": 2, "option_id": 100}]
}"#;

const SNAPSHOT_B: &str = r#"{
  "products": [
    {"id": 5, "name": "Icing Sugar", "price": 4.0, "mark_as_new": true, "limited_to_stores": [2]}
  ]
}"#;

fn catalog() -> (TempDir, MemoryCatalog) {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("a.json"), SNAPSHOT_A).unwrap();
    fs::create_dir_all(tmp.path().join("more")).unwrap();
    fs::write(tmp.path().join("more/b.json"), SNAPSHOT_B).unwrap();
    fs::write(tmp.path().join("notes.txt"), "ignored").unwrap();
    let catalog = MemoryCatalog::load_dir(tmp.path()).expect("load");
    (tmp, catalog)
}

#[tokio::test]
async fn load_dir_merges_all_json_snapshots() {
    let (_tmp, catalog) = catalog();
    assert_eq!(catalog.products().len(), 5);
    assert!(catalog.product_by_id(5).await.unwrap().is_some());
    assert!(catalog.product_by_id(42).await.unwrap().is_none());
    assert_eq!(catalog.specification_options(1).await.unwrap().len(), 1);
    assert_eq!(catalog.product_specifications(2).await.unwrap().len(), 1);
}

#[tokio::test]
async fn native_search_filters_sorts_and_pages() {
    let (_tmp, catalog) = catalog();
    let filter = ProductFilter { keywords: Some(" sugar ".into()), ..Default::default() };
    let page = catalog.search_products(&filter, PageRequest::default()).await.unwrap();
    // deleted product 4 never shows; position order, then id
    let ids: Vec<u64> = page.items.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![5, 2, 1]);

    let filter = ProductFilter { category_ids: vec![10], sort: ProductSort::PriceDesc, ..Default::default() };
    let page = catalog.search_products(&filter, PageRequest::new(0, 1)).await.unwrap();
    assert_eq!(page.total_count, 2);
    assert_eq!(page.items[0].id, 2);

    let filter = ProductFilter { store_id: Some(3), ..Default::default() };
    let page = catalog.search_products(&filter, PageRequest::default()).await.unwrap();
    assert!(page.items.iter().all(|p| p.id != 5), "store-limited product hidden from store 3");
}

#[tokio::test]
async fn filter_products_applies_predicates_to_candidates_only() {
    let (_tmp, catalog) = catalog();
    let filter = ProductFilter { specification_option_ids: vec![100], ..Default::default() };
    let rows = catalog.filter_products(&filter, &[1, 2, 3]).await.unwrap();
    assert_eq!(rows.iter().map(|p| p.id).collect::<Vec<_>>(), vec![2]);

    let hidden = ProductFilter { show_hidden: true, ..Default::default() };
    let rows = catalog.filter_products(&hidden, &[3, 4, 99]).await.unwrap();
    assert_eq!(rows.iter().map(|p| p.id).collect::<Vec<_>>(), vec![3], "deleted and unknown ids dropped");
}

#[tokio::test]
async fn marked_products_exclude_deleted() {
    let (_tmp, catalog) = catalog();
    let marked = catalog.products_marked_for_indexing().await.unwrap();
    assert_eq!(marked.iter().map(|p| p.id).collect::<Vec<_>>(), vec![5]);
    assert_eq!(catalog.all_products().await.unwrap().len(), 4);
}

#[test]
fn config_layers_file_overlay_and_defaults() {
    let tmp = TempDir::new().unwrap();
    fs::write(
        tmp.path().join("config.toml"),
        "[embedding]\nprovider = \"hashing\"\ndimension = 64\n\n[ranking]\ntop_n = 5\n",
    )
    .unwrap();
    fs::write(tmp.path().join("config.test.toml"), "[vector]\ncollection = \"products_test\"\n").unwrap();

    let settings = Config::load_from(tmp.path(), "test").unwrap().settings().unwrap();
    assert_eq!(settings.embedding.provider, EmbeddingProviderKind::Hashing);
    assert_eq!(settings.embedding.dimension, 64);
    assert_eq!(settings.ranking.top_n, 5);
    assert_eq!(settings.ranking.keyword_bonus, 0.3);
    assert_eq!(settings.vector.collection, "products_test");
    assert_eq!(settings.collection().dimension, 64);
}

#[test]
fn config_rejects_zero_dimension() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("config.toml"), "[embedding]\ndimension = 0\n").unwrap();
    assert!(Config::load_from(tmp.path(), "dev").unwrap().settings().is_err());
}
