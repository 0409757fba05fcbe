mod common;

use std::sync::{Arc, Mutex};

use catalog_core::error::Error;
use catalog_core::memory::{CatalogSnapshot, MemoryCatalog};
use catalog_core::types::{
    Product, ProductSpecificationAttribute, SpecificationAttribute, SpecificationAttributeOption,
};
use catalog_hybrid::{IndexingPipeline, IndexingSummary};
use common::*;

fn snapshot() -> CatalogSnapshot {
    CatalogSnapshot {
        products: vec![
            Product { mark_as_new: true, ..product(1, "Granulated sugar") },
            Product { mark_as_new: true, ..product(2, "Brown sugar") },
            Product { mark_as_new: true, ..product(3, "Icing sugar") },
            Product { id: 4, mark_as_new: true, ..Default::default() },
            product(5, "Flour"),
        ],
        specification_attributes: vec![SpecificationAttribute { id: 1, name: "Weight".into() }],
        specification_options: vec![SpecificationAttributeOption { id: 10, specification_attribute_id: 1, name: "1 kg".into() }],
        product_specifications: vec![
            ProductSpecificationAttribute { product_id: 1, option_id: 10, custom_value: None },
            ProductSpecificationAttribute { product_id: 3, option_id: 10, custom_value: Some("500 g".into()) },
        ],
        ..Default::default()
    }
}

fn attributes(failing_products: Vec<u64>) -> Arc<FlakyAttributes> {
    Arc::new(FlakyAttributes {
        inner: MemoryCatalog::new(snapshot()),
        failing_products,
        fail_preload: false,
        preloads: Mutex::new(0),
    })
}

#[tokio::test]
async fn one_failing_product_does_not_abort_the_run() {
    let vectors = Arc::new(FakeVectorIndex::default());
    let attrs = attributes(vec![2]);
    let pipeline = IndexingPipeline::new(
        Arc::new(FakeEmbedder::returning(vec![0.1, 0.2, 0.3])),
        vectors.clone(),
        attrs.clone(),
        DIM,
    );
    let products: Vec<Product> = snapshot().products.into_iter().take(3).collect();
    let summary = pipeline.run(products).await.expect("run");
    assert_eq!(summary, IndexingSummary { candidates: 3, indexed: 2, skipped: 0, failed: 1 });

    let stored = vectors.snapshot();
    assert_eq!(stored.keys().copied().collect::<Vec<_>>(), vec![1, 3]);
    assert_eq!(stored[&1].payload.text, "Granulated sugar Granulated sugar short Weight: 1 kg");
    assert_eq!(stored[&3].payload.specifications, vec!["Weight: 500 g".to_string()]);
    assert_eq!(*attrs.preloads.lock().unwrap(), 1, "dictionaries are loaded once per run");
}

#[tokio::test]
async fn marked_products_are_indexed_and_blank_text_is_skipped() {
    let vectors = Arc::new(FakeVectorIndex::default());
    let embedder = Arc::new(FakeEmbedder::returning(vec![0.1, 0.2, 0.3]));
    let pipeline = IndexingPipeline::new(embedder.clone(), vectors.clone(), attributes(vec![]), DIM);
    let store = MemoryCatalog::new(snapshot());

    let summary = pipeline.index_marked(&store).await.unwrap();
    assert_eq!(summary, IndexingSummary { candidates: 4, indexed: 3, skipped: 1, failed: 0 });
    assert!(!vectors.snapshot().contains_key(&4));
    assert!(!vectors.snapshot().contains_key(&5));
    assert_eq!(embedder.calls.lock().unwrap().len(), 3);

    let all = pipeline.index_all(&store).await.unwrap();
    assert_eq!(all.candidates, 5);
    assert!(vectors.snapshot().contains_key(&5));
}

#[tokio::test]
async fn rerun_leaves_the_index_unchanged() {
    let vectors = Arc::new(FakeVectorIndex::default());
    let pipeline = IndexingPipeline::new(
        Arc::new(FakeEmbedder::returning(vec![0.1, 0.2, 0.3])),
        vectors.clone(),
        attributes(vec![]),
        DIM,
    )
    .with_concurrency(4);
    let store = MemoryCatalog::new(snapshot());

    pipeline.index_all(&store).await.unwrap();
    let first = vectors.snapshot();
    pipeline.index_all(&store).await.unwrap();
    assert_eq!(vectors.snapshot(), first);
    assert_eq!(first.len(), 4);
}

#[tokio::test]
async fn upsert_failure_is_isolated() {
    let vectors = Arc::new(FakeVectorIndex { fail_upsert_for: vec![1], ..FakeVectorIndex::default() });
    let pipeline = IndexingPipeline::new(
        Arc::new(FakeEmbedder::returning(vec![0.1, 0.2, 0.3])),
        vectors.clone(),
        attributes(vec![]),
        DIM,
    );
    let summary = pipeline.index_marked(&MemoryCatalog::new(snapshot())).await.unwrap();
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.indexed, 2);
}

#[tokio::test]
async fn embedding_failure_is_counted_not_raised() {
    let pipeline = IndexingPipeline::new(
        Arc::new(FakeEmbedder::failing()),
        Arc::new(FakeVectorIndex::default()),
        attributes(vec![]),
        DIM,
    );
    let summary = pipeline.index_marked(&MemoryCatalog::new(snapshot())).await.unwrap();
    assert_eq!(summary, IndexingSummary { candidates: 4, indexed: 0, skipped: 1, failed: 3 });
}

#[tokio::test]
async fn dimension_mismatch_aborts_the_run() {
    let vectors = Arc::new(FakeVectorIndex::default());
    let pipeline = IndexingPipeline::new(
        Arc::new(FakeEmbedder::returning(vec![0.1, 0.2])),
        vectors.clone(),
        attributes(vec![]),
        DIM,
    );
    let err = pipeline.index_marked(&MemoryCatalog::new(snapshot())).await.unwrap_err();
    assert!(matches!(err, Error::Configuration(_)), "got {err:?}");
    assert!(vectors.snapshot().is_empty());
}

#[tokio::test]
async fn preload_failure_aborts_before_any_product() {
    let attrs = Arc::new(FlakyAttributes {
        inner: MemoryCatalog::new(snapshot()),
        failing_products: vec![],
        fail_preload: true,
        preloads: Mutex::new(0),
    });
    let embedder = Arc::new(FakeEmbedder::returning(vec![0.1, 0.2, 0.3]));
    let pipeline = IndexingPipeline::new(embedder.clone(), Arc::new(FakeVectorIndex::default()), attrs, DIM);
    let err = pipeline.index_marked(&MemoryCatalog::new(snapshot())).await.unwrap_err();
    assert!(matches!(err, Error::Catalog(_)));
    assert!(embedder.calls.lock().unwrap().is_empty());
}
