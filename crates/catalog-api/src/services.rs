//! Wires settings into the concrete collaborators.

use anyhow::Context;
use std::path::Path;
use std::sync::Arc;

use catalog_core::config::{resolve_with_base, Settings};
use catalog_core::memory::MemoryCatalog;
use catalog_core::traits::{Embedder, VectorIndex};
use catalog_embed::get_default_embedder;
use catalog_hybrid::{FilteredRankedSearch, HybridSearchEngine, IndexingPipeline};
use catalog_text::TantivyLexicalIndex;
use catalog_vector::LanceVectorIndex;

pub struct Services {
    pub settings: Settings,
    pub catalog: Arc<MemoryCatalog>,
    pub embedder: Arc<dyn Embedder>,
    pub vectors: Arc<LanceVectorIndex>,
    pub lexical: Arc<TantivyLexicalIndex>,
    pub engine: Arc<HybridSearchEngine>,
    pub listing: Arc<FilteredRankedSearch>,
}

impl Services {
    /// Relative paths in `settings` resolve against `base_dir`.
    pub async fn build(settings: Settings, base_dir: &Path) -> anyhow::Result<Self> {
        settings.validate()?;
        let catalog_dir = resolve_with_base(base_dir, &settings.catalog.data_dir);
        let catalog = Arc::new(
            MemoryCatalog::load_dir(&catalog_dir)
                .with_context(|| format!("loading catalog from {}", catalog_dir.display()))?,
        );

        let embedder = get_default_embedder(&settings.embedding)?;
        let collection = settings.collection();
        if embedder.dimension() != collection.dimension {
            anyhow::bail!(
                "embedder produces {}-dimensional vectors, collection '{}' is configured for {}",
                embedder.dimension(),
                collection.name,
                collection.dimension
            );
        }

        let db_path = resolve_with_base(base_dir, &settings.vector.db_path);
        std::fs::create_dir_all(&db_path).with_context(|| format!("creating {}", db_path.display()))?;
        let vectors = Arc::new(LanceVectorIndex::open(&db_path, collection).await?);
        vectors.ensure_collection().await?;

        let text_dir = settings.text.index_dir.as_ref().map(|d| resolve_with_base(base_dir, d));
        let lexical = Arc::new(TantivyLexicalIndex::from_store(catalog.as_ref(), text_dir.as_deref()).await?);

        let engine = Arc::new(HybridSearchEngine::new(
            embedder.clone(),
            vectors.clone(),
            lexical.clone(),
            catalog.clone(),
            settings.ranking.clone(),
            settings.embedding.dimension,
        ));
        let listing = Arc::new(FilteredRankedSearch::new(engine.clone(), catalog.clone()));
        tracing::info!(
            catalog = %catalog_dir.display(),
            vectors = %db_path.display(),
            collection = %settings.vector.collection,
            "services ready"
        );
        Ok(Self { settings, catalog, embedder, vectors, lexical, engine, listing })
    }

    pub fn pipeline(&self) -> IndexingPipeline {
        IndexingPipeline::new(
            self.embedder.clone(),
            self.vectors.clone(),
            self.catalog.clone(),
            self.settings.embedding.dimension,
        )
        .with_concurrency(self.settings.indexing.concurrency)
    }
}
