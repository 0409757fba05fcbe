//! catalog-vector
//!
//! LanceDB-backed product vector index. One table per collection; the
//! product id is the merge key so repeated upserts replace rows.

use arrow_array::{
    types::Float32Type, Array, FixedSizeListArray, Float32Array, RecordBatch, RecordBatchIterator, StringArray,
    UInt64Array,
};
use async_trait::async_trait;
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{Connection, DistanceType, Table};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use catalog_core::error::{Error, Result};
use catalog_core::traits::VectorIndex;
use catalog_core::types::{CollectionSpec, DistanceMetric, IndexEntry, IndexPayload, ProductId, SemanticCandidate};

pub mod schema;
pub mod table;

use schema::{build_schema, vector_dimension, DISTANCE_COLUMN, ID_COLUMN};
use table::{ensure_table, open_db, unavailable};

pub struct LanceVectorIndex {
    db: Connection,
    collection: CollectionSpec,
}

impl LanceVectorIndex {
    pub async fn open(db_path: &Path, collection: CollectionSpec) -> Result<Self> {
        let db = open_db(db_path.to_string_lossy().as_ref()).await?;
        Ok(Self { db, collection })
    }

    pub fn collection(&self) -> &CollectionSpec { &self.collection }

    async fn table(&self) -> Result<Table> {
        self.db.open_table(&self.collection.name).execute().await.map_err(unavailable)
    }

    pub async fn count(&self) -> Result<usize> {
        self.table().await?.count_rows(None).await.map_err(unavailable)
    }

    /// Every stored entry, ordered by product id.
    pub async fn fetch_all(&self) -> Result<Vec<IndexEntry>> {
        let table = self.table().await?;
        let batches: Vec<RecordBatch> = table
            .query()
            .execute()
            .await
            .map_err(unavailable)?
            .try_collect()
            .await
            .map_err(unavailable)?;
        let mut entries = Vec::new();
        for batch in &batches {
            entries.extend(entries_from_batch(batch)?);
        }
        entries.sort_by_key(|e| e.product_id);
        Ok(entries)
    }

    fn to_record_batch(&self, entries: &[&IndexEntry]) -> Result<RecordBatch> {
        let dim = self.collection.dimension;
        let mut ids = Vec::with_capacity(entries.len());
        let mut names = Vec::with_capacity(entries.len());
        let mut descriptions = Vec::with_capacity(entries.len());
        let mut specifications = Vec::with_capacity(entries.len());
        let mut attributes = Vec::with_capacity(entries.len());
        let mut texts = Vec::with_capacity(entries.len());
        let mut vectors: Vec<Option<Vec<Option<f32>>>> = Vec::with_capacity(entries.len());
        for e in entries {
            if e.vector.len() != dim {
                return Err(Error::Configuration(format!(
                    "product {} has a {}-dimensional vector, collection '{}' expects {}",
                    e.product_id,
                    e.vector.len(),
                    self.collection.name,
                    dim
                )));
            }
            ids.push(e.product_id);
            names.push(e.payload.name.clone());
            descriptions.push(e.payload.description.clone());
            specifications.push(to_json(&e.payload.specifications)?);
            attributes.push(to_json(&e.payload.attributes)?);
            texts.push(e.payload.text.clone());
            vectors.push(Some(e.vector.iter().map(|&x| Some(x)).collect()));
        }
        RecordBatch::try_new(
            build_schema(dim),
            vec![
                Arc::new(UInt64Array::from(ids)),
                Arc::new(StringArray::from(names)),
                Arc::new(StringArray::from(descriptions)),
                Arc::new(StringArray::from(specifications)),
                Arc::new(StringArray::from(attributes)),
                Arc::new(StringArray::from(texts)),
                Arc::new(FixedSizeListArray::from_iter_primitive::<Float32Type, _, _>(vectors, dim as i32)),
            ],
        )
        .map_err(unavailable)
    }
}

#[async_trait]
impl VectorIndex for LanceVectorIndex {
    async fn ensure_collection(&self) -> Result<()> {
        let spec = &self.collection;
        if ensure_table(&self.db, &spec.name, build_schema(spec.dimension)).await? {
            tracing::info!(collection = %spec.name, dim = spec.dimension, "created vector collection");
            return Ok(());
        }
        let schema = self.table().await?.schema().await.map_err(unavailable)?;
        match vector_dimension(&schema) {
            Some(dim) if dim == spec.dimension => Ok(()),
            Some(dim) => Err(Error::SchemaError(format!(
                "collection '{}' has dimension {}, expected {}",
                spec.name, dim, spec.dimension
            ))),
            None => Err(Error::SchemaError(format!("collection '{}' has no vector column", spec.name))),
        }
    }

    async fn upsert(&self, entries: &[IndexEntry]) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }
        // merge_insert rejects duplicate keys in the source; keep the last one
        let mut last: HashMap<ProductId, usize> = HashMap::new();
        for (i, e) in entries.iter().enumerate() {
            last.insert(e.product_id, i);
        }
        let unique: Vec<&IndexEntry> =
            entries.iter().enumerate().filter(|(i, e)| last.get(&e.product_id) == Some(i)).map(|(_, e)| e).collect();

        let batch = self.to_record_batch(&unique)?;
        let schema = batch.schema();
        let reader = Box::new(RecordBatchIterator::new(vec![Ok(batch)].into_iter(), schema));
        let table = self.table().await?;
        let mut merge = table.merge_insert(&[ID_COLUMN]);
        merge.when_matched_update_all(None).when_not_matched_insert_all();
        merge.execute(reader).await.map_err(unavailable)?;
        tracing::debug!(collection = %self.collection.name, rows = unique.len(), "upserted vectors");
        Ok(())
    }

    async fn search(&self, vector: &[f32], limit: usize) -> Result<Vec<SemanticCandidate>> {
        if vector.len() != self.collection.dimension {
            return Err(Error::Configuration(format!(
                "query vector has dimension {}, collection '{}' expects {}",
                vector.len(),
                self.collection.name,
                self.collection.dimension
            )));
        }
        if limit == 0 {
            return Ok(Vec::new());
        }
        let table = self.table().await?;
        if table.count_rows(None).await.map_err(unavailable)? == 0 {
            return Ok(Vec::new());
        }
        let batches: Vec<RecordBatch> = table
            .vector_search(vector.to_vec())
            .map_err(unavailable)?
            .distance_type(distance_type(self.collection.distance))
            .limit(limit)
            .execute()
            .await
            .map_err(unavailable)?
            .try_collect()
            .await
            .map_err(unavailable)?;

        let mut hits = Vec::new();
        for batch in &batches {
            let ids = column::<UInt64Array>(batch, ID_COLUMN)?;
            let distances = column::<Float32Array>(batch, DISTANCE_COLUMN)?;
            for i in 0..batch.num_rows() {
                hits.push(SemanticCandidate { product_id: ids.value(i), distance: distances.value(i) });
            }
        }
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits.truncate(limit);
        Ok(hits)
    }
}

fn distance_type(metric: DistanceMetric) -> DistanceType {
    match metric {
        DistanceMetric::Cosine => DistanceType::Cosine,
        DistanceMetric::L2 => DistanceType::L2,
        DistanceMetric::Dot => DistanceType::Dot,
    }
}

fn to_json(values: &[String]) -> Result<String> {
    serde_json::to_string(values).map_err(unavailable)
}

fn from_json(raw: &str) -> Result<Vec<String>> {
    serde_json::from_str(raw).map_err(unavailable)
}

fn column<'a, T: Array + 'static>(batch: &'a RecordBatch, name: &str) -> Result<&'a T> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<T>())
        .ok_or_else(|| Error::IndexUnavailable(format!("column '{}' missing or mistyped", name)))
}

fn entries_from_batch(batch: &RecordBatch) -> Result<Vec<IndexEntry>> {
    let ids = column::<UInt64Array>(batch, ID_COLUMN)?;
    let names = column::<StringArray>(batch, "name")?;
    let descriptions = column::<StringArray>(batch, "description")?;
    let specifications = column::<StringArray>(batch, "specifications")?;
    let attributes = column::<StringArray>(batch, "attributes")?;
    let texts = column::<StringArray>(batch, "text")?;
    let vectors = column::<FixedSizeListArray>(batch, schema::VECTOR_COLUMN)?;
    let mut out = Vec::with_capacity(batch.num_rows());
    for i in 0..batch.num_rows() {
        let values = vectors.value(i);
        let floats = values
            .as_any()
            .downcast_ref::<Float32Array>()
            .ok_or_else(|| Error::IndexUnavailable("vector items are not f32".into()))?;
        out.push(IndexEntry {
            product_id: ids.value(i),
            vector: floats.values().to_vec(),
            payload: IndexPayload {
                name: names.value(i).to_string(),
                description: descriptions.value(i).to_string(),
                specifications: from_json(specifications.value(i))?,
                attributes: from_json(attributes.value(i))?,
                text: texts.value(i).to_string(),
            },
        });
    }
    Ok(out)
}
