//! catalog-embed
//!
//! Embedding gateway implementations: an HTTP client for an external
//! embedding service and a deterministic hashing embedder for development
//! and tests.

use async_trait::async_trait;
use std::sync::Arc;

use catalog_core::config::{EmbeddingProviderKind, EmbeddingSettings};
use catalog_core::error::Result;
use catalog_core::traits::Embedder;
use catalog_core::types::EmbeddingVector;

pub mod http;

pub use http::HttpEmbedder;

/// Bag-of-tokens hashing embedder. L2-normalized, deterministic, offline.
pub struct HashingEmbedder { dim: usize }

impl HashingEmbedder {
    pub fn new(dim: usize) -> Self { Self { dim } }

    pub fn embed_sync(&self, text: &str) -> EmbeddingVector {
        use std::hash::{Hash, Hasher};
        use twox_hash::XxHash64;
        let mut v = vec![0f32; self.dim];
        for (i, token) in text.split_whitespace().enumerate() {
            let token = token.to_lowercase();
            let mut hasher = XxHash64::with_seed(0);
            token.hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h as usize) % self.dim;
            let val = (((h >> 32) as u32) as f32) / (u32::MAX as f32);
            v[idx] += val + (i as f32 % 3.0) * 0.01;
        }
        let norm = (v.iter().map(|x| x * x).sum::<f32>()).sqrt().max(1e-6);
        for x in &mut v { *x /= norm; }
        v
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    fn dimension(&self) -> usize { self.dim }
    async fn embed(&self, text: &str) -> Result<EmbeddingVector> { Ok(self.embed_sync(text)) }
}

/// Pick the embedder from settings. `APP_USE_FAKE_EMBEDDINGS=1` forces the
/// hashing embedder regardless of the configured provider.
pub fn get_default_embedder(settings: &EmbeddingSettings) -> Result<Arc<dyn Embedder>> {
    let use_fake = std::env::var("APP_USE_FAKE_EMBEDDINGS").ok().map(|v| v == "1" || v.eq_ignore_ascii_case("true")).unwrap_or(false);
    if use_fake || settings.provider == EmbeddingProviderKind::Hashing {
        tracing::info!(dim = settings.dimension, "using hashing embedder");
        return Ok(Arc::new(HashingEmbedder::new(settings.dimension)));
    }
    let embedder = HttpEmbedder::from_settings(settings)?;
    tracing::info!(endpoint = embedder.endpoint(), model = %settings.model, "using HTTP embedder");
    Ok(Arc::new(embedder))
}
