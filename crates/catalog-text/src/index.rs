use async_trait::async_trait;
use std::collections::BTreeSet;
use std::path::Path;
use tantivy::collector::DocSetCollector;
use tantivy::query::{AllQuery, BooleanQuery, Occur, Query, RegexQuery, TermQuery};
use tantivy::schema::{Field, IndexRecordOption, Value};
use tantivy::{doc, Index, IndexReader, IndexWriter, ReloadPolicy, Searcher, TantivyDocument, Term};

use catalog_core::error::{Error, Result};
use catalog_core::traits::{LexicalSearch, ProductStore};
use catalog_core::types::{Product, ProductId};

use crate::tantivy_utils::{build_schema, exceeds_term_limit, register_tokenizer, single_line};

/// Needles longer than this skip the regex automaton and scan stored text.
const MAX_REGEX_NEEDLE_BYTES: usize = 256;

fn lexical(e: impl std::fmt::Display) -> Error {
	Error::LexicalStore(e.to_string())
}

/// Substring index over product name and short description. Built once from
/// a catalog snapshot; deleted products are left out.
///
/// Values past tantivy's term length limit are not in the inverted index.
/// Those documents carry `oversized = 1` and are always matched by scanning
/// their stored text.
pub struct TantivyLexicalIndex {
	reader: IndexReader,
	id_field: Field,
	oversized_field: Field,
	name_field: Field,
	short_description_field: Field,
	len: usize,
}

impl TantivyLexicalIndex {
	/// Build in RAM, or under `index_dir` (recreated from scratch) when given.
	pub fn build(products: &[Product], index_dir: Option<&Path>) -> Result<Self> {
		let schema = build_schema();
		let index = match index_dir {
			Some(dir) => {
				if dir.exists() { std::fs::remove_dir_all(dir).map_err(lexical)?; }
				std::fs::create_dir_all(dir).map_err(lexical)?;
				Index::create_in_dir(dir, schema.clone()).map_err(lexical)?
			}
			None => Index::create_in_ram(schema.clone()),
		};
		register_tokenizer(&index);
		let id_field = schema.get_field("id").map_err(lexical)?;
		let oversized_field = schema.get_field("oversized").map_err(lexical)?;
		let name_field = schema.get_field("name").map_err(lexical)?;
		let short_description_field = schema.get_field("short_description").map_err(lexical)?;

		let mut writer: IndexWriter = index.writer_with_num_threads(1, 50_000_000).map_err(lexical)?;
		let mut len = 0usize;
		let mut oversized = 0usize;
		for p in products.iter().filter(|p| !p.deleted) {
			let name = single_line(&p.name);
			let short_description = single_line(&p.short_description);
			let too_long = exceeds_term_limit(&name) || exceeds_term_limit(&short_description);
			writer
				.add_document(doc!(
					id_field => p.id,
					oversized_field => u64::from(too_long),
					name_field => name,
					short_description_field => short_description,
				))
				.map_err(lexical)?;
			len += 1;
			oversized += usize::from(too_long);
		}
		writer.commit().map_err(lexical)?;
		let reader = index.reader_builder().reload_policy(ReloadPolicy::Manual).try_into().map_err(lexical)?;
		tracing::info!(documents = len, oversized, on_disk = index_dir.is_some(), "lexical index built");
		Ok(Self { reader, id_field, oversized_field, name_field, short_description_field, len })
	}

	pub async fn from_store(store: &dyn ProductStore, index_dir: Option<&Path>) -> Result<Self> {
		let products = store.all_products().await?;
		Self::build(&products, index_dir)
	}

	pub fn len(&self) -> usize { self.len }
	pub fn is_empty(&self) -> bool { self.len == 0 }

	/// Ids whose name or short description contains `query`, ignoring case,
	/// in ascending id order.
	pub fn search_ids(&self, query: &str, limit: usize) -> Result<Vec<ProductId>> {
		let needle = single_line(query).to_lowercase();
		if needle.trim().is_empty() || limit == 0 {
			return Ok(Vec::new());
		}
		let searcher = self.reader.searcher();
		let mut ids = BTreeSet::new();
		match self.regex_query(&needle) {
			Some(query) => {
				let addresses = searcher.search(&query, &DocSetCollector).map_err(lexical)?;
				for addr in addresses {
					let doc: TantivyDocument = searcher.doc(addr).map_err(lexical)?;
					ids.extend(doc.get_first(self.id_field).and_then(|v| v.as_u64()));
				}
				let flagged = TermQuery::new(Term::from_field_u64(self.oversized_field, 1), IndexRecordOption::Basic);
				self.scan(&searcher, &flagged, &needle, &mut ids)?;
			}
			None => self.scan(&searcher, &AllQuery, &needle, &mut ids)?,
		}
		let ids: Vec<ProductId> = ids.into_iter().take(limit).collect();
		tracing::debug!(query = %query_preview(&needle), hits = ids.len(), "lexical search");
		Ok(ids)
	}

	/// `None` when the needle is too long for the regex automaton.
	fn regex_query(&self, needle: &str) -> Option<BooleanQuery> {
		if needle.len() > MAX_REGEX_NEEDLE_BYTES {
			return None;
		}
		let pattern = format!(".*{}.*", regex::escape(needle));
		let mut clauses: Vec<(Occur, Box<dyn Query>)> = Vec::new();
		for field in [self.name_field, self.short_description_field] {
			match RegexQuery::from_pattern(&pattern, field) {
				Ok(q) => clauses.push((Occur::Should, Box::new(q))),
				Err(e) => {
					tracing::debug!(error = %e, "regex rejected, scanning stored text");
					return None;
				}
			}
		}
		Some(BooleanQuery::new(clauses))
	}

	/// Substring match against the stored text of every document `candidates` selects.
	fn scan(
		&self,
		searcher: &Searcher,
		candidates: &dyn Query,
		needle: &str,
		ids: &mut BTreeSet<ProductId>,
	) -> Result<()> {
		let addresses = searcher.search(candidates, &DocSetCollector).map_err(lexical)?;
		for addr in addresses {
			let doc: TantivyDocument = searcher.doc(addr).map_err(lexical)?;
			let hit = [self.name_field, self.short_description_field]
				.into_iter()
				.filter_map(|f| doc.get_first(f).and_then(|v| v.as_str()).map(str::to_lowercase))
				.any(|text| text.contains(needle));
			if hit {
				ids.extend(doc.get_first(self.id_field).and_then(|v| v.as_u64()));
			}
		}
		Ok(())
	}
}

fn query_preview(q: &str) -> &str {
	match q.char_indices().nth(64) {
		Some((i, _)) => &q[..i],
		None => q,
	}
}

#[async_trait]
impl LexicalSearch for TantivyLexicalIndex {
	async fn search_text(&self, query: &str, limit: usize) -> Result<Vec<ProductId>> {
		self.search_ids(query, limit)
	}
}
