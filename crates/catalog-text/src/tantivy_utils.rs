use tantivy::schema::{IndexRecordOption, NumericOptions, Schema, TextFieldIndexing, TextOptions};
use tantivy::tokenizer::{LowerCaser, RawTokenizer, TextAnalyzer};
use tantivy::Index;

pub const RAW_LOWERCASE: &str = "raw_lowercase";

/// Longest term tantivy keeps; longer raw values are dropped from the
/// inverted index and only survive as stored text.
pub const MAX_TERM_BYTES: usize = u16::MAX as usize - 5;

/// `id`, an `oversized` flag, and the two searchable product fields. Each
/// text field is indexed as a single lowercased term so regex queries behave
/// like substring matching over the whole value, and stored for scanning.
pub fn build_schema() -> Schema {
	let mut schema_builder = Schema::builder();
	let _id_field = schema_builder.add_u64_field("id", NumericOptions::default().set_indexed().set_stored().set_fast());
	let _oversized_field = schema_builder.add_u64_field("oversized", NumericOptions::default().set_indexed());
	let raw_indexing = TextFieldIndexing::default().set_tokenizer(RAW_LOWERCASE).set_index_option(IndexRecordOption::Basic);
	let raw_options = TextOptions::default().set_indexing_options(raw_indexing).set_stored();
	let _name_field = schema_builder.add_text_field("name", raw_options.clone());
	let _short_description_field = schema_builder.add_text_field("short_description", raw_options);
	schema_builder.build()
}

pub fn register_tokenizer(index: &Index) {
	let tokenizer = TextAnalyzer::builder(RawTokenizer::default()).filter(LowerCaser).build();
	index.tokenizers().register(RAW_LOWERCASE, tokenizer);
}

/// Line breaks would stop `.` in a regex query; fold them into spaces on
/// both the indexed value and the query.
pub fn single_line(text: &str) -> String {
	text.replace(['\r', '\n'], " ")
}

/// True when `value` cannot be kept as one indexed term.
pub fn exceeds_term_limit(value: &str) -> bool {
	value.len() >= MAX_TERM_BYTES || value.to_lowercase().len() >= MAX_TERM_BYTES
}
