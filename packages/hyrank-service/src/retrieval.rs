use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LexicalPageRequest {
	pub project_id: String,
	pub query: String,
	pub limit: u32,
	pub offset: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LexicalHit {
	pub document_id: String,
	pub snippet: String,
	/// Unbounded relevance, larger is better.
	pub score: f64,
	pub updated_at: i64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LexicalPage {
	pub results: Vec<LexicalHit>,
	pub total: u64,
	pub has_more: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SemanticSearchRequest {
	pub project_id: String,
	pub query: String,
	pub limit: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SemanticHit {
	pub document_id: String,
	pub chunk_id: String,
	pub snippet: String,
	/// Similarity in [0, 1].
	pub score: f64,
	pub updated_at: i64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SemanticHits {
	pub items: Vec<SemanticHit>,
}
