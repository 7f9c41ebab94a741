use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
	pub service: Service,
	pub search: Search,
	pub ranking: Ranking,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Service {
	pub log_level: String,
}
impl Default for Service {
	fn default() -> Self {
		Self { log_level: "info".to_string() }
	}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Search {
	pub default_page_size: u32,
	pub max_page_size: u32,
	/// Upper bound on the trimmed query length, counted in characters.
	pub max_query_chars: u32,
	pub recall: SearchRecall,
}
impl Default for Search {
	fn default() -> Self {
		Self {
			default_page_size: 50,
			max_page_size: 50,
			max_query_chars: 1_024,
			recall: SearchRecall::default(),
		}
	}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchRecall {
	/// Page size for a single lexical fetch.
	pub fts_page_limit: u32,
	/// Total lexical results collected across pages.
	pub fts_recall_limit: u32,
	pub semantic_recall_limit: u32,
	/// Backpressure ceiling applied to the merged candidate set.
	pub candidate_limit: u32,
}
impl Default for SearchRecall {
	fn default() -> Self {
		Self {
			fts_page_limit: 100,
			fts_recall_limit: 200,
			semantic_recall_limit: 200,
			candidate_limit: 10_000,
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Ranking {
	pub weights: RankingWeights,
	/// Candidates whose rounded final score is below this value are dropped.
	pub score_threshold: f64,
	/// Decimal digits kept by score rounding.
	pub round_digits: u32,
	/// Spans below this value are treated as degenerate during min-max normalization.
	pub epsilon: f64,
}
impl Default for Ranking {
	fn default() -> Self {
		Self {
			weights: RankingWeights::default(),
			score_threshold: 0.25,
			round_digits: 6,
			epsilon: 1e-12,
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingWeights {
	pub bm25: f64,
	pub semantic: f64,
	pub recency: f64,
}
impl RankingWeights {
	pub fn sum(&self) -> f64 {
		self.bm25 + self.semantic + self.recency
	}
}
impl Default for RankingWeights {
	fn default() -> Self {
		Self { bm25: 0.55, semantic: 0.35, recency: 0.10 }
	}
}
