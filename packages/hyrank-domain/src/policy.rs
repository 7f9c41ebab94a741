use serde_json::Value;

use hyrank_config::Ranking;

pub const RANKING_POLICY_SCHEMA: &str = "ranking_v1";

const POLICY_HASH_CHARS: usize = 12;

pub fn build_policy_snapshot(cfg: &Ranking) -> Value {
	serde_json::json!({
		"schema": RANKING_POLICY_SCHEMA,
		"weights": {
			"bm25": cfg.weights.bm25,
			"semantic": cfg.weights.semantic,
			"recency": cfg.weights.recency,
		},
		"score_threshold": cfg.score_threshold,
		"round_digits": cfg.round_digits,
		"epsilon": cfg.epsilon,
	})
}

/// Stable identifier of the scoring policy, for comparing evaluation runs.
pub fn ranking_policy_id(cfg: &Ranking) -> String {
	let snapshot = build_policy_snapshot(cfg).to_string();
	let hash = blake3::hash(snapshot.as_bytes()).to_hex();

	format!("{RANKING_POLICY_SCHEMA}:{}", &hash.as_str()[..POLICY_HASH_CHARS])
}
