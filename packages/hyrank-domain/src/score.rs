use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::{
	candidate::Candidate,
	normalize::{self, clamp01},
};
use hyrank_config::{Ranking, RankingWeights};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
	pub bm25: f64,
	pub semantic: f64,
	pub recency: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RankedItem {
	pub document_id: String,
	pub chunk_id: String,
	pub snippet: String,
	pub final_score: f64,
	pub score_breakdown: ScoreBreakdown,
	pub updated_at: i64,
}
impl RankedItem {
	pub fn matches(&self, document_id: &str, chunk_id: &str) -> bool {
		self.document_id == document_id && self.chunk_id == chunk_id
	}
}

/// Rounds half away from zero at `digits` decimal places.
pub fn round_score(value: f64, digits: u32) -> f64 {
	let factor = 10_f64.powi(digits as i32);

	(value * factor).round() / factor
}

pub fn weighted_score(components: ScoreBreakdown, weights: &RankingWeights, digits: u32) -> f64 {
	round_score(
		weights.bm25 * components.bm25
			+ weights.semantic * components.semantic
			+ weights.recency * components.recency,
		digits,
	)
}

/// Scores every candidate without filtering. The output is parallel to `candidates`.
pub fn score_candidates(candidates: &[Candidate], cfg: &Ranking) -> Vec<RankedItem> {
	let bm25 = normalize::normalize_bm25(candidates, cfg.epsilon);
	let recency = normalize::normalize_recency(candidates, cfg.epsilon);

	candidates
		.iter()
		.enumerate()
		.map(|(idx, candidate)| {
			let components = ScoreBreakdown {
				bm25: clamp01(bm25.get(idx).copied().unwrap_or(0.0)),
				semantic: normalize::normalize_semantic(candidate.semantic_raw),
				recency: clamp01(recency.get(idx).copied().unwrap_or(0.0)),
			};
			let final_score = weighted_score(components, &cfg.weights, cfg.round_digits);

			RankedItem {
				document_id: candidate.document_id.clone(),
				chunk_id: candidate.chunk_id.clone(),
				snippet: candidate.snippet.clone(),
				final_score,
				score_breakdown: ScoreBreakdown {
					bm25: round_score(components.bm25, cfg.round_digits),
					semantic: round_score(components.semantic, cfg.round_digits),
					recency: round_score(components.recency, cfg.round_digits),
				},
				updated_at: candidate.updated_at,
			}
		})
		.collect()
}

pub fn apply_threshold(items: Vec<RankedItem>, threshold: f64) -> Vec<RankedItem> {
	items.into_iter().filter(|item| item.final_score >= threshold).collect()
}

/// Total order: score desc, `updated_at` desc, `document_id` asc, `chunk_id` asc.
pub fn cmp_ranked(left: &RankedItem, right: &RankedItem) -> Ordering {
	cmp_f64_desc(left.final_score, right.final_score)
		.then_with(|| right.updated_at.cmp(&left.updated_at))
		.then_with(|| left.document_id.cmp(&right.document_id))
		.then_with(|| left.chunk_id.cmp(&right.chunk_id))
}

pub fn sort_ranked(items: &mut [RankedItem]) {
	items.sort_by(cmp_ranked);
}

/// Normalize, score, threshold, sort.
pub fn rank_candidates(candidates: &[Candidate], cfg: &Ranking) -> Vec<RankedItem> {
	let mut ranked = apply_threshold(score_candidates(candidates, cfg), cfg.score_threshold);

	sort_ranked(&mut ranked);

	ranked
}

pub fn cmp_f64_desc(a: f64, b: f64) -> Ordering {
	match (a.is_nan(), b.is_nan()) {
		(true, true) => Ordering::Equal,
		(true, false) => Ordering::Greater,
		(false, true) => Ordering::Less,
		(false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
	}
}
