use serde::{Deserialize, Serialize};

use crate::candidate::Candidate;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Backpressure {
	pub candidate_limit: usize,
	/// Merged size before truncation.
	pub candidate_count: usize,
	pub truncated: bool,
}

/// Keeps the first `limit` candidates in merge order.
pub fn apply_candidate_limit(
	mut candidates: Vec<Candidate>,
	limit: usize,
) -> (Vec<Candidate>, Backpressure) {
	let candidate_count = candidates.len();
	let truncated = candidate_count > limit;

	if truncated {
		candidates.truncate(limit);
	}

	(candidates, Backpressure { candidate_limit: limit, candidate_count, truncated })
}
