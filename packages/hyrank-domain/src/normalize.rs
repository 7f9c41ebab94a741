use crate::candidate::Candidate;

pub fn clamp01(value: f64) -> f64 {
	if !value.is_finite() {
		return 0.0;
	}

	value.clamp(0.0, 1.0)
}

/// Min-max normalization over the finite, positive lexical scores. The output is parallel to
/// `candidates`.
pub fn normalize_bm25(candidates: &[Candidate], epsilon: f64) -> Vec<f64> {
	let signals = candidates
		.iter()
		.map(|candidate| candidate.bm25_raw)
		.filter(|raw| has_lexical_signal(*raw));
	let Some((min, max)) = min_max(signals) else {
		return vec![0.0; candidates.len()];
	};
	let span = max - min;

	candidates
		.iter()
		.map(|candidate| {
			if !has_lexical_signal(candidate.bm25_raw) {
				0.0
			} else if span < epsilon {
				1.0
			} else {
				clamp01((candidate.bm25_raw - min) / span)
			}
		})
		.collect()
}

/// Min-max normalization of `updated_at` over every candidate. A degenerate span scores all
/// candidates 1.
pub fn normalize_recency(candidates: &[Candidate], epsilon: f64) -> Vec<f64> {
	let Some((min, max)) = min_max(candidates.iter().map(|candidate| candidate.updated_at as f64))
	else {
		return Vec::new();
	};
	let span = max - min;

	candidates
		.iter()
		.map(|candidate| {
			if span < epsilon { 1.0 } else { clamp01((candidate.updated_at as f64 - min) / span) }
		})
		.collect()
}

pub fn normalize_semantic(raw: f64) -> f64 {
	clamp01(raw)
}

fn has_lexical_signal(raw: f64) -> bool {
	raw.is_finite() && raw > 0.0
}

fn min_max<I>(values: I) -> Option<(f64, f64)>
where
	I: IntoIterator<Item = f64>,
{
	values.into_iter().fold(None, |acc, value| match acc {
		None => Some((value, value)),
		Some((min, max)) => Some((min.min(value), max.max(value))),
	})
}
