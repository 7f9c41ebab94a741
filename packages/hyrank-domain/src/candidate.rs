use std::collections::HashMap;

/// Lexical hits carry no chunk identity, so they are keyed under a synthetic chunk id that
/// semantic retrievers can emit to join the same passage.
pub fn lexical_chunk_id(document_id: &str) -> String {
	format!("fts:{document_id}:0")
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CandidateKey {
	pub document_id: String,
	pub chunk_id: String,
}
impl CandidateKey {
	pub fn new(document_id: impl Into<String>, chunk_id: impl Into<String>) -> Self {
		Self { document_id: document_id.into(), chunk_id: chunk_id.into() }
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct Candidate {
	pub document_id: String,
	pub chunk_id: String,
	pub snippet: String,
	pub updated_at: i64,
	pub bm25_raw: f64,
	pub semantic_raw: f64,
}
impl Candidate {
	pub fn lexical(document_id: &str, snippet: &str, updated_at: i64, score: f64) -> Self {
		Self {
			document_id: document_id.to_string(),
			chunk_id: lexical_chunk_id(document_id),
			snippet: snippet.to_string(),
			updated_at,
			bm25_raw: score,
			semantic_raw: 0.0,
		}
	}

	pub fn semantic(
		document_id: &str,
		chunk_id: &str,
		snippet: &str,
		updated_at: i64,
		score: f64,
	) -> Self {
		Self {
			document_id: document_id.to_string(),
			chunk_id: chunk_id.to_string(),
			snippet: snippet.to_string(),
			updated_at,
			bm25_raw: 0.0,
			semantic_raw: score,
		}
	}

	pub fn key(&self) -> CandidateKey {
		CandidateKey::new(self.document_id.as_str(), self.chunk_id.as_str())
	}

	/// Folds a same-key candidate into this one. Every signal keeps its maximum.
	fn absorb(&mut self, other: Candidate) {
		if other.snippet.chars().count() > self.snippet.chars().count() {
			self.snippet = other.snippet;
		}

		self.updated_at = self.updated_at.max(other.updated_at);
		self.bm25_raw = self.bm25_raw.max(other.bm25_raw);
		self.semantic_raw = self.semantic_raw.max(other.semantic_raw);
	}
}

/// Insertion-ordered merge map.
#[derive(Debug, Default)]
pub struct CandidatePool {
	candidates: Vec<Candidate>,
	index: HashMap<CandidateKey, usize>,
}
impl CandidatePool {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_capacity(capacity: usize) -> Self {
		Self { candidates: Vec::with_capacity(capacity), index: HashMap::with_capacity(capacity) }
	}

	/// Returns `true` when the candidate opened a new key.
	pub fn upsert(&mut self, candidate: Candidate) -> bool {
		let key = candidate.key();

		match self.index.get(&key) {
			Some(&position) => {
				self.candidates[position].absorb(candidate);

				false
			},
			None => {
				self.index.insert(key, self.candidates.len());
				self.candidates.push(candidate);

				true
			},
		}
	}

	pub fn extend<I>(&mut self, candidates: I)
	where
		I: IntoIterator<Item = Candidate>,
	{
		for candidate in candidates {
			self.upsert(candidate);
		}
	}

	pub fn get(&self, key: &CandidateKey) -> Option<&Candidate> {
		self.index.get(key).map(|&position| &self.candidates[position])
	}

	pub fn len(&self) -> usize {
		self.candidates.len()
	}

	pub fn is_empty(&self) -> bool {
		self.candidates.is_empty()
	}

	pub fn into_candidates(self) -> Vec<Candidate> {
		self.candidates
	}
}
