use crate::{
	Error, LexicalHit, LexicalPageRequest, LexicalRetriever, Result, RetrievalError,
	RetrievalOrigin, Retrievers, SemanticHit, SemanticSearchRequest,
	search::{Degradation, validate::ValidatedQuery},
};
use hyrank_config::SearchRecall;
use hyrank_domain::{Backpressure, Candidate, CandidatePool, apply_candidate_limit};

pub(crate) struct Recall {
	pub(crate) candidates: Vec<Candidate>,
	pub(crate) backpressure: Backpressure,
	pub(crate) degradation: Option<Degradation>,
}

/// Fetches every source the strategy needs, merges same-key hits, and applies the candidate
/// ceiling.
pub(crate) async fn recall(
	retrievers: &Retrievers,
	cfg: &SearchRecall,
	query: &ValidatedQuery,
) -> Result<Recall> {
	let strategy = query.strategy;
	let lexical = async {
		if strategy.uses_lexical() {
			fetch_lexical(retrievers.lexical.as_ref(), cfg, query).await.map(Some)
		} else {
			Ok(None)
		}
	};
	let semantic = async {
		if strategy.uses_semantic() {
			let req = SemanticSearchRequest {
				project_id: query.project_id.clone(),
				query: query.query.clone(),
				limit: cfg.semantic_recall_limit,
			};

			Some(retrievers.semantic.search(&req).await)
		} else {
			None
		}
	};
	let (lexical, semantic) = tokio::join!(lexical, semantic);
	let lexical_hits = lexical
		.map_err(|error| Error::Retrieval { origin: RetrievalOrigin::Lexical, error })?
		.unwrap_or_default();
	let mut degradation = None;
	let semantic_hits = match semantic {
		Some(Ok(hits)) => hits.items,
		Some(Err(error)) if strategy.semantic_is_optional() => {
			tracing::info!(
				project_id = %query.project_id,
				reason = error.code.as_str(),
				error = %error,
				"Hybrid semantic retrieval degraded."
			);

			degradation = Some(Degradation {
				source: RetrievalOrigin::Semantic,
				code: error.code,
				message: error.message,
			});

			Vec::new()
		},
		Some(Err(error)) =>
			return Err(Error::Retrieval { origin: RetrievalOrigin::Semantic, error }),
		None => Vec::new(),
	};
	let lexical_count = lexical_hits.len();
	let semantic_count = semantic_hits.len();
	let candidates = merge(lexical_hits, semantic_hits);

	tracing::debug!(
		project_id = %query.project_id,
		strategy = strategy.as_str(),
		lexical_count,
		semantic_count,
		merged_count = candidates.len(),
		"Recall completed."
	);

	let (candidates, backpressure) =
		apply_candidate_limit(candidates, cfg.candidate_limit as usize);

	if backpressure.truncated {
		tracing::warn!(
			project_id = %query.project_id,
			candidate_count = backpressure.candidate_count,
			candidate_limit = backpressure.candidate_limit,
			"Candidate set truncated by backpressure ceiling."
		);
	}

	Ok(Recall { candidates, backpressure, degradation })
}

/// Lexical hits go in first, in page order, so the merge order never depends on which fetch
/// finished first.
fn merge(lexical: Vec<LexicalHit>, semantic: Vec<SemanticHit>) -> Vec<Candidate> {
	let mut pool = CandidatePool::with_capacity(lexical.len() + semantic.len());

	pool.extend(lexical.into_iter().map(|hit| {
		Candidate::lexical(&hit.document_id, &hit.snippet, hit.updated_at, hit.score)
	}));
	pool.extend(semantic.into_iter().map(|hit| {
		Candidate::semantic(
			&hit.document_id,
			&hit.chunk_id,
			&hit.snippet,
			hit.updated_at,
			hit.score,
		)
	}));

	pool.into_candidates()
}

/// At most two sequential pages: the second only when the first reported more rows and the
/// recall ceiling is not yet reached.
async fn fetch_lexical(
	retriever: &dyn LexicalRetriever,
	cfg: &SearchRecall,
	query: &ValidatedQuery,
) -> std::result::Result<Vec<LexicalHit>, RetrievalError> {
	let first_req = LexicalPageRequest {
		project_id: query.project_id.clone(),
		query: query.query.clone(),
		limit: cfg.fts_page_limit.min(cfg.fts_recall_limit),
		offset: 0,
	};
	let first = retriever.fetch_page(&first_req).await?;
	let mut hits = first.results;

	if first.has_more && hits.len() < cfg.fts_recall_limit as usize {
		let fetched = hits.len() as u32;
		let second_req = LexicalPageRequest {
			limit: cfg.fts_page_limit.min(cfg.fts_recall_limit - fetched),
			offset: fetched,
			..first_req
		};
		let second = retriever.fetch_page(&second_req).await?;

		hits.extend(second.results);
	}

	Ok(hits)
}
