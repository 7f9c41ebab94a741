mod recall;
mod validate;

use serde::{Deserialize, Serialize};

use crate::{ErrorCode, HybridRankingService, Result, RetrievalOrigin};
use hyrank_domain::{Backpressure, RankedItem, Strategy, paginate, rank_candidates};
use validate::{QueryInput, ValidatedQuery};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QueryByStrategyRequest {
	pub project_id: String,
	pub query: String,
	pub strategy: String,
	pub limit: Option<i64>,
	pub offset: Option<i64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QueryByStrategyResponse {
	pub strategy: Strategy,
	pub results: Vec<RankedItem>,
	pub total: usize,
	pub has_more: bool,
	pub backpressure: Backpressure,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub degradation: Option<Degradation>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RankExplainRequest {
	pub project_id: String,
	pub query: String,
	pub strategy: String,
	pub document_id: Option<String>,
	pub chunk_id: Option<String>,
	pub limit: Option<i64>,
	pub offset: Option<i64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RankExplainResponse {
	pub strategy: Strategy,
	pub explanations: Vec<RankedItem>,
	/// Post-threshold size of the full ranking, also when a single target was requested.
	pub total: usize,
	pub backpressure: Backpressure,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub degradation: Option<Degradation>,
}

/// An optional source that failed while the request still succeeded.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Degradation {
	pub source: RetrievalOrigin,
	pub code: ErrorCode,
	pub message: String,
}

struct RankedList {
	items: Vec<RankedItem>,
	backpressure: Backpressure,
	degradation: Option<Degradation>,
}

impl HybridRankingService {
	pub async fn query_by_strategy(
		&self,
		req: QueryByStrategyRequest,
	) -> Result<QueryByStrategyResponse> {
		let result = self.query_by_strategy_inner(&req).await;

		if let Err(err) = &result {
			tracing::error!(
				project_id = %req.project_id,
				code = err.code().as_str(),
				error = %err,
				"Query by strategy failed."
			);
		}

		result
	}

	pub async fn rank_explain(&self, req: RankExplainRequest) -> Result<RankExplainResponse> {
		let result = self.rank_explain_inner(&req).await;

		if let Err(err) = &result {
			tracing::error!(
				project_id = %req.project_id,
				code = err.code().as_str(),
				error = %err,
				"Rank explain failed."
			);
		}

		result
	}

	async fn query_by_strategy_inner(
		&self,
		req: &QueryByStrategyRequest,
	) -> Result<QueryByStrategyResponse> {
		let query = validate::validate_query(
			&self.cfg.search,
			QueryInput {
				project_id: &req.project_id,
				query: &req.query,
				strategy: &req.strategy,
				limit: req.limit,
				offset: req.offset,
			},
		)?;
		let ranked = self.build_ranking(&query).await?;
		let (page, window) = paginate(&ranked.items, query.offset, query.limit);

		tracing::info!(
			project_id = %query.project_id,
			strategy = query.strategy.as_str(),
			total = window.total,
			returned = page.len(),
			truncated = ranked.backpressure.truncated,
			degraded = ranked.degradation.is_some(),
			"Ranked query by strategy."
		);

		Ok(QueryByStrategyResponse {
			strategy: query.strategy,
			results: page.to_vec(),
			total: window.total,
			has_more: window.has_more(),
			backpressure: ranked.backpressure,
			degradation: ranked.degradation,
		})
	}

	async fn rank_explain_inner(&self, req: &RankExplainRequest) -> Result<RankExplainResponse> {
		let query = validate::validate_query(
			&self.cfg.search,
			QueryInput {
				project_id: &req.project_id,
				query: &req.query,
				strategy: &req.strategy,
				limit: req.limit,
				offset: req.offset,
			},
		)?;
		let target =
			validate::validate_explain_target(req.document_id.as_deref(), req.chunk_id.as_deref())?;
		let ranked = self.build_ranking(&query).await?;
		let total = ranked.items.len();
		let explanations: Vec<RankedItem> = match &target {
			Some(target) => ranked
				.items
				.iter()
				.find(|item| item.matches(&target.document_id, &target.chunk_id))
				.cloned()
				.into_iter()
				.collect(),
			None => paginate(&ranked.items, query.offset, query.limit).0.to_vec(),
		};

		tracing::info!(
			project_id = %query.project_id,
			strategy = query.strategy.as_str(),
			targeted = target.is_some(),
			total,
			returned = explanations.len(),
			truncated = ranked.backpressure.truncated,
			degraded = ranked.degradation.is_some(),
			"Ranked explain."
		);

		Ok(RankExplainResponse {
			strategy: query.strategy,
			explanations,
			total,
			backpressure: ranked.backpressure,
			degradation: ranked.degradation,
		})
	}

	/// Recall, guard, score, threshold and sort. Both entry points select from this list.
	async fn build_ranking(&self, query: &ValidatedQuery) -> Result<RankedList> {
		let recall = recall::recall(&self.retrievers, &self.cfg.search.recall, query).await?;
		let items = rank_candidates(&recall.candidates, &self.cfg.ranking);

		Ok(RankedList { items, backpressure: recall.backpressure, degradation: recall.degradation })
	}
}
