use std::{
	collections::HashSet,
	fs, io,
	path::{Path, PathBuf},
	time::Instant,
};

use clap::{
	Parser,
	builder::{
		Styles,
		styling::{AnsiColor, Effects},
	},
};
use color_eyre::eyre;
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

use hyrank_config::Config;
use hyrank_domain::{Backpressure, ranking_policy_id};
use hyrank_service::{
	Degradation, HybridRankingService, QueryByStrategyRequest, QueryByStrategyResponse,
	RankExplainRequest,
};

const DEFAULT_STRATEGY: &str = "hybrid";

#[derive(Debug, Parser)]
#[command(version, rename_all = "kebab", styles = styles())]
pub struct Args {
	/// JSON corpus with the canned retriever responses.
	#[arg(long, value_name = "FILE")]
	pub corpus: PathBuf,
	#[arg(long, short = 'd', value_name = "FILE")]
	pub dataset: PathBuf,
	/// Engine configuration. Built-in defaults apply when omitted.
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: Option<PathBuf>,
	#[arg(long, value_name = "N")]
	pub limit: Option<u32>,
	#[arg(long, value_name = "N", default_value_t = 1)]
	pub runs_per_query: u32,
}

#[derive(Debug, Deserialize)]
struct EvalDataset {
	name: Option<String>,
	defaults: Option<EvalDefaults>,
	queries: Vec<EvalQuery>,
}

#[derive(Debug, Default, Deserialize, Clone)]
struct EvalDefaults {
	project_id: Option<String>,
	strategy: Option<String>,
	limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct EvalQuery {
	id: Option<String>,
	query: String,
	project_id: Option<String>,
	strategy: Option<String>,
	limit: Option<u32>,
	expected_document_ids: Vec<String>,
}

#[derive(Debug, Serialize)]
struct EvalOutput {
	dataset: EvalDatasetInfo,
	settings: EvalSettings,
	summary: EvalSummary,
	queries: Vec<QueryReport>,
}

#[derive(Debug, Serialize)]
struct EvalDatasetInfo {
	name: String,
	query_count: usize,
}

#[derive(Debug, Serialize)]
struct EvalSettings {
	corpus_path: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	config_path: Option<String>,
	ranking_policy_id: String,
	runs_per_query: u32,
}

#[derive(Debug, Serialize)]
struct EvalSummary {
	avg_recall_at_k: f64,
	avg_precision_at_k: f64,
	mean_rr: f64,
	mean_ndcg: f64,
	latency_ms_p50: f64,
	latency_ms_p95: f64,
	truncated_queries: usize,
	degraded_queries: usize,
	explain_mismatches: usize,
	#[serde(skip_serializing_if = "Option::is_none")]
	stability: Option<StabilitySummary>,
}

#[derive(Debug, Serialize)]
struct StabilitySummary {
	runs_per_query: u32,
	avg_positional_churn_at_k: f64,
	avg_set_churn_at_k: f64,
}

#[derive(Debug, Serialize)]
struct QueryReport {
	id: String,
	query: String,
	project_id: String,
	strategy: String,
	limit: u32,
	total: usize,
	expected_count: usize,
	retrieved_count: usize,
	relevant_count: usize,
	recall_at_k: f64,
	precision_at_k: f64,
	rr: f64,
	ndcg: f64,
	latency_ms: f64,
	expected_document_ids: Vec<String>,
	retrieved_document_ids: Vec<String>,
	backpressure: Backpressure,
	#[serde(skip_serializing_if = "Option::is_none")]
	degradation: Option<Degradation>,
	/// Absent when the query ranked nothing to explain.
	#[serde(skip_serializing_if = "Option::is_none")]
	explain_consistent: Option<bool>,
	#[serde(skip_serializing_if = "Option::is_none")]
	stability: Option<QueryStability>,
}

#[derive(Debug, Serialize, Clone, Copy)]
struct QueryStability {
	runs_per_query: u32,
	positional_churn_at_k: f64,
	set_churn_at_k: f64,
}

struct MergedQuery {
	id: String,
	expected_document_ids: Vec<String>,
	request: QueryByStrategyRequest,
}

#[derive(Debug, PartialEq)]
struct Metrics {
	recall_at_k: f64,
	precision_at_k: f64,
	rr: f64,
	ndcg: f64,
	relevant_count: usize,
}

struct QueryRuns {
	first: QueryByStrategyResponse,
	latency_ms: f64,
	stability: Option<QueryStability>,
}

pub fn styles() -> Styles {
	Styles::styled()
		.header(AnsiColor::Red.on_default() | Effects::BOLD)
		.usage(AnsiColor::Red.on_default() | Effects::BOLD)
		.literal(AnsiColor::Blue.on_default() | Effects::BOLD)
		.placeholder(AnsiColor::Green.on_default())
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let cfg = match &args.config {
		Some(path) => hyrank_config::load(path)?,
		None => Config::default(),
	};
	let filter =
		EnvFilter::try_new(&cfg.service.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

	// Stdout carries the report.
	tracing_subscriber::fmt().with_env_filter(filter).with_writer(io::stderr).init();

	let corpus = hyrank_testkit::load_corpus(&args.corpus)?;
	let dataset = load_dataset(&args.dataset)?;
	let service = HybridRankingService::with_retrievers(cfg, corpus.retrievers());
	let output = eval_dataset(&service, &dataset, &args).await?;
	let json = serde_json::to_string_pretty(&output)?;

	println!("{json}");

	Ok(())
}

fn load_dataset(path: &Path) -> color_eyre::Result<EvalDataset> {
	let raw = fs::read_to_string(path)?;
	let dataset: EvalDataset = serde_json::from_str(&raw)?;

	if dataset.queries.is_empty() {
		return Err(eyre::eyre!("Dataset must include at least one query."));
	}

	Ok(dataset)
}

async fn eval_dataset(
	service: &HybridRankingService,
	dataset: &EvalDataset,
	args: &Args,
) -> color_eyre::Result<EvalOutput> {
	let defaults = dataset.defaults.clone().unwrap_or_default();
	let runs_per_query = args.runs_per_query.max(1);
	let mut reports = Vec::with_capacity(dataset.queries.len());
	let mut latencies_ms = Vec::with_capacity(dataset.queries.len());

	for (index, query) in dataset.queries.iter().enumerate() {
		let merged = merge_query(&defaults, query, args, &service.cfg, index)?;
		let limit = merged.request.limit.unwrap_or_default().max(1) as u32;
		let runs = run_query_n_times(service, &merged.request, runs_per_query).await?;
		let explain_consistent = check_explain(service, &merged.request, &runs.first).await?;
		let expected: HashSet<&str> =
			merged.expected_document_ids.iter().map(String::as_str).collect();
		let retrieved = unique_document_ids(&runs.first);
		let metrics = compute_metrics(&retrieved, &expected);
		let expected_count = expected.len();

		tracing::info!(
			query_id = %merged.id,
			total = runs.first.total,
			recall_at_k = metrics.recall_at_k,
			latency_ms = runs.latency_ms,
			"Evaluated query."
		);

		latencies_ms.push(runs.latency_ms);
		reports.push(QueryReport {
			id: merged.id,
			query: merged.request.query,
			project_id: merged.request.project_id,
			strategy: merged.request.strategy,
			limit,
			total: runs.first.total,
			expected_count,
			retrieved_count: retrieved.len(),
			relevant_count: metrics.relevant_count,
			recall_at_k: metrics.recall_at_k,
			precision_at_k: metrics.precision_at_k,
			rr: metrics.rr,
			ndcg: metrics.ndcg,
			latency_ms: runs.latency_ms,
			expected_document_ids: merged.expected_document_ids,
			retrieved_document_ids: retrieved,
			backpressure: runs.first.backpressure,
			degradation: runs.first.degradation,
			explain_consistent,
			stability: runs.stability,
		});
	}

	let mut summary = summarize(&reports, &latencies_ms);

	if runs_per_query > 1 {
		let churn: Vec<QueryStability> =
			reports.iter().filter_map(|report| report.stability).collect();
		let count = churn.len().max(1) as f64;

		summary.stability = Some(StabilitySummary {
			runs_per_query,
			avg_positional_churn_at_k: churn.iter().map(|s| s.positional_churn_at_k).sum::<f64>()
				/ count,
			avg_set_churn_at_k: churn.iter().map(|s| s.set_churn_at_k).sum::<f64>() / count,
		});
	}

	Ok(EvalOutput {
		dataset: EvalDatasetInfo {
			name: dataset.name.clone().unwrap_or_else(|| "eval".to_string()),
			query_count: reports.len(),
		},
		settings: EvalSettings {
			corpus_path: args.corpus.display().to_string(),
			config_path: args.config.as_ref().map(|path| path.display().to_string()),
			ranking_policy_id: ranking_policy_id(&service.cfg.ranking),
			runs_per_query,
		},
		summary,
		queries: reports,
	})
}

fn merge_query(
	defaults: &EvalDefaults,
	query: &EvalQuery,
	args: &Args,
	cfg: &Config,
	index: usize,
) -> color_eyre::Result<MergedQuery> {
	if query.expected_document_ids.is_empty() {
		return Err(eyre::eyre!(
			"Query at index {index} must include at least one expected_document_id."
		));
	}

	let project_id = query
		.project_id
		.clone()
		.or_else(|| defaults.project_id.clone())
		.ok_or_else(|| eyre::eyre!("project_id is required for query at index {index}."))?;
	let strategy = query
		.strategy
		.clone()
		.or_else(|| defaults.strategy.clone())
		.unwrap_or_else(|| DEFAULT_STRATEGY.to_string());
	let limit = args
		.limit
		.or(query.limit)
		.or(defaults.limit)
		.unwrap_or(cfg.search.default_page_size)
		.min(cfg.search.max_page_size)
		.max(1);

	Ok(MergedQuery {
		id: query.id.clone().unwrap_or_else(|| format!("query-{index}")),
		expected_document_ids: query.expected_document_ids.clone(),
		request: QueryByStrategyRequest {
			project_id,
			query: query.query.clone(),
			strategy,
			limit: Some(i64::from(limit)),
			offset: None,
		},
	})
}

async fn run_query_n_times(
	service: &HybridRankingService,
	request: &QueryByStrategyRequest,
	runs_per_query: u32,
) -> color_eyre::Result<QueryRuns> {
	let k = request.limit.unwrap_or(1).max(1) as usize;
	let runs = runs_per_query.max(1);
	let mut first_response: Option<QueryByStrategyResponse> = None;
	let mut first_retrieved: Vec<String> = Vec::new();
	let mut latency_total_ms = 0.0_f64;
	let mut positional_churn_sum = 0.0_f64;
	let mut set_churn_sum = 0.0_f64;
	let mut churn_count = 0_u32;

	for run_idx in 0..runs {
		let start = Instant::now();
		let response = service.query_by_strategy(request.clone()).await?;

		latency_total_ms += start.elapsed().as_secs_f64() * 1_000.0;

		let retrieved = unique_document_ids(&response);

		if run_idx == 0 {
			first_retrieved = retrieved;
			first_response = Some(response);

			continue;
		}

		let (positional, set) = churn_against_baseline_at_k(&first_retrieved, &retrieved, k);

		positional_churn_sum += positional;
		set_churn_sum += set;
		churn_count += 1;
	}

	let stability = (churn_count > 0).then(|| QueryStability {
		runs_per_query: runs,
		positional_churn_at_k: positional_churn_sum / churn_count as f64,
		set_churn_at_k: set_churn_sum / churn_count as f64,
	});
	let first =
		first_response.ok_or_else(|| eyre::eyre!("No query responses were collected."))?;

	Ok(QueryRuns { first, latency_ms: latency_total_ms / runs as f64, stability })
}

/// Explains the top result and checks it reproduces the listed item exactly.
async fn check_explain(
	service: &HybridRankingService,
	request: &QueryByStrategyRequest,
	response: &QueryByStrategyResponse,
) -> color_eyre::Result<Option<bool>> {
	let Some(top) = response.results.first() else {
		return Ok(None);
	};
	let explained = service
		.rank_explain(RankExplainRequest {
			project_id: request.project_id.clone(),
			query: request.query.clone(),
			strategy: request.strategy.clone(),
			document_id: Some(top.document_id.clone()),
			chunk_id: Some(top.chunk_id.clone()),
			limit: None,
			offset: None,
		})
		.await?;
	let consistent = explained.total == response.total
		&& explained.explanations.len() == 1
		&& explained.explanations[0] == *top;

	if !consistent {
		tracing::warn!(
			document_id = %top.document_id,
			chunk_id = %top.chunk_id,
			"Explain does not reproduce the listed result."
		);
	}

	Ok(Some(consistent))
}

fn unique_document_ids(response: &QueryByStrategyResponse) -> Vec<String> {
	let mut seen = HashSet::new();
	let mut out = Vec::new();

	for item in &response.results {
		if seen.insert(item.document_id.as_str()) {
			out.push(item.document_id.clone());
		}
	}

	out
}

fn churn_against_baseline_at_k(baseline: &[String], other: &[String], k: usize) -> (f64, f64) {
	let k = k.max(1);
	let positional_diff = (0..k).filter(|&idx| baseline.get(idx) != other.get(idx)).count();
	let positional_churn = positional_diff as f64 / k as f64;
	let base_set: HashSet<&String> = baseline.iter().take(k).collect();
	let other_set: HashSet<&String> = other.iter().take(k).collect();
	let overlap = base_set.intersection(&other_set).count();
	let set_churn = 1.0 - (overlap as f64 / k as f64);

	(positional_churn, set_churn)
}

fn compute_metrics(retrieved: &[String], expected: &HashSet<&str>) -> Metrics {
	let expected_count = expected.len();
	let mut relevant_count = 0_usize;
	let mut dcg = 0.0_f64;
	let mut first_hit: Option<usize> = None;

	for (idx, id) in retrieved.iter().enumerate() {
		if expected.contains(id.as_str()) {
			let rank = idx + 1;

			relevant_count += 1;
			dcg += 1.0 / (rank as f64 + 1.0).log2();
			first_hit.get_or_insert(rank);
		}
	}

	let ideal_hits = expected_count.min(retrieved.len());
	let idcg: f64 = (1..=ideal_hits).map(|rank| 1.0 / (rank as f64 + 1.0).log2()).sum();
	let rr = first_hit.map(|rank| 1.0 / rank as f64).unwrap_or(0.0);
	let ndcg = if idcg > 0.0 { dcg / idcg } else { 0.0 };
	let precision_at_k =
		if retrieved.is_empty() { 0.0 } else { relevant_count as f64 / retrieved.len() as f64 };
	let recall_at_k =
		if expected_count == 0 { 0.0 } else { relevant_count as f64 / expected_count as f64 };

	Metrics { recall_at_k, precision_at_k, rr, ndcg, relevant_count }
}

fn summarize(reports: &[QueryReport], latencies_ms: &[f64]) -> EvalSummary {
	let count = reports.len().max(1) as f64;
	let avg_recall_at_k = reports.iter().map(|r| r.recall_at_k).sum::<f64>() / count;
	let avg_precision_at_k = reports.iter().map(|r| r.precision_at_k).sum::<f64>() / count;
	let mean_rr = reports.iter().map(|r| r.rr).sum::<f64>() / count;
	let mean_ndcg = reports.iter().map(|r| r.ndcg).sum::<f64>() / count;
	let mut sorted = latencies_ms.to_vec();

	sorted.sort_by(|a, b| a.total_cmp(b));

	EvalSummary {
		avg_recall_at_k,
		avg_precision_at_k,
		mean_rr,
		mean_ndcg,
		latency_ms_p50: percentile(&sorted, 0.50),
		latency_ms_p95: percentile(&sorted, 0.95),
		truncated_queries: reports.iter().filter(|r| r.backpressure.truncated).count(),
		degraded_queries: reports.iter().filter(|r| r.degradation.is_some()).count(),
		explain_mismatches: reports.iter().filter(|r| r.explain_consistent == Some(false)).count(),
		stability: None,
	}
}

/// Linear interpolation between closest ranks. `values` must be sorted.
fn percentile(values: &[f64], percentile: f64) -> f64 {
	if values.is_empty() {
		return 0.0;
	}

	let pos = percentile.clamp(0.0, 1.0) * (values.len() as f64 - 1.0);
	let lower = pos.floor() as usize;
	let upper = pos.ceil() as usize;

	if lower == upper {
		values[lower]
	} else {
		let weight = pos - lower as f64;

		values[lower] * (1.0 - weight) + values[upper] * weight
	}
}
