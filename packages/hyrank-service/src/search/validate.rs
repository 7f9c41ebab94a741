use serde_json::json;

use crate::{Error, Result};
use hyrank_config::Search;
use hyrank_domain::Strategy;

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct ValidatedQuery {
	pub(crate) project_id: String,
	pub(crate) query: String,
	pub(crate) strategy: Strategy,
	pub(crate) limit: usize,
	pub(crate) offset: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct ExplainTarget {
	pub(crate) document_id: String,
	pub(crate) chunk_id: String,
}

pub(crate) struct QueryInput<'a> {
	pub(crate) project_id: &'a str,
	pub(crate) query: &'a str,
	pub(crate) strategy: &'a str,
	pub(crate) limit: Option<i64>,
	pub(crate) offset: Option<i64>,
}

/// Checks run in a fixed order and stop at the first failure.
pub(crate) fn validate_query(cfg: &Search, input: QueryInput<'_>) -> Result<ValidatedQuery> {
	let project_id = input.project_id.trim();

	if project_id.is_empty() {
		return Err(Error::invalid_argument("project_id is required."));
	}

	let query = input.query.trim();

	if query.is_empty() {
		return Err(Error::invalid_argument("query is required."));
	}

	let strategy = input.strategy.parse::<Strategy>().map_err(|_| {
		Error::invalid_argument_with(
			"strategy must be one of fts, semantic, or hybrid.",
			json!({ "strategy": input.strategy }),
		)
	})?;

	// The length cap belongs to the full-text backend.
	if strategy.uses_lexical() && query.chars().count() > cfg.max_query_chars as usize {
		return Err(Error::invalid_argument_with(
			"query is too long.",
			json!({ "max_length": cfg.max_query_chars }),
		));
	}

	let limit = validate_limit(cfg, input.limit)?;
	let offset = validate_offset(input.offset)?;

	Ok(ValidatedQuery {
		project_id: project_id.to_string(),
		query: query.to_string(),
		strategy,
		limit,
		offset,
	})
}

/// A blank identifier counts as absent. Exactly one present is rejected.
pub(crate) fn validate_explain_target(
	document_id: Option<&str>,
	chunk_id: Option<&str>,
) -> Result<Option<ExplainTarget>> {
	let document_id = document_id.map(str::trim).filter(|value| !value.is_empty());
	let chunk_id = chunk_id.map(str::trim).filter(|value| !value.is_empty());

	match (document_id, chunk_id) {
		(Some(document_id), Some(chunk_id)) => Ok(Some(ExplainTarget {
			document_id: document_id.to_string(),
			chunk_id: chunk_id.to_string(),
		})),
		(None, None) => Ok(None),
		_ => Err(Error::invalid_argument("document_id and chunk_id must be provided together.")),
	}
}

fn validate_limit(cfg: &Search, limit: Option<i64>) -> Result<usize> {
	let Some(limit) = limit else {
		return Ok(cfg.default_page_size as usize);
	};

	if limit < 1 {
		return Err(Error::invalid_argument("limit must be a positive integer."));
	}
	if limit > i64::from(cfg.max_page_size) {
		return Err(Error::invalid_argument_with(
			format!("limit must be less than or equal to {}.", cfg.max_page_size),
			json!({ "max_limit": cfg.max_page_size }),
		));
	}

	Ok(limit as usize)
}

fn validate_offset(offset: Option<i64>) -> Result<usize> {
	match offset {
		None => Ok(0),
		Some(offset) if offset < 0 =>
			Err(Error::invalid_argument("offset must be a non-negative integer.")),
		Some(offset) => Ok(usize::try_from(offset).unwrap_or(usize::MAX)),
	}
}
