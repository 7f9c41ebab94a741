mod error;
mod types;

pub use error::{Error, Result};
pub use types::{Config, Ranking, RankingWeights, Search, SearchRecall, Service};

use std::{fs, path::Path};

const WEIGHT_SUM_TOLERANCE: f64 = 1e-9;
const MAX_ROUND_DIGITS: u32 = 12;

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	parse(&raw).map_err(|err| match err {
		Error::ParseConfig { source, .. } =>
			Error::ParseConfig { path: path.to_path_buf(), source },
		other => other,
	})
}

pub fn parse(raw: &str) -> Result<Config> {
	let mut cfg: Config = toml::from_str(raw)
		.map_err(|err| Error::ParseConfig { path: Default::default(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.log_level.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.log_level must be non-empty.".to_string(),
		});
	}

	validate_search(cfg)?;
	validate_ranking(cfg)?;

	Ok(())
}

fn validate_search(cfg: &Config) -> Result<()> {
	let search = &cfg.search;

	if search.default_page_size == 0 {
		return Err(Error::Validation {
			message: "search.default_page_size must be greater than zero.".to_string(),
		});
	}
	if search.max_page_size == 0 {
		return Err(Error::Validation {
			message: "search.max_page_size must be greater than zero.".to_string(),
		});
	}
	if search.default_page_size > search.max_page_size {
		return Err(Error::Validation {
			message: "search.default_page_size must be less than or equal to search.max_page_size."
				.to_string(),
		});
	}
	if search.max_query_chars == 0 {
		return Err(Error::Validation {
			message: "search.max_query_chars must be greater than zero.".to_string(),
		});
	}

	for (label, value) in [
		("search.recall.fts_page_limit", search.recall.fts_page_limit),
		("search.recall.fts_recall_limit", search.recall.fts_recall_limit),
		("search.recall.semantic_recall_limit", search.recall.semantic_recall_limit),
		("search.recall.candidate_limit", search.recall.candidate_limit),
	] {
		if value == 0 {
			return Err(Error::Validation {
				message: format!("{label} must be greater than zero."),
			});
		}
	}

	Ok(())
}

fn validate_ranking(cfg: &Config) -> Result<()> {
	let ranking = &cfg.ranking;

	for (label, weight) in [
		("ranking.weights.bm25", ranking.weights.bm25),
		("ranking.weights.semantic", ranking.weights.semantic),
		("ranking.weights.recency", ranking.weights.recency),
	] {
		if !weight.is_finite() {
			return Err(Error::Validation { message: format!("{label} must be a finite number.") });
		}
		if !(0.0..=1.0).contains(&weight) {
			return Err(Error::Validation {
				message: format!("{label} must be in the range 0.0-1.0."),
			});
		}
	}

	if (ranking.weights.sum() - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
		return Err(Error::Validation {
			message: "ranking.weights must sum to 1.0.".to_string(),
		});
	}
	if !ranking.score_threshold.is_finite() {
		return Err(Error::Validation {
			message: "ranking.score_threshold must be a finite number.".to_string(),
		});
	}
	if !(0.0..=1.0).contains(&ranking.score_threshold) {
		return Err(Error::Validation {
			message: "ranking.score_threshold must be in the range 0.0-1.0.".to_string(),
		});
	}
	if ranking.round_digits == 0 || ranking.round_digits > MAX_ROUND_DIGITS {
		return Err(Error::Validation {
			message: format!("ranking.round_digits must be between 1 and {MAX_ROUND_DIGITS}."),
		});
	}
	if !ranking.epsilon.is_finite() || ranking.epsilon <= 0.0 {
		return Err(Error::Validation {
			message: "ranking.epsilon must be a finite number greater than zero.".to_string(),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	if cfg.service.log_level.trim().is_empty() {
		cfg.service.log_level = Service::default().log_level;
	}
}
