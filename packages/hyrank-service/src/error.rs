use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub type Result<T, E = Error> = std::result::Result<T, E>;

const BACKEND_SYNTAX_MARKERS: [&str; 5] =
	["fts5:", "syntax error", "unterminated", "malformed", "parse error"];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
	InvalidArgument,
	NotFound,
	DbError,
	IoError,
	ModelNotReady,
	Timeout,
	Internal,
}
impl ErrorCode {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::InvalidArgument => "INVALID_ARGUMENT",
			Self::NotFound => "NOT_FOUND",
			Self::DbError => "DB_ERROR",
			Self::IoError => "IO_ERROR",
			Self::ModelNotReady => "MODEL_NOT_READY",
			Self::Timeout => "TIMEOUT",
			Self::Internal => "INTERNAL",
		}
	}

	/// Transient classes a caller may retry. The engine itself never retries.
	pub fn retryable(self) -> bool {
		matches!(self, Self::DbError | Self::IoError | Self::ModelNotReady | Self::Timeout)
	}
}
impl fmt::Display for ErrorCode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetrievalOrigin {
	Lexical,
	Semantic,
}
impl RetrievalOrigin {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Lexical => "lexical",
			Self::Semantic => "semantic",
		}
	}
}
impl fmt::Display for RetrievalOrigin {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Failure reported by a retriever. It reaches callers unchanged.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[error("{code}: {message}")]
pub struct RetrievalError {
	pub code: ErrorCode,
	pub message: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub details: Option<Value>,
}
impl RetrievalError {
	pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
		Self { code, message: message.into(), details: None }
	}

	pub fn with_details(mut self, details: Value) -> Self {
		self.details = Some(details);

		self
	}

	pub fn invalid_argument(message: impl Into<String>) -> Self {
		Self::new(ErrorCode::InvalidArgument, message)
	}

	pub fn db_error(message: impl Into<String>) -> Self {
		Self::new(ErrorCode::DbError, message)
	}

	pub fn model_not_ready(message: impl Into<String>) -> Self {
		Self::new(ErrorCode::ModelNotReady, message)
	}

	/// Maps a raw full-text backend failure message onto an error code. Query syntax problems
	/// become `INVALID_ARGUMENT`, everything else `DB_ERROR`.
	pub fn from_backend_message(message: &str) -> Self {
		let lowered = message.to_lowercase();

		if BACKEND_SYNTAX_MARKERS.iter().any(|marker| lowered.contains(marker)) {
			Self::invalid_argument("Invalid fulltext query syntax")
				.with_details(serde_json::json!({ "cause": message }))
		} else {
			Self::db_error("Fulltext search failed")
		}
	}
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
	pub code: ErrorCode,
	pub message: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub details: Option<Value>,
	pub retryable: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid argument: {message}")]
	InvalidArgument { message: String, details: Option<Value> },
	#[error("The {origin} retriever failed: {error}")]
	Retrieval {
		origin: RetrievalOrigin,
		#[source]
		error: RetrievalError,
	},
}
impl Error {
	pub fn invalid_argument(message: impl Into<String>) -> Self {
		Self::InvalidArgument { message: message.into(), details: None }
	}

	pub fn invalid_argument_with(message: impl Into<String>, details: Value) -> Self {
		Self::InvalidArgument { message: message.into(), details: Some(details) }
	}

	pub fn code(&self) -> ErrorCode {
		match self {
			Self::InvalidArgument { .. } => ErrorCode::InvalidArgument,
			Self::Retrieval { error, .. } => error.code,
		}
	}

	pub fn envelope(&self) -> ErrorEnvelope {
		let code = self.code();
		let (message, details) = match self {
			Self::InvalidArgument { message, details } => (message.clone(), details.clone()),
			Self::Retrieval { error, .. } => (error.message.clone(), error.details.clone()),
		};

		ErrorEnvelope { code, message, details, retryable: code.retryable() }
	}
}
