use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
	Fts,
	Semantic,
	Hybrid,
}
impl Strategy {
	pub const ALL: [Self; 3] = [Self::Fts, Self::Semantic, Self::Hybrid];

	pub fn as_str(self) -> &'static str {
		match self {
			Self::Fts => "fts",
			Self::Semantic => "semantic",
			Self::Hybrid => "hybrid",
		}
	}

	pub fn uses_lexical(self) -> bool {
		matches!(self, Self::Fts | Self::Hybrid)
	}

	pub fn uses_semantic(self) -> bool {
		matches!(self, Self::Semantic | Self::Hybrid)
	}

	/// Semantic recall may fail without failing the request only when lexical recall carries it.
	pub fn semantic_is_optional(self) -> bool {
		matches!(self, Self::Hybrid)
	}
}
impl fmt::Display for Strategy {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}
impl FromStr for Strategy {
	type Err = UnknownStrategy;

	fn from_str(value: &str) -> Result<Self, Self::Err> {
		Self::ALL
			.into_iter()
			.find(|strategy| strategy.as_str() == value)
			.ok_or_else(|| UnknownStrategy { value: value.to_string() })
	}
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown strategy {value:?}.")]
pub struct UnknownStrategy {
	pub value: String,
}
