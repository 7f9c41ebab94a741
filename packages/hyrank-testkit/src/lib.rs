mod error;

pub use error::{Error, Result};

use std::{
	collections::{BTreeMap, HashMap},
	fs,
	path::Path,
	sync::{Arc, Mutex},
	time::Duration,
};

use serde::{Deserialize, Serialize};

use hyrank_service::{
	BoxFuture, LexicalHit, LexicalPage, LexicalPageRequest, LexicalRetriever, RetrievalError,
	Retrievers, SemanticHit, SemanticHits, SemanticRetriever, SemanticSearchRequest,
};

/// In-memory lexical backend. Rows are stored per project in rank order.
#[derive(Debug, Default)]
pub struct FixtureLexicalRetriever {
	rows: HashMap<String, Vec<LexicalHit>>,
	failure: Option<RetrievalError>,
	delay: Option<Duration>,
	requests: Mutex<Vec<LexicalPageRequest>>,
}
impl FixtureLexicalRetriever {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_rows(mut self, project_id: &str, rows: Vec<LexicalHit>) -> Self {
		self.rows.insert(project_id.to_string(), rows);

		self
	}

	/// Every call fails with `error` after being recorded.
	pub fn failing(error: RetrievalError) -> Self {
		Self { failure: Some(error), ..Self::default() }
	}

	/// Each returned future sleeps for `delay` before it resolves.
	pub fn with_delay(mut self, delay: Duration) -> Self {
		self.delay = Some(delay);

		self
	}

	pub fn requests(&self) -> Vec<LexicalPageRequest> {
		self.requests.lock().unwrap_or_else(|err| err.into_inner()).clone()
	}

	fn page(&self, req: &LexicalPageRequest) -> LexicalPage {
		let rows = self.rows.get(&req.project_id).map(Vec::as_slice).unwrap_or_default();
		let total = rows.len();
		let start = (req.offset as usize).min(total);
		let end = start.saturating_add(req.limit as usize).min(total);

		LexicalPage {
			results: rows[start..end].to_vec(),
			total: total as u64,
			has_more: end < total,
		}
	}
}
impl LexicalRetriever for FixtureLexicalRetriever {
	fn fetch_page<'a>(
		&'a self,
		req: &'a LexicalPageRequest,
	) -> BoxFuture<'a, std::result::Result<LexicalPage, RetrievalError>> {
		self.requests.lock().unwrap_or_else(|err| err.into_inner()).push(req.clone());

		let result = match &self.failure {
			Some(error) => Err(error.clone()),
			None => Ok(self.page(req)),
		};

		Box::pin(delayed(self.delay, result))
	}
}

#[derive(Debug, Default)]
pub struct FixtureSemanticRetriever {
	items: HashMap<String, Vec<SemanticHit>>,
	failure: Option<RetrievalError>,
	delay: Option<Duration>,
	requests: Mutex<Vec<SemanticSearchRequest>>,
}
impl FixtureSemanticRetriever {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_items(mut self, project_id: &str, items: Vec<SemanticHit>) -> Self {
		self.items.insert(project_id.to_string(), items);

		self
	}

	pub fn failing(error: RetrievalError) -> Self {
		Self { failure: Some(error), ..Self::default() }
	}

	pub fn with_delay(mut self, delay: Duration) -> Self {
		self.delay = Some(delay);

		self
	}

	pub fn requests(&self) -> Vec<SemanticSearchRequest> {
		self.requests.lock().unwrap_or_else(|err| err.into_inner()).clone()
	}
}
impl SemanticRetriever for FixtureSemanticRetriever {
	fn search<'a>(
		&'a self,
		req: &'a SemanticSearchRequest,
	) -> BoxFuture<'a, std::result::Result<SemanticHits, RetrievalError>> {
		self.requests.lock().unwrap_or_else(|err| err.into_inner()).push(req.clone());

		let result = match &self.failure {
			Some(error) => Err(error.clone()),
			None => {
				let items = self.items.get(&req.project_id).map(Vec::as_slice).unwrap_or_default();

				Ok(SemanticHits { items: items.iter().take(req.limit as usize).cloned().collect() })
			},
		};

		Box::pin(delayed(self.delay, result))
	}
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectCorpus {
	#[serde(default)]
	pub lexical: Vec<LexicalHit>,
	#[serde(default)]
	pub semantic: Vec<SemanticHit>,
}

/// Canned retriever responses keyed by project id.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Corpus {
	#[serde(default)]
	pub projects: BTreeMap<String, ProjectCorpus>,
}
impl Corpus {
	pub fn lexical_retriever(&self) -> FixtureLexicalRetriever {
		self.projects.iter().fold(FixtureLexicalRetriever::new(), |retriever, (id, project)| {
			retriever.with_rows(id, project.lexical.clone())
		})
	}

	pub fn semantic_retriever(&self) -> FixtureSemanticRetriever {
		self.projects.iter().fold(FixtureSemanticRetriever::new(), |retriever, (id, project)| {
			retriever.with_items(id, project.semantic.clone())
		})
	}

	pub fn retrievers(&self) -> Retrievers {
		Retrievers::new(Arc::new(self.lexical_retriever()), Arc::new(self.semantic_retriever()))
	}
}

pub fn load_corpus(path: &Path) -> Result<Corpus> {
	let raw = fs::read_to_string(path)
		.map_err(|source| Error::Io { path: path.to_path_buf(), source })?;

	serde_json::from_str(&raw).map_err(|source| Error::Json { path: path.to_path_buf(), source })
}

async fn delayed<T>(delay: Option<Duration>, value: T) -> T {
	if let Some(delay) = delay {
		tokio::time::sleep(delay).await;
	}

	value
}

pub fn lexical_hit(document_id: &str, snippet: &str, score: f64, updated_at: i64) -> LexicalHit {
	LexicalHit {
		document_id: document_id.to_string(),
		snippet: snippet.to_string(),
		score,
		updated_at,
	}
}

pub fn semantic_hit(
	document_id: &str,
	chunk_id: &str,
	snippet: &str,
	score: f64,
	updated_at: i64,
) -> SemanticHit {
	SemanticHit {
		document_id: document_id.to_string(),
		chunk_id: chunk_id.to_string(),
		snippet: snippet.to_string(),
		score,
		updated_at,
	}
}
