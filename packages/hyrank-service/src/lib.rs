pub mod error;
pub mod retrieval;
pub mod search;

pub use error::{Error, ErrorCode, ErrorEnvelope, Result, RetrievalError, RetrievalOrigin};
pub use retrieval::{
	LexicalHit, LexicalPage, LexicalPageRequest, SemanticHit, SemanticHits, SemanticSearchRequest,
};
pub use search::{
	Degradation, QueryByStrategyRequest, QueryByStrategyResponse, RankExplainRequest,
	RankExplainResponse,
};

use std::{future::Future, pin::Pin, sync::Arc};

use hyrank_config::Config;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait LexicalRetriever
where
	Self: Send + Sync,
{
	fn fetch_page<'a>(
		&'a self,
		req: &'a LexicalPageRequest,
	) -> BoxFuture<'a, Result<LexicalPage, RetrievalError>>;
}

pub trait SemanticRetriever
where
	Self: Send + Sync,
{
	fn search<'a>(
		&'a self,
		req: &'a SemanticSearchRequest,
	) -> BoxFuture<'a, Result<SemanticHits, RetrievalError>>;
}

/// Semantic retriever for deployments without an embedding index.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSemanticRetriever;
impl SemanticRetriever for NoopSemanticRetriever {
	fn search<'a>(
		&'a self,
		_: &'a SemanticSearchRequest,
	) -> BoxFuture<'a, Result<SemanticHits, RetrievalError>> {
		Box::pin(async { Ok(SemanticHits::default()) })
	}
}

#[derive(Clone)]
pub struct Retrievers {
	pub lexical: Arc<dyn LexicalRetriever>,
	pub semantic: Arc<dyn SemanticRetriever>,
}
impl Retrievers {
	pub fn new(lexical: Arc<dyn LexicalRetriever>, semantic: Arc<dyn SemanticRetriever>) -> Self {
		Self { lexical, semantic }
	}

	pub fn lexical_only(lexical: Arc<dyn LexicalRetriever>) -> Self {
		Self { lexical, semantic: Arc::new(NoopSemanticRetriever) }
	}
}

pub struct HybridRankingService {
	pub cfg: Config,
	pub retrievers: Retrievers,
}
impl HybridRankingService {
	pub fn new(cfg: Config, lexical: Arc<dyn LexicalRetriever>) -> Self {
		Self { cfg, retrievers: Retrievers::lexical_only(lexical) }
	}

	pub fn with_retrievers(cfg: Config, retrievers: Retrievers) -> Self {
		Self { cfg, retrievers }
	}
}
