pub mod document;
pub mod error;
pub mod model;
pub mod search;
pub mod session;
pub mod store;
pub mod summary_cache;

use std::{future::Future, pin::Pin, sync::Arc};

use serde_json::Value;
use tokio_util::sync::CancellationToken;

pub use document::{Document, DocumentId, DocumentMeta, SummaryInput, SummaryRecord};
pub use error::{Error, Result};
pub use model::{ModelSession, ModelSessions};
pub use search::{
	MatchedField, ParsedQuery, Refinement, RequestedMode, ResultSet, ResultSource,
	ScoredCandidate, Scorer, SearchMode, SearchOutcome, SearchRequest,
};
pub use session::{
	SearchContext, SearchEvent, SearchProgress, SearchSession, SearchStatus, SessionStore,
};
pub use store::{KvStore, MemoryStore, StoreScope};
pub use summary_cache::SummaryCache;

use tabrank_config::{Config, LlmProviderConfig};
use tabrank_providers::{llm, summarize};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Source of open documents and their page text.
pub trait DocumentProvider
where
	Self: Send + Sync,
{
	fn list_documents(&self) -> BoxFuture<'_, Result<Vec<DocumentMeta>>>;

	/// Page text for one document. May be empty when the page cannot be read.
	fn document_text(&self, id: DocumentId) -> BoxFuture<'_, Result<String>>;
}

pub trait Summarizer
where
	Self: Send + Sync,
{
	fn summarize<'a>(
		&'a self,
		batch: &'a [SummaryInput],
	) -> BoxFuture<'a, Result<Vec<SummaryRecord>>>;
}

/// On-device or remote language model.
///
/// `Ok(None)` from either method means the model is unavailable; callers degrade instead of
/// failing.
pub trait LanguageModel
where
	Self: Send + Sync,
{
	fn create_session<'a>(
		&'a self,
		system_prompt: &'a str,
	) -> BoxFuture<'a, Result<Option<ModelSession>>>;

	fn prompt<'a>(
		&'a self,
		session: &'a ModelSession,
		text: &'a str,
		schema: Option<&'a Value>,
		cancel: &'a CancellationToken,
	) -> BoxFuture<'a, Result<Option<String>>>;
}

#[derive(Clone)]
pub struct Collaborators {
	pub documents: Arc<dyn DocumentProvider>,
	pub summarizer: Arc<dyn Summarizer>,
	pub model: Arc<dyn LanguageModel>,
	pub store: Arc<dyn KvStore>,
}

pub struct TabRankService {
	pub cfg: Config,
	pub collaborators: Collaborators,
	pub(crate) models: ModelSessions,
	pub(crate) summaries: SummaryCache,
	pub(crate) sessions: SessionStore,
}

/// Summarizer and language model backed by an OpenAI-compatible chat endpoint.
pub struct DefaultProviders {
	cfg: LlmProviderConfig,
}

impl Collaborators {
	pub fn new(
		documents: Arc<dyn DocumentProvider>,
		summarizer: Arc<dyn Summarizer>,
		model: Arc<dyn LanguageModel>,
		store: Arc<dyn KvStore>,
	) -> Self {
		Self { documents, summarizer, model, store }
	}
}

impl TabRankService {
	pub fn new(cfg: Config, documents: Arc<dyn DocumentProvider>, store: Arc<dyn KvStore>) -> Self {
		let providers = Arc::new(DefaultProviders::new(cfg.providers.llm.clone()));
		let collaborators = Collaborators::new(documents, providers.clone(), providers, store);

		Self::with_collaborators(cfg, collaborators)
	}

	pub fn with_collaborators(cfg: Config, collaborators: Collaborators) -> Self {
		let models = ModelSessions::new(collaborators.model.clone());
		let summaries = SummaryCache::new(collaborators.store.clone(), &cfg.cache);
		let sessions = SessionStore::new(collaborators.store.clone());

		Self { cfg, collaborators, models, summaries, sessions }
	}

	pub fn models(&self) -> &ModelSessions {
		&self.models
	}

	pub fn summary_cache(&self) -> &SummaryCache {
		&self.summaries
	}

	pub fn session_store(&self) -> &SessionStore {
		&self.sessions
	}
}

impl DefaultProviders {
	pub fn new(cfg: LlmProviderConfig) -> Self {
		Self { cfg }
	}
}

impl Summarizer for DefaultProviders {
	fn summarize<'a>(
		&'a self,
		batch: &'a [SummaryInput],
	) -> BoxFuture<'a, Result<Vec<SummaryRecord>>> {
		Box::pin(async move {
			let references: Vec<String> =
				(1..=batch.len()).map(|ordinal| format!("doc{ordinal}")).collect();
			let items: Vec<summarize::SummaryRequestItem<'_>> = batch
				.iter()
				.zip(&references)
				.map(|(input, reference)| summarize::SummaryRequestItem {
					reference,
					title: &input.title,
					url: &input.url,
					text: &input.text,
				})
				.collect();
			let summaries = summarize::summarize(&self.cfg, &items)
				.await
				.map_err(|err| Error::Summarization { message: err.to_string() })?;
			let mut out = Vec::with_capacity(summaries.len());

			for item in summaries {
				let Some(position) =
					references.iter().position(|reference| reference == item.reference.trim())
				else {
					continue;
				};

				out.push(SummaryRecord {
					id: batch[position].id,
					summary: item.summary,
					tags: item.tags,
				});
			}

			Ok(out)
		})
	}
}

impl LanguageModel for DefaultProviders {
	fn create_session<'a>(
		&'a self,
		system_prompt: &'a str,
	) -> BoxFuture<'a, Result<Option<ModelSession>>> {
		Box::pin(async move { Ok(Some(ModelSession::new(system_prompt))) })
	}

	fn prompt<'a>(
		&'a self,
		session: &'a ModelSession,
		text: &'a str,
		schema: Option<&'a Value>,
		cancel: &'a CancellationToken,
	) -> BoxFuture<'a, Result<Option<String>>> {
		Box::pin(async move {
			let messages = llm::build_messages(session.system_prompt(), text);

			tokio::select! {
				biased;

				_ = cancel.cancelled() => Err(Error::Cancelled),
				content = llm::complete(&self.cfg, &messages, schema) => Ok(Some(content?)),
			}
		})
	}
}
