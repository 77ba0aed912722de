pub mod lexical;
pub mod progressive;
pub mod reconcile;
pub mod semantic;
pub mod tag;
pub mod validation;

use std::{
	collections::{BTreeSet, HashMap},
	fmt,
	str::FromStr,
	sync::Arc,
};

use futures::future;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::{
	BoxFuture, Document, DocumentId, DocumentMeta, Error, Result, SummaryInput, SummaryRecord,
	TabRankService,
	session::{EventSink, SearchContext, SearchEvent, SearchSession, SearchStatus},
};
use lexical::LexicalScorer;
use semantic::SemanticScorer;
use tabrank_config::Config;
use tabrank_domain::{
	hashtag::{self, HashtagQuery},
	keywords,
};
use tag::TagScorer;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultSource {
	/// Keyword-class results, including tag search.
	#[default]
	Lexical,
	Semantic,
}
impl ResultSource {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Lexical => "lexical",
			Self::Semantic => "semantic",
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchedField {
	Title,
	Tags,
	Summary,
	Content,
	Url,
}
impl MatchedField {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Title => "title",
			Self::Tags => "tags",
			Self::Summary => "summary",
			Self::Content => "content",
			Self::Url => "url",
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredCandidate {
	pub id: DocumentId,
	pub score: f32,
	pub matched_fields: BTreeSet<MatchedField>,
	pub matched_terms: Vec<String>,
	pub reason: String,
	pub source: ResultSource,
}

/// Ranked, duplicate-free document ids with per-id reasons and scores.
///
/// The order of `ids` is the relevance rank and is never re-sorted downstream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultSet {
	ids: Vec<DocumentId>,
	reasons: HashMap<DocumentId, String>,
	scores: HashMap<DocumentId, f32>,
	source: ResultSource,
}
impl ResultSet {
	pub fn new(source: ResultSource) -> Self {
		Self { source, ..Self::default() }
	}

	/// Builds a set in candidate order. Later duplicates of an id are ignored.
	pub fn from_candidates(candidates: Vec<ScoredCandidate>, source: ResultSource) -> Self {
		let mut out = Self::new(source);

		for candidate in candidates {
			out.push(candidate.id, candidate.score, candidate.reason);
		}

		out
	}

	pub fn push(&mut self, id: DocumentId, score: f32, reason: String) -> bool {
		if self.scores.contains_key(&id) {
			return false;
		}

		self.ids.push(id);
		self.scores.insert(id, score);
		self.reasons.insert(id, reason);

		true
	}

	pub fn ids(&self) -> &[DocumentId] {
		&self.ids
	}

	pub fn reasons(&self) -> &HashMap<DocumentId, String> {
		&self.reasons
	}

	pub fn scores(&self) -> &HashMap<DocumentId, f32> {
		&self.scores
	}

	pub fn reason(&self, id: DocumentId) -> Option<&str> {
		self.reasons.get(&id).map(String::as_str)
	}

	pub fn score(&self, id: DocumentId) -> Option<f32> {
		self.scores.get(&id).copied()
	}

	pub fn source(&self) -> ResultSource {
		self.source
	}

	pub fn len(&self) -> usize {
		self.ids.len()
	}

	pub fn is_empty(&self) -> bool {
		self.ids.is_empty()
	}

	pub fn contains(&self, id: DocumentId) -> bool {
		self.scores.contains_key(&id)
	}

	/// Same ids in the same order, regardless of reasons, scores, or source.
	pub fn same_ranking(&self, other: &Self) -> bool {
		self.ids == other.ids
	}

	pub fn relabel(mut self, source: ResultSource) -> Self {
		self.source = source;

		self
	}

	pub fn remove(&mut self, id: DocumentId) -> bool {
		if self.scores.remove(&id).is_none() {
			return false;
		}

		self.reasons.remove(&id);
		self.ids.retain(|existing| *existing != id);

		true
	}

	pub fn retain(&mut self, mut keep: impl FnMut(DocumentId) -> bool) {
		let dropped: Vec<DocumentId> = self.ids.iter().copied().filter(|id| !keep(*id)).collect();

		for id in dropped {
			self.remove(id);
		}
	}

	/// Keeps the first `max` ids. Zero means no limit.
	pub fn truncate(&mut self, max: usize) {
		if max == 0 || self.ids.len() <= max {
			return;
		}

		for id in self.ids.split_off(max) {
			self.scores.remove(&id);
			self.reasons.remove(&id);
		}
	}
}

/// A query with its derived terms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedQuery {
	pub raw: String,
	pub keywords: Vec<String>,
	pub hashtag: HashtagQuery,
}
impl ParsedQuery {
	pub fn parse(raw: &str) -> Self {
		let hashtag = hashtag::parse_hashtag_query(raw);
		let keywords =
			if hashtag.is_hashtag_search { Vec::new() } else { keywords::extract(raw) };

		Self { raw: raw.trim().to_string(), keywords, hashtag }
	}
}

/// Mode a caller or the config may ask for. Hashtag mode is chosen from the query itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestedMode {
	Hybrid,
	SemanticOnly,
	Aggressive,
}
impl FromStr for RequestedMode {
	type Err = Error;

	fn from_str(raw: &str) -> Result<Self> {
		match raw.trim().to_ascii_lowercase().replace('-', "_").as_str() {
			"hybrid" => Ok(Self::Hybrid),
			"semantic_only" => Ok(Self::SemanticOnly),
			"aggressive" => Ok(Self::Aggressive),
			other =>
				Err(Error::InvalidRequest { message: format!("Unknown search mode {other:?}.") }),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SearchMode {
	Hashtag { tags: Vec<String> },
	Aggressive,
	SemanticOnly,
	Hybrid,
}
impl SearchMode {
	pub fn resolve(cfg: &Config, requested: Option<RequestedMode>, query: &ParsedQuery) -> Self {
		if query.hashtag.is_hashtag_search {
			return Self::Hashtag { tags: query.hashtag.tags.clone() };
		}

		let requested = requested
			.or_else(|| cfg.search.mode.parse().ok())
			.unwrap_or(RequestedMode::Hybrid);

		match requested {
			RequestedMode::Hybrid => Self::Hybrid,
			RequestedMode::SemanticOnly => Self::SemanticOnly,
			RequestedMode::Aggressive => Self::Aggressive,
		}
	}

	pub fn label(&self) -> &'static str {
		match self {
			Self::Hashtag { .. } => "hashtag",
			Self::Aggressive => "aggressive",
			Self::SemanticOnly => "semantic_only",
			Self::Hybrid => "hybrid",
		}
	}
}

impl fmt::Display for SearchMode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.label())
	}
}

/// One ranking strategy.
pub trait Scorer
where
	Self: Send + Sync,
{
	fn source(&self) -> ResultSource;

	fn score<'a>(
		&'a self,
		documents: &'a [Document],
		query: &'a ParsedQuery,
		cancel: &'a CancellationToken,
	) -> BoxFuture<'a, Result<Vec<ScoredCandidate>>>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
	pub query: String,
	pub mode: Option<RequestedMode>,
}
impl SearchRequest {
	pub fn new(query: impl Into<String>) -> Self {
		Self { query: query.into(), mode: None }
	}

	pub fn with_mode(mut self, mode: RequestedMode) -> Self {
		self.mode = Some(mode);

		self
	}
}

/// Pending semantic pass of a hybrid search whose lexical results were already returned.
#[derive(Debug)]
pub struct Refinement {
	handle: JoinHandle<Result<ResultSet>>,
}
impl Refinement {
	/// Waits for reconciliation and returns the result set that is active afterwards.
	pub async fn wait(self) -> Result<ResultSet> {
		self.handle.await?
	}

	pub fn is_finished(&self) -> bool {
		self.handle.is_finished()
	}
}

#[derive(Debug)]
pub struct SearchOutcome {
	pub mode: SearchMode,
	pub keywords: Vec<String>,
	pub results: ResultSet,
	pub session: SearchSession,
	/// Present when semantic results may still replace `results`.
	pub refinement: Option<Refinement>,
}

impl TabRankService {
	/// Runs one search.
	///
	/// Begins a new search on `ctx`, cancelling the previous one. Returns as soon as the
	/// authoritative or provisional result set is known; in hybrid mode the semantic pass may
	/// continue in `SearchOutcome::refinement`. Only cancellation and blank queries are errors.
	pub async fn search(&self, ctx: &SearchContext, req: SearchRequest) -> Result<SearchOutcome> {
		if req.query.trim().is_empty() {
			return Err(Error::InvalidRequest { message: "query must be non-empty.".to_string() });
		}

		let cancel = ctx.begin();
		let sink = ctx.sink(cancel.clone());
		let query = ParsedQuery::parse(&req.query);
		let mode = SearchMode::resolve(&self.cfg, req.mode, &query);
		let mut session = SearchSession::start(&query.raw, OffsetDateTime::now_utc());

		tracing::info!(mode = %mode, keywords = ?query.keywords, "Search started.");

		// The newest search always takes over the stored session.
		if let Err(err) = self.sessions.save(&session).await {
			tracing::warn!(error = %err, "Search session write failed.");
		}

		match self.dispatch(&mode, query.clone(), session.clone(), &cancel, &sink).await {
			Ok((mut results, refinement)) => {
				results.truncate(self.cfg.search.max_results as usize);
				session.complete(results.clone());

				if cancel.is_cancelled() {
					return Err(self.abandon(&mut session, &sink).await);
				}

				// A pending refinement owns the session from here on.
				if refinement.is_none() {
					let events = vec![
						SearchEvent::Status(session.status.clone()),
						SearchEvent::Complete(results.clone()),
					];

					reconcile::settle(&self.sessions, &mut session, &sink, events).await?;
				}

				tracing::info!(
					mode = %mode,
					count = results.len(),
					source = results.source().as_str(),
					refining = refinement.is_some(),
					"Search finished."
				);

				Ok(SearchOutcome { mode, keywords: query.keywords, results, session, refinement })
			},
			Err(Error::Cancelled) => Err(self.abandon(&mut session, &sink).await),
			Err(err) => Err(err),
		}
	}

	/// Returns the stored session when it answers `query`, pruning ids of closed documents.
	pub async fn resume_session(&self, query: &str) -> Result<Option<SearchSession>> {
		let Some(mut session) = self.sessions.load().await? else { return Ok(None) };

		if !session.matches_query(query)
			|| !matches!(session.status, SearchStatus::Found { .. } | SearchStatus::NoResults)
		{
			return Ok(None);
		}

		let open = self.list_documents().await;
		let open_ids: Vec<DocumentId> = open.iter().map(|meta| meta.id).collect();
		let before = session.results.len();

		session.results.retain(|id| open_ids.contains(&id));

		if session.results.len() != before {
			session.status = SearchStatus::for_results(&session.results);

			self.sessions.save(&session).await?;
		}

		Ok(Some(session))
	}

	/// Forgets a closed document: drops it from the stored session and its cached summary.
	pub async fn remove_document(&self, id: DocumentId) -> Result<Option<SearchSession>> {
		self.summaries.invalidate(&[id]).await?;

		let Some(mut session) = self.sessions.load().await? else { return Ok(None) };

		if session.remove_document(id) {
			self.sessions.save(&session).await?;
		}

		Ok(Some(session))
	}

	async fn dispatch(
		&self,
		mode: &SearchMode,
		query: ParsedQuery,
		session: SearchSession,
		cancel: &CancellationToken,
		sink: &EventSink,
	) -> Result<(ResultSet, Option<Refinement>)> {
		let metas = self.list_documents().await;

		check_cancelled(cancel)?;

		match mode {
			SearchMode::Hashtag { .. } => {
				let documents = self.load_documents(metas, cancel, true).await?;
				let candidates = TagScorer.score(&documents, &query, cancel).await?;

				Ok((ResultSet::from_candidates(candidates, TagScorer.source()), None))
			},
			SearchMode::Aggressive => {
				let documents = self.load_documents(metas, cancel, false).await?;
				let scorer = LexicalScorer::full_text(self.cfg.lexical.clone());
				let results = progressive::run(
					&scorer,
					self.collaborators.documents.as_ref(),
					documents,
					&query,
					cancel,
					sink,
				)
				.await?;

				Ok((results, None))
			},
			SearchMode::SemanticOnly => {
				let documents = self.load_documents(metas, cancel, true).await?;
				let candidates = self.semantic_scorer().score(&documents, &query, cancel).await?;

				Ok((ResultSet::from_candidates(candidates, ResultSource::Semantic), None))
			},
			SearchMode::Hybrid => {
				let documents = self.load_documents(metas, cancel, true).await?;

				reconcile::run_hybrid(reconcile::HybridArgs {
					lexical: LexicalScorer::new(self.cfg.lexical.clone()),
					semantic: self.cfg.semantic.enabled.then(|| self.semantic_scorer()),
					documents: Arc::new(documents),
					query: Arc::new(query),
					session,
					sessions: self.sessions.clone(),
					max_results: self.cfg.search.max_results as usize,
					cancel: cancel.clone(),
					sink: sink.clone(),
				})
				.await
			},
		}
	}

	pub(crate) fn semantic_scorer(&self) -> SemanticScorer {
		SemanticScorer::new(self.models.clone(), self.cfg.semantic.clone())
	}

	async fn list_documents(&self) -> Vec<DocumentMeta> {
		match self.collaborators.documents.list_documents().await {
			Ok(metas) => metas,
			Err(err) => {
				tracing::warn!(error = %err, "Document listing failed. Searching nothing.");

				Vec::new()
			},
		}
	}

	/// Attaches summaries and tags to every document.
	///
	/// Cached summaries are reused. With `summarize` set, uncached documents are read
	/// concurrently and summarized in one batch, falling back to a deterministic summary when
	/// the summarizer fails; otherwise they get the deterministic summary directly and nothing
	/// is cached.
	pub(crate) async fn load_documents(
		&self,
		metas: Vec<DocumentMeta>,
		cancel: &CancellationToken,
		summarize: bool,
	) -> Result<Vec<Document>> {
		let max_chars = self.cfg.cache.summary_max_chars as usize;
		let max_tags = self.cfg.cache.max_tags as usize;
		let now = OffsetDateTime::now_utc();
		let cached = match self.summaries.lookup(&metas, now).await {
			Ok(cached) => cached,
			Err(err) => {
				tracing::warn!(error = %err, "Summary cache lookup failed.");

				HashMap::new()
			},
		};

		check_cancelled(cancel)?;

		let missing: Vec<&DocumentMeta> =
			metas.iter().filter(|meta| !cached.contains_key(&meta.id)).collect();
		let mut fresh: HashMap<DocumentId, SummaryRecord> = HashMap::new();

		if summarize && !missing.is_empty() {
			fresh = self.summarize_missing(&missing, cancel, max_chars, max_tags).await?;

			let records: Vec<(&DocumentMeta, &SummaryRecord)> = missing
				.iter()
				.filter_map(|meta| fresh.get(&meta.id).map(|record| (*meta, record)))
				.collect();

			if let Err(err) = self.summaries.store(&records, now).await {
				tracing::warn!(error = %err, "Summary cache write failed.");
			}
		}

		// Fallbacks are never cached, so a recovered summarizer gets another chance.
		for meta in &missing {
			fresh
				.entry(meta.id)
				.or_insert_with(|| SummaryRecord::fallback(meta, max_chars, max_tags));
		}

		let documents = metas
			.into_iter()
			.map(|meta| {
				let record = cached.get(&meta.id).or_else(|| fresh.get(&meta.id)).cloned();
				let mut document = Document::from_meta(meta);

				if let Some(record) = record {
					document.summary = record.summary;
					document.tags = record.tags;
				}

				document
			})
			.collect();

		Ok(documents)
	}

	async fn summarize_missing(
		&self,
		missing: &[&DocumentMeta],
		cancel: &CancellationToken,
		max_chars: usize,
		max_tags: usize,
	) -> Result<HashMap<DocumentId, SummaryRecord>> {
		let provider = self.collaborators.documents.as_ref();
		let reads = future::join_all(missing.iter().map(|meta| read_text(provider, meta)));
		let texts = tokio::select! {
			biased;

			_ = cancel.cancelled() => return Err(Error::Cancelled),
			texts = reads => texts,
		};
		let batch: Vec<SummaryInput> = missing
			.iter()
			.zip(texts)
			.map(|(meta, text)| SummaryInput {
				id: meta.id,
				title: meta.title.clone(),
				url: meta.url.clone(),
				text,
			})
			.collect();
		let summarized = tokio::select! {
			biased;

			_ = cancel.cancelled() => return Err(Error::Cancelled),
			summarized = self.collaborators.summarizer.summarize(&batch) => summarized,
		};
		let out: HashMap<DocumentId, SummaryRecord> = match summarized {
			Ok(records) => records
				.into_iter()
				.filter(|record| missing.iter().any(|meta| meta.id == record.id))
				.map(|record| (record.id, record.normalized(max_chars, max_tags)))
				.collect(),
			Err(err) => {
				tracing::warn!(
					error = %err,
					count = batch.len(),
					"Summarization failed. Using fallback summaries."
				);

				HashMap::new()
			},
		};

		Ok(out)
	}

	async fn abandon(&self, session: &mut SearchSession, sink: &EventSink) -> Error {
		reconcile::abandon(&self.sessions, session, sink).await;

		Error::Cancelled
	}
}

pub(crate) fn check_cancelled(cancel: &CancellationToken) -> Result<()> {
	if cancel.is_cancelled() { Err(Error::Cancelled) } else { Ok(()) }
}

/// Reads page text, falling back to title and URL when the page cannot be read.
pub(crate) async fn read_text(
	provider: &dyn crate::DocumentProvider,
	meta: &DocumentMeta,
) -> String {
	let fallback = || format!("{} {}", meta.title, meta.url).trim().to_string();

	match provider.document_text(meta.id).await {
		Ok(text) if !text.trim().is_empty() => text,
		Ok(_) => fallback(),
		Err(err) => {
			tracing::debug!(document_id = %meta.id, error = %err, "Document text unavailable.");

			fallback()
		},
	}
}
