//! Hybrid search: fast lexical results, replaced by semantic ones when the model answers.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::{
	Document, Error, Result,
	search::{
		ParsedQuery, Refinement, ResultSet, ResultSource, Scorer, lexical::LexicalScorer,
		semantic::SemanticScorer,
	},
	session::{EventSink, SearchEvent, SearchSession, SearchStatus, SessionStore},
};

/// What the semantic pass does to a provisional lexical result set.
#[derive(Debug, Clone, PartialEq)]
pub enum Reconciliation {
	/// The semantic ranking supersedes the provisional set wholesale.
	Replaced(ResultSet),
	/// The semantic ranking has the same ids in the same order. Carries the semantic set so
	/// its reasons and scores are adopted without a replacement event.
	Unchanged(ResultSet),
	/// The semantic pass found nothing. The provisional set stands.
	Kept,
}

/// Decides between the provisional set and the semantic set. Never merges them.
pub fn reconcile(provisional: &ResultSet, semantic: ResultSet) -> Reconciliation {
	if semantic.is_empty() {
		return Reconciliation::Kept;
	}

	let semantic = semantic.relabel(ResultSource::Semantic);

	if semantic.same_ranking(provisional) {
		return Reconciliation::Unchanged(semantic);
	}

	Reconciliation::Replaced(semantic)
}

pub(crate) struct HybridArgs {
	pub(crate) lexical: LexicalScorer,
	pub(crate) semantic: Option<SemanticScorer>,
	pub(crate) documents: Arc<Vec<Document>>,
	pub(crate) query: Arc<ParsedQuery>,
	pub(crate) session: SearchSession,
	pub(crate) sessions: SessionStore,
	pub(crate) max_results: usize,
	pub(crate) cancel: CancellationToken,
	pub(crate) sink: EventSink,
}

/// Runs both scorers concurrently.
///
/// Non-empty lexical results are returned at once, published as provisional, and stored in
/// the session; the semantic pass then continues as a `Refinement`. Empty lexical results
/// make this wait for the semantic pass instead.
pub(crate) async fn run_hybrid(args: HybridArgs) -> Result<(ResultSet, Option<Refinement>)> {
	let HybridArgs {
		lexical,
		semantic,
		documents,
		query,
		mut session,
		sessions,
		max_results,
		cancel,
		sink,
	} = args;
	let semantic = semantic.map(|scorer| spawn_semantic(scorer, &documents, &query, &cancel));
	let candidates = lexical.score(&documents, &query, &cancel).await?;
	let mut provisional = ResultSet::from_candidates(candidates, ResultSource::Lexical);

	provisional.truncate(max_results);

	let Some(semantic) = semantic else { return Ok((provisional, None)) };

	if provisional.is_empty() {
		tracing::debug!("No lexical results. Waiting for semantic scoring.");

		let mut results = await_semantic(semantic, &cancel).await?;

		results.truncate(max_results);

		return Ok((results.relabel(ResultSource::Semantic), None));
	}

	session.complete(provisional.clone());

	store_session(&sessions, &session).await;
	sink.publish(SearchEvent::Provisional(provisional.clone()))?;

	let task = refine(Refine {
		semantic,
		provisional: provisional.clone(),
		session,
		sessions,
		max_results,
		cancel,
		sink,
	});

	Ok((provisional, Some(Refinement { handle: tokio::spawn(task) })))
}

fn spawn_semantic(
	scorer: SemanticScorer,
	documents: &Arc<Vec<Document>>,
	query: &Arc<ParsedQuery>,
	cancel: &CancellationToken,
) -> JoinHandle<Result<ResultSet>> {
	let documents = documents.clone();
	let query = query.clone();
	let cancel = cancel.clone();

	tokio::spawn(async move {
		let candidates = scorer.score(&documents, &query, &cancel).await?;

		Ok(ResultSet::from_candidates(candidates, ResultSource::Semantic))
	})
}

/// Waits for the semantic task. Failures become an empty set; cancellation propagates.
async fn await_semantic(
	handle: JoinHandle<Result<ResultSet>>,
	cancel: &CancellationToken,
) -> Result<ResultSet> {
	let joined = tokio::select! {
		biased;

		_ = cancel.cancelled() => return Err(Error::Cancelled),
		joined = handle => joined,
	};

	match joined.map_err(Error::from).and_then(|results| results) {
		Ok(results) => Ok(results),
		Err(Error::Cancelled) => Err(Error::Cancelled),
		Err(err) => {
			tracing::warn!(error = %err, "Semantic scoring failed. Keeping lexical results.");

			Ok(ResultSet::new(ResultSource::Semantic))
		},
	}
}

struct Refine {
	semantic: JoinHandle<Result<ResultSet>>,
	provisional: ResultSet,
	session: SearchSession,
	sessions: SessionStore,
	max_results: usize,
	cancel: CancellationToken,
	sink: EventSink,
}

async fn refine(task: Refine) -> Result<ResultSet> {
	let Refine { semantic, provisional, mut session, sessions, max_results, cancel, sink } = task;
	let mut semantic = match await_semantic(semantic, &cancel).await {
		Ok(semantic) => semantic,
		Err(err) => {
			if err.is_cancelled() {
				abandon(&sessions, &mut session, &sink).await;
			}

			return Err(err);
		},
	};

	semantic.truncate(max_results);

	if cancel.is_cancelled() {
		abandon(&sessions, &mut session, &sink).await;

		return Err(Error::Cancelled);
	}

	let (active, mut events) = match reconcile(&provisional, semantic) {
		Reconciliation::Replaced(results) => {
			tracing::info!(
				provisional = provisional.len(),
				semantic = results.len(),
				"Semantic results replaced lexical results."
			);

			(results.clone(), vec![SearchEvent::Replaced(results)])
		},
		Reconciliation::Unchanged(results) => {
			tracing::debug!("Semantic ranking matches the lexical ranking.");

			(results, Vec::new())
		},
		Reconciliation::Kept => {
			tracing::debug!("No semantic results. Keeping lexical results.");

			(provisional, Vec::new())
		},
	};

	events.push(SearchEvent::Status(SearchStatus::for_results(&active)));
	events.push(SearchEvent::Complete(active.clone()));
	session.complete(active.clone());
	settle(&sessions, &mut session, &sink, events).await?;

	Ok(active)
}

/// Stores a finished session, then publishes `events`.
///
/// A cancel that lands during the write turns the session into a cancelled one instead.
pub(crate) async fn settle(
	sessions: &SessionStore,
	session: &mut SearchSession,
	sink: &EventSink,
	events: Vec<SearchEvent>,
) -> Result<()> {
	store_session(sessions, session).await;

	for event in events {
		if let Err(err) = sink.publish(event) {
			abandon(sessions, session, sink).await;

			return Err(err);
		}
	}

	Ok(())
}

/// Writes `session` unless a newer search owns the store. Returns false when superseded.
pub(crate) async fn store_session(sessions: &SessionStore, session: &SearchSession) -> bool {
	match sessions.save_if_current(session).await {
		Ok(current) => {
			if !current {
				tracing::debug!(session_id = %session.id, "Search session superseded.");
			}

			current
		},
		Err(err) => {
			tracing::warn!(error = %err, "Search session write failed.");

			true
		},
	}
}

/// Marks `session` cancelled. The cancellation event is only sent while no newer search
/// has taken over the event channel.
pub(crate) async fn abandon(
	sessions: &SessionStore,
	session: &mut SearchSession,
	sink: &EventSink,
) {
	session.results = ResultSet::default();
	session.status = SearchStatus::Cancelled;

	if store_session(sessions, session).await {
		sink.cancelled();
	}

	tracing::info!(session_id = %session.id, "Search cancelled.");
}
