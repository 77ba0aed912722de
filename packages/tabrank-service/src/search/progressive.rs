//! Full-text lexical search that scores one document at a time and streams partial results.

use tokio_util::sync::CancellationToken;

use crate::{
	Document, DocumentProvider, Error, Result,
	search::{
		ParsedQuery, ResultSet, ResultSource, ScoredCandidate, check_cancelled,
		lexical::LexicalScorer, read_text,
	},
	session::{EventSink, SearchEvent, SearchProgress},
};

/// Scores `documents` in order, publishing the ranked results after each one.
///
/// Page text is read lazily per document. A cancelled search returns `Error::Cancelled` and
/// discards what it has found.
pub(crate) async fn run(
	scorer: &LexicalScorer,
	provider: &dyn DocumentProvider,
	documents: Vec<Document>,
	query: &ParsedQuery,
	cancel: &CancellationToken,
	sink: &EventSink,
) -> Result<ResultSet> {
	let total = documents.len();
	let mut ranked: Vec<ScoredCandidate> = Vec::new();
	let mut results = ResultSet::new(ResultSource::Lexical);

	for (index, mut document) in documents.into_iter().enumerate() {
		check_cancelled(cancel)?;

		let meta = document.meta();

		document.text = tokio::select! {
			biased;

			_ = cancel.cancelled() => return Err(Error::Cancelled),
			text = read_text(provider, &meta) => text,
		};

		let candidate = scorer.score_document(&document, &query.keywords);

		if scorer.qualifies(&candidate, &query.keywords) {
			insert_ranked(&mut ranked, candidate);

			results = ResultSet::from_candidates(ranked.clone(), ResultSource::Lexical);
		}

		let progress = SearchProgress { searched: index + 1, total, found: ranked.len() };

		tracing::trace!(%progress, document_id = %document.id, "Progressive search step.");

		sink.publish(SearchEvent::Partial { results: results.clone(), progress })?;
	}

	Ok(results)
}

/// Inserts after every candidate scoring at least as high, so ties keep arrival order.
fn insert_ranked(ranked: &mut Vec<ScoredCandidate>, candidate: ScoredCandidate) {
	let position = ranked.partition_point(|existing| existing.score >= candidate.score);

	ranked.insert(position, candidate);
}
