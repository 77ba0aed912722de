use std::collections::BTreeSet;

use tokio_util::sync::CancellationToken;

use crate::{
	BoxFuture, Document, Result,
	search::{MatchedField, ParsedQuery, ResultSource, ScoredCandidate, Scorer, check_cancelled},
};
use tabrank_domain::hashtag;

pub const TAG_MATCH_SCORE: f32 = 10.0;

/// Hashtag fast path. Any tag match qualifies.
#[derive(Debug, Clone, Copy, Default)]
pub struct TagScorer;

impl Scorer for TagScorer {
	fn source(&self) -> ResultSource {
		ResultSource::Lexical
	}

	fn score<'a>(
		&'a self,
		documents: &'a [Document],
		query: &'a ParsedQuery,
		cancel: &'a CancellationToken,
	) -> BoxFuture<'a, Result<Vec<ScoredCandidate>>> {
		Box::pin(async move {
			check_cancelled(cancel)?;

			Ok(perform_tag_search(documents, &query.hashtag.tags))
		})
	}
}

/// Matches documents against query tags, best first.
///
/// Each distinct query tag matching any document tag adds `TAG_MATCH_SCORE`. Ties keep
/// document order.
pub fn perform_tag_search(documents: &[Document], tags: &[String]) -> Vec<ScoredCandidate> {
	let mut out = Vec::new();

	for document in documents {
		let matched: Vec<String> = tags
			.iter()
			.filter(|query_tag| {
				document.tags.iter().any(|tag| hashtag::tag_matches(tag, query_tag))
			})
			.cloned()
			.collect();

		if matched.is_empty() {
			continue;
		}

		let listed: Vec<String> = matched.iter().map(|tag| format!("#{tag}")).collect();

		out.push(ScoredCandidate {
			id: document.id,
			score: TAG_MATCH_SCORE * matched.len() as f32,
			matched_fields: BTreeSet::from([MatchedField::Tags]),
			reason: format!("Tagged {}", listed.join(", ")),
			matched_terms: matched,
			source: ResultSource::Lexical,
		});
	}

	out.sort_by(|a, b| b.score.total_cmp(&a.score));

	out
}
