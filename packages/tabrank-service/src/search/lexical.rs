//! Deterministic field-weighted keyword scoring.

use std::collections::BTreeSet;

use tokio_util::sync::CancellationToken;

use crate::{
	BoxFuture, Document, Result,
	search::{MatchedField, ParsedQuery, ResultSource, ScoredCandidate, Scorer, check_cancelled},
};
use tabrank_config::Lexical;
use tabrank_domain::text;

#[derive(Debug, Clone)]
pub struct LexicalScorer {
	cfg: Lexical,
	full_text: bool,
}
impl LexicalScorer {
	/// Scores title, tags, summary, and URL.
	pub fn new(cfg: Lexical) -> Self {
		Self { cfg, full_text: false }
	}

	/// Scores page text in place of the summary.
	pub fn full_text(cfg: Lexical) -> Self {
		Self { cfg, full_text: true }
	}

	/// Terms long enough to be scored.
	pub fn eligible_terms<'a>(&self, terms: &'a [String]) -> Vec<&'a str> {
		let min_len = self.cfg.min_term_len as usize;
		let mut out: Vec<&str> = Vec::new();

		for term in terms {
			let term = term.as_str();

			if term.chars().count() >= min_len && !out.contains(&term) {
				out.push(term);
			}
		}

		out
	}

	/// Minimum score a document needs for `term_count` eligible terms.
	pub fn min_score(&self, term_count: usize) -> f32 {
		(term_count as f32 * self.cfg.min_score_per_term).max(self.cfg.min_score_floor)
	}

	/// Scores one document without applying the threshold.
	pub fn score_document(&self, document: &Document, terms: &[String]) -> ScoredCandidate {
		let weights = &self.cfg.weights;
		let mut fields: Vec<(MatchedField, f32, String)> = vec![
			(MatchedField::Title, weights.title, document.title.to_lowercase()),
			(MatchedField::Tags, weights.tags, document.tags_text().to_lowercase()),
		];

		if self.full_text {
			let content = match document.text.trim() {
				"" => document.fallback_text(),
				_ => document.text.clone(),
			};

			fields.push((MatchedField::Content, weights.content, content.to_lowercase()));
		} else {
			fields.push((MatchedField::Summary, weights.summary, document.summary.to_lowercase()));
		}

		fields.push((MatchedField::Url, weights.url, document.normalized_url()));

		let mut score = 0.0_f32;
		let mut matched_fields = BTreeSet::new();
		let mut matched_terms = Vec::new();

		for term in self.eligible_terms(terms) {
			let term = term.to_lowercase();
			let stem = text::naive_stem(&term);
			let stem = (stem.chars().count() >= 3).then_some(stem);
			let mut hit = false;

			for (field, weight, haystack) in &fields {
				let hit_term = haystack.contains(term.as_str());
				let hit_stem = stem.is_some_and(|stem| haystack.contains(stem));

				if hit_term || hit_stem {
					score += weight;
					hit = true;

					matched_fields.insert(*field);
				}
			}

			if hit {
				matched_terms.push(term);
			}
		}

		let reason = match_reason(&matched_terms, &matched_fields);

		ScoredCandidate {
			id: document.id,
			score,
			matched_fields,
			matched_terms,
			reason,
			source: ResultSource::Lexical,
		}
	}

	/// Scores every document and keeps those reaching the threshold, best first.
	///
	/// Ties keep input order.
	pub fn score_documents(
		&self,
		documents: &[Document],
		terms: &[String],
	) -> Vec<ScoredCandidate> {
		let min_score = self.min_score(self.eligible_terms(terms).len());
		let mut out: Vec<ScoredCandidate> = documents
			.iter()
			.map(|document| self.score_document(document, terms))
			.filter(|candidate| candidate.score > 0.0 && candidate.score >= min_score)
			.collect();

		out.sort_by(|a, b| b.score.total_cmp(&a.score));

		out
	}

	/// Threshold check for a single scored candidate, as used by progressive search.
	pub fn qualifies(&self, candidate: &ScoredCandidate, terms: &[String]) -> bool {
		candidate.score > 0.0 && candidate.score >= self.min_score(self.eligible_terms(terms).len())
	}
}

impl Scorer for LexicalScorer {
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

			Ok(self.score_documents(documents, &query.keywords))
		})
	}
}

fn match_reason(terms: &[String], fields: &BTreeSet<MatchedField>) -> String {
	if terms.is_empty() {
		return String::new();
	}

	let terms: Vec<String> = terms.iter().map(|term| format!("\"{term}\"")).collect();
	let fields: Vec<&str> = fields.iter().map(|field| field.as_str()).collect();

	format!("Matched {} in {}", terms.join(", "), fields.join(", "))
}
