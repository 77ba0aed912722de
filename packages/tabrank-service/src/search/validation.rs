//! Acceptance rules for model-scored candidates.

use std::fmt;

use serde_json::Value;

use crate::{Document, DocumentId, search::semantic::RefTable};
use tabrank_config::Semantic;
use tabrank_domain::evidence;

/// A candidate that survived validation, already mapped back to its document.
#[derive(Debug, Clone, PartialEq)]
pub struct Accepted {
	pub id: DocumentId,
	pub score: f32,
	pub reason: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Rejection {
	UnknownRef,
	MissingScore,
	EmptyReason,
	BelowFloor { score: f32, floor: f32 },
	Ungrounded,
	Hedged { phrase: String },
	LowCoverage { coverage: f32 },
}
impl fmt::Display for Rejection {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::UnknownRef => write!(f, "unknown ref"),
			Self::MissingScore => write!(f, "missing relevance score"),
			Self::EmptyReason => write!(f, "empty reason"),
			Self::BelowFloor { score, floor } => write!(f, "score {score} below {floor}"),
			Self::Ungrounded => write!(f, "quote not found in document"),
			Self::Hedged { phrase } => write!(f, "hedged with {phrase:?}"),
			Self::LowCoverage { coverage } => write!(f, "keyword coverage {coverage:.2}"),
		}
	}
}

/// Thresholds for one validation pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pass {
	pub min_score: f32,
	pub min_coverage: f32,
}
impl Pass {
	pub fn primary(cfg: &Semantic) -> Self {
		Self { min_score: cfg.primary_min_score, min_coverage: cfg.primary_keyword_coverage }
	}

	pub fn fallback(cfg: &Semantic) -> Self {
		Self { min_score: cfg.fallback_min_score, min_coverage: cfg.fallback_keyword_coverage }
	}
}

/// Validates a model payload of the form `{"results": [{ref, relevanceScore, reason}]}`.
///
/// Runs the primary pass and, only when it accepts nothing, the relaxed fallback pass over
/// the same payload. Accepted candidates are deduplicated by document and sorted by score,
/// best first.
pub fn validate(
	payload: &Value,
	refs: &RefTable<'_>,
	keywords: &[String],
	cfg: &Semantic,
) -> Vec<Accepted> {
	let items =
		payload.get("results").and_then(Value::as_array).map(Vec::as_slice).unwrap_or(&[]);
	let mut accepted = run_pass(items, refs, keywords, cfg, Pass::primary(cfg));

	if accepted.is_empty() && !items.is_empty() {
		tracing::debug!("No candidate passed the primary floor. Relaxing.");

		accepted = run_pass(items, refs, keywords, cfg, Pass::fallback(cfg));
	}

	accepted.sort_by(|a, b| b.score.total_cmp(&a.score));

	let mut out: Vec<Accepted> = Vec::with_capacity(accepted.len());

	for candidate in accepted {
		if out.iter().all(|existing| existing.id != candidate.id) {
			out.push(candidate);
		}
	}

	out
}

fn run_pass(
	items: &[Value],
	refs: &RefTable<'_>,
	keywords: &[String],
	cfg: &Semantic,
	pass: Pass,
) -> Vec<Accepted> {
	let mut out = Vec::new();

	for item in items {
		match check(item, refs, keywords, cfg, pass) {
			Ok(accepted) => out.push(accepted),
			Err(rejection) => {
				let reference = item.get("ref").and_then(Value::as_str).unwrap_or_default();

				tracing::debug!(
					reference,
					min_score = pass.min_score,
					%rejection,
					"Semantic candidate rejected."
				);
			},
		}
	}

	out
}

/// Applies structure, floor, grounding, hedge, and coverage checks in that order.
pub fn check(
	item: &Value,
	refs: &RefTable<'_>,
	keywords: &[String],
	cfg: &Semantic,
	pass: Pass,
) -> Result<Accepted, Rejection> {
	let document = item
		.get("ref")
		.and_then(Value::as_str)
		.and_then(|reference| refs.resolve(reference))
		.ok_or(Rejection::UnknownRef)?;
	let score = item
		.get("relevanceScore")
		.and_then(Value::as_f64)
		.map(|score| score as f32)
		.filter(|score| score.is_finite())
		.ok_or(Rejection::MissingScore)?;
	let reason = item
		.get("reason")
		.and_then(Value::as_str)
		.map(str::trim)
		.filter(|reason| !reason.is_empty())
		.ok_or(Rejection::EmptyReason)?;

	if score < pass.min_score {
		return Err(Rejection::BelowFloor { score, floor: pass.min_score });
	}
	if !grounded(reason, document, cfg) {
		return Err(Rejection::Ungrounded);
	}
	if let Some(phrase) = evidence::find_hedge(reason) {
		return Err(Rejection::Hedged { phrase });
	}

	let coverage = evidence::keyword_coverage(keywords, reason);

	if coverage < pass.min_coverage
		&& reason.chars().count() < cfg.coverage_exempt_reason_chars as usize
	{
		return Err(Rejection::LowCoverage { coverage });
	}

	Ok(Accepted { id: document.id, score, reason: reason.to_string() })
}

fn grounded(reason: &str, document: &Document, cfg: &Semantic) -> bool {
	let quotes = evidence::quoted_substrings(reason);
	let tags = document.tags_text();
	let sources =
		[document.title.as_str(), document.summary.as_str(), document.url.as_str(), tags.as_str()];

	evidence::quotes_grounded(&quotes, &sources, cfg.min_quote_chars as usize, cfg.require_quote)
}
