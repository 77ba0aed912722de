use std::sync::LazyLock;

use regex::Regex;

pub const HEDGE_PHRASES: [&str; 16] = [
	"however",
	"might be",
	"may be",
	"could be",
	"possibly",
	"perhaps",
	"tangentially",
	"unclear",
	"not directly",
	"indirectly",
	"loosely",
	"somewhat",
	"not specifically",
	"not explicitly",
	"partially related",
	"not sure",
];

static HEDGE_PATTERN: LazyLock<Option<Regex>> = LazyLock::new(|| {
	let alternatives: Vec<String> =
		HEDGE_PHRASES.iter().map(|phrase| regex::escape(phrase)).collect();

	Regex::new(&format!(r"(?i)\b(?:{})\b", alternatives.join("|"))).ok()
});

/// Returns every single-quoted span of `reason`.
///
/// An apostrophe only opens a quote when it does not follow a letter or digit, and only
/// closes one when it is not followed by a letter or digit, so contractions and possessives
/// inside or around a quote are kept intact.
pub fn quoted_substrings(reason: &str) -> Vec<String> {
	let chars: Vec<(usize, char)> = reason.char_indices().collect();
	let mut out = Vec::new();
	let mut open: Option<usize> = None;

	for (pos, &(idx, ch)) in chars.iter().enumerate() {
		if ch != '\'' {
			continue;
		}

		let prev_is_word = pos > 0 && chars[pos - 1].1.is_alphanumeric();
		let next_is_word =
			chars.get(pos + 1).map(|(_, next)| next.is_alphanumeric()).unwrap_or(false);

		match open {
			None if !prev_is_word => open = Some(idx + ch.len_utf8()),
			Some(start) if !next_is_word => {
				let quote = reason[start..idx].trim();

				if !quote.is_empty() {
					out.push(quote.to_string());
				}

				open = None;
			},
			_ => {},
		}
	}

	out
}

/// Checks that each quote of at least `min_chars` characters occurs in one of `sources`.
///
/// Quotes shorter than `min_chars` are ignored. With no qualifying quotes the result is
/// `!require_quote`.
pub fn quotes_grounded(
	quotes: &[String],
	sources: &[&str],
	min_chars: usize,
	require_quote: bool,
) -> bool {
	let mut checked = 0_usize;

	for quote in quotes {
		if quote.chars().count() < min_chars {
			continue;
		}

		checked += 1;

		if !evidence_matches(sources, quote) {
			return false;
		}
	}

	checked > 0 || !require_quote
}

pub fn find_hedge(reason: &str) -> Option<String> {
	let pattern = HEDGE_PATTERN.as_ref()?;

	pattern.find(reason).map(|found| found.as_str().to_lowercase())
}

/// Fraction of `keywords` appearing verbatim (case-insensitive) in `reason`.
pub fn keyword_coverage(keywords: &[String], reason: &str) -> f32 {
	if keywords.is_empty() {
		return 1.0;
	}

	let reason = reason.to_lowercase();
	let matched =
		keywords.iter().filter(|keyword| reason.contains(&keyword.to_lowercase())).count();

	matched as f32 / keywords.len() as f32
}

pub fn evidence_matches(sources: &[&str], quote: &str) -> bool {
	if quote.trim().is_empty() {
		return false;
	}

	let needle = quote.to_lowercase();

	sources.iter().any(|source| source.to_lowercase().contains(&needle))
}
