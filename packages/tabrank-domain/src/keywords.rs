use std::collections::HashSet;

/// Tokens at or below this length never survive filtering.
pub const MAX_DROPPED_TOKEN_LEN: usize = 2;

const STOP_WORDS: &[&str] = &[
	// Pronouns.
	"i", "me", "my", "mine", "myself", "you", "your", "yours", "he", "him", "his", "she", "her",
	"hers", "it", "its", "we", "us", "our", "ours", "they", "them", "their", "theirs",
	// Articles.
	"a", "an", "the",
	// Prepositions.
	"about", "above", "across", "after", "against", "along", "among", "around", "at", "before",
	"behind", "below", "between", "by", "for", "from", "in", "into", "near", "of", "off", "on",
	"onto", "out", "over", "through", "to", "toward", "towards", "under", "up", "upon", "with",
	"within", "without",
	// Filler words people use when asking for a tab.
	"tab", "tabs", "search", "searching", "find", "finding", "show", "showing", "look", "looking",
	"open", "opened", "page", "pages", "site", "sites", "website", "websites", "related",
	"something", "anything", "stuff", "thing", "things", "want", "need", "get", "please", "help",
	// Auxiliary verbs.
	"am", "is", "are", "was", "were", "be", "been", "being", "have", "has", "had", "do", "does",
	"did", "can", "could", "will", "would", "shall", "should", "may", "might", "must",
	// Conjunctions.
	"and", "or", "but", "nor", "so", "yet", "if", "because", "while", "although",
	// Demonstratives.
	"this", "that", "these", "those",
	// Vague quantifiers.
	"some", "any", "all", "many", "much", "few", "several", "more", "most", "other", "another",
	"each", "every", "lot", "lots",
	// Question words and hedges.
	"what", "which", "who", "whom", "where", "when", "how", "why", "just", "like", "also", "very",
	"really", "only",
];

pub fn is_stop_word(token: &str) -> bool {
	STOP_WORDS.contains(&token)
}

/// Splits a query into lowercase tokens, trimming punctuation that clings to either end.
pub fn tokenize(query: &str) -> Vec<String> {
	let mut out = Vec::new();
	let mut seen = HashSet::new();

	for raw in query.split_whitespace() {
		let token = raw.trim_matches(|ch: char| ch.is_ascii_punctuation()).to_lowercase();

		if token.is_empty() {
			continue;
		}
		if seen.insert(token.clone()) {
			out.push(token);
		}
	}

	out
}

/// Extracts the meaningful terms of a natural-language query.
///
/// Falls back to the unfiltered tokens when every token is a stop word, so a non-blank query
/// always yields at least one term.
pub fn extract(query: &str) -> Vec<String> {
	let tokens = tokenize(query);

	// Punctuation-only queries have no trimmed tokens; keep the raw words instead.
	if tokens.is_empty() {
		let mut raw: Vec<String> = Vec::new();

		for word in query.split_whitespace().map(str::to_lowercase) {
			if !raw.contains(&word) {
				raw.push(word);
			}
		}

		return raw;
	}

	let filtered: Vec<String> = tokens
		.iter()
		.filter(|token| token.chars().count() > MAX_DROPPED_TOKEN_LEN && !is_stop_word(token))
		.cloned()
		.collect();

	if filtered.is_empty() { tokens } else { filtered }
}
