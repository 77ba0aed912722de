use crate::text;

const MIN_PATH_TAG_CHARS: usize = 3;
const MAX_PATH_TAG_CHARS: usize = 20;

const TOPIC_LEXICON: &[(&[&str], &str)] = &[
	(&["recipe", "recipes", "cooking", "food", "restaurant", "menu", "dessert", "baking"], "food"),
	(
		&["tutorial", "tutorials", "guide", "course", "learn", "lesson", "docs", "documentation"],
		"learning",
	),
	(&["news", "breaking", "headlines", "politics"], "news"),
	(&["video", "videos", "watch", "stream", "episode"], "video"),
	(&["shop", "buy", "cart", "price", "deal", "sale", "store"], "shopping"),
	(
		&["code", "programming", "api", "rust", "python", "javascript", "github", "repository"],
		"programming",
	),
	(&["travel", "flight", "flights", "hotel", "trip", "booking"], "travel"),
	(&["music", "song", "songs", "playlist", "album"], "music"),
	(&["game", "games", "gaming"], "gaming"),
	(&["finance", "bank", "stock", "stocks", "invest", "investing", "crypto"], "finance"),
	(&["health", "fitness", "workout", "diet", "medical"], "health"),
	(&["mail", "inbox", "email"], "email"),
	(&["essay", "essays", "blog", "article", "writing"], "writing"),
];

/// Deterministic summary used when the summarizer is unavailable.
pub fn fallback_summary(title: &str, url: &str, max_chars: usize) -> String {
	text::truncate_chars(format!("{} {}", title.trim(), url.trim()).trim(), max_chars)
}

/// Tags derived from the URL domain, URL path, and a fixed topic lexicon over the title.
pub fn heuristic_tags(title: &str, url: &str, max_tags: usize) -> Vec<String> {
	let mut tags = Vec::new();

	if let Some(label) = text::domain_label(url) {
		tags.push(label);
	}

	for word in text::url_path_words(url) {
		let len = word.chars().count();

		if (MIN_PATH_TAG_CHARS..=MAX_PATH_TAG_CHARS).contains(&len)
			&& word.chars().all(char::is_alphabetic)
		{
			tags.push(word);
		}
	}

	let title_words = text::words(title);

	for (triggers, topic) in TOPIC_LEXICON {
		if title_words.iter().any(|word| triggers.contains(&word.as_str())) {
			tags.push((*topic).to_string());
		}
	}

	normalize_tags(tags, max_tags)
}

/// Lowercases, trims, strips leading `#`, drops empties and duplicates, and caps the count.
pub fn normalize_tags<I, S>(tags: I, max_tags: usize) -> Vec<String>
where
	I: IntoIterator<Item = S>,
	S: AsRef<str>,
{
	let mut out: Vec<String> = Vec::new();

	if max_tags == 0 {
		return out;
	}

	for tag in tags {
		let tag = tag.as_ref().trim().trim_start_matches('#').trim().to_lowercase();

		if tag.is_empty() || out.contains(&tag) {
			continue;
		}

		out.push(tag);

		if out.len() >= max_tags {
			break;
		}
	}

	out
}
