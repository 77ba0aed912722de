use url::Url;

const STEM_SUFFIXES: [&str; 6] = ["ing", "ed", "s", "es", "ship", "ships"];
const URL_SEPARATORS: [char; 10] = ['/', '-', '_', '.', '?', '=', '&', '#', '+', '%'];

/// Strips the longest matching suffix from `STEM_SUFFIXES`.
pub fn naive_stem(term: &str) -> &str {
	let mut best: Option<&str> = None;

	for suffix in STEM_SUFFIXES {
		if term.ends_with(suffix) && best.map(|b| suffix.len() > b.len()).unwrap_or(true) {
			best = Some(suffix);
		}
	}

	match best {
		Some(suffix) => &term[..term.len() - suffix.len()],
		None => term,
	}
}

/// Renders a URL as `host-without-www path words`, lowercased.
pub fn normalize_url(raw: &str) -> String {
	let Ok(parsed) = Url::parse(raw.trim()) else {
		return replace_separators(&raw.trim().to_lowercase());
	};
	let host = parsed.host_str().unwrap_or_default().to_lowercase();
	let host = host.strip_prefix("www.").unwrap_or(&host);
	let path = replace_separators(&parsed.path().to_lowercase());

	format!("{host} {path}").split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Returns the registrable-looking label of a host, e.g. `github` for `www.github.com`.
pub fn domain_label(raw: &str) -> Option<String> {
	let parsed = Url::parse(raw.trim()).ok()?;
	let host = parsed.host_str()?.to_lowercase();
	let labels: Vec<&str> =
		host.split('.').filter(|label| !label.is_empty() && *label != "www").collect();

	match labels.len() {
		0 => None,
		1 => Some(labels[0].to_string()),
		len => Some(labels[len - 2].to_string()),
	}
}

/// Path segments of a URL, split on the same separators as `normalize_url`.
pub fn url_path_words(raw: &str) -> Vec<String> {
	let Ok(parsed) = Url::parse(raw.trim()) else { return Vec::new() };

	replace_separators(&parsed.path().to_lowercase())
		.split_whitespace()
		.map(str::to_string)
		.collect()
}

/// Lowercase alphanumeric words of free text.
pub fn words(text: &str) -> Vec<String> {
	let mut normalized = String::with_capacity(text.len());

	for ch in text.chars() {
		if ch.is_alphanumeric() {
			normalized.extend(ch.to_lowercase());
		} else {
			normalized.push(' ');
		}
	}

	normalized.split_whitespace().map(str::to_string).collect()
}

/// Truncates to at most `max_chars` characters without splitting one.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
	match text.char_indices().nth(max_chars) {
		Some((idx, _)) => text[..idx].to_string(),
		None => text.to_string(),
	}
}

fn replace_separators(text: &str) -> String {
	text.chars().map(|ch| if URL_SEPARATORS.contains(&ch) { ' ' } else { ch }).collect()
}
