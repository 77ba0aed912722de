#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HashtagQuery {
	pub is_hashtag_search: bool,
	pub tags: Vec<String>,
}

pub fn parse_hashtag_query(query: &str) -> HashtagQuery {
	if !query.contains('#') {
		return HashtagQuery::default();
	}

	let mut tags: Vec<String> = Vec::new();

	for token in query.split(|ch: char| ch.is_whitespace() || ch == ',') {
		let Some(raw) = token.strip_prefix('#') else { continue };
		let tag = raw.trim_start_matches('#').to_lowercase();

		if tag.is_empty() || tags.contains(&tag) {
			continue;
		}

		tags.push(tag);
	}

	HashtagQuery { is_hashtag_search: !tags.is_empty(), tags }
}

/// Case-insensitive equality or containment in either direction.
pub fn tag_matches(document_tag: &str, query_tag: &str) -> bool {
	let document_tag = document_tag.trim().to_lowercase();
	let query_tag = query_tag.trim().to_lowercase();

	if document_tag.is_empty() || query_tag.is_empty() {
		return false;
	}

	document_tag == query_tag
		|| document_tag.contains(&query_tag)
		|| query_tag.contains(&document_tag)
}
