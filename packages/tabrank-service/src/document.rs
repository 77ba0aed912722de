use std::fmt;

use serde::{Deserialize, Serialize};

use tabrank_domain::{tags, text};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(pub u64);
impl fmt::Display for DocumentId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl From<u64> for DocumentId {
	fn from(value: u64) -> Self {
		Self(value)
	}
}

/// What the document provider knows about an open tab before any text is read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMeta {
	pub id: DocumentId,
	pub title: String,
	pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
	pub id: DocumentId,
	pub title: String,
	pub url: String,
	/// Raw page text. Empty unless the page was read during this search.
	#[serde(default)]
	pub text: String,
	#[serde(default)]
	pub summary: String,
	#[serde(default)]
	pub tags: Vec<String>,
}
impl Document {
	pub fn from_meta(meta: DocumentMeta) -> Self {
		Self {
			id: meta.id,
			title: meta.title,
			url: meta.url,
			text: String::new(),
			summary: String::new(),
			tags: Vec::new(),
		}
	}

	pub fn meta(&self) -> DocumentMeta {
		DocumentMeta { id: self.id, title: self.title.clone(), url: self.url.clone() }
	}

	/// Text used when the page itself cannot be read.
	pub fn fallback_text(&self) -> String {
		format!("{} {}", self.title, self.url).trim().to_string()
	}

	pub fn tags_text(&self) -> String {
		self.tags.join(" ")
	}

	pub fn normalized_url(&self) -> String {
		text::normalize_url(&self.url)
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryInput {
	pub id: DocumentId,
	pub title: String,
	pub url: String,
	pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryRecord {
	pub id: DocumentId,
	pub summary: String,
	pub tags: Vec<String>,
}
impl SummaryRecord {
	/// Deterministic summary and tags built without a model.
	pub fn fallback(meta: &DocumentMeta, max_chars: usize, max_tags: usize) -> Self {
		Self {
			id: meta.id,
			summary: tags::fallback_summary(&meta.title, &meta.url, max_chars),
			tags: tags::heuristic_tags(&meta.title, &meta.url, max_tags),
		}
	}

	/// Clamps model output to the summary and tag limits.
	pub fn normalized(self, max_chars: usize, max_tags: usize) -> Self {
		Self {
			id: self.id,
			summary: text::truncate_chars(self.summary.trim(), max_chars),
			tags: tags::normalize_tags(self.tags, max_tags),
		}
	}
}
