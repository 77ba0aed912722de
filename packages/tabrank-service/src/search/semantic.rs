use std::collections::{BTreeSet, HashMap};

use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::{
	BoxFuture, Document, DocumentId, Error, ModelSessions, Result,
	search::{
		ParsedQuery, ResultSource, ScoredCandidate, Scorer, check_cancelled,
		validation::{self, Accepted},
	},
};
use tabrank_config::Semantic;
use tabrank_domain::text;

pub const SEARCH_PURPOSE: &str = "search";
pub const SYSTEM_PROMPT: &str = "You are a relevance judge for a browser tab search engine. \
Output must be valid JSON only and must match the provided schema exactly. \
A document is relevant only when ALL of the query keywords are contextually present in it. \
Treat the Tags field as the ground truth of a document's topic. \
Every reason must quote, in single quotes, exact text copied from that document's title, \
summary, URL, or tags. Do not hedge. Omit documents you are unsure about. \
Refer to documents only by their ref.";

const SUMMARY_PROMPT_CHARS: usize = 300;

/// Per-call mapping between prompt references (`doc1`, `doc2`, ...) and documents.
///
/// Real ids never appear in prompt text.
#[derive(Debug)]
pub struct RefTable<'a> {
	documents: Vec<(String, &'a Document)>,
	by_ref: HashMap<String, usize>,
	by_id: HashMap<DocumentId, usize>,
}
impl<'a> RefTable<'a> {
	pub fn new(documents: &'a [Document]) -> Self {
		let mut table = Self {
			documents: Vec::with_capacity(documents.len()),
			by_ref: HashMap::new(),
			by_id: HashMap::new(),
		};

		for document in documents {
			if table.by_id.contains_key(&document.id) {
				continue;
			}

			let index = table.documents.len();
			let reference = format!("doc{}", index + 1);

			table.by_ref.insert(reference.clone(), index);
			table.by_id.insert(document.id, index);
			table.documents.push((reference, document));
		}

		table
	}

	/// Resolves a model-supplied reference. Surrounding brackets and case are ignored.
	pub fn resolve(&self, reference: &str) -> Option<&'a Document> {
		let key = reference.trim().trim_start_matches('[').trim_end_matches(']').to_lowercase();

		self.by_ref.get(&key).map(|index| self.documents[*index].1)
	}

	pub fn reference(&self, id: DocumentId) -> Option<&str> {
		self.by_id.get(&id).map(|index| self.documents[*index].0.as_str())
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &'a Document)> + '_ {
		self.documents.iter().map(|(reference, document)| (reference.as_str(), *document))
	}

	pub fn len(&self) -> usize {
		self.documents.len()
	}

	pub fn is_empty(&self) -> bool {
		self.documents.is_empty()
	}
}

/// Asks the language model to rank documents, then keeps only the answers it can verify.
#[derive(Clone)]
pub struct SemanticScorer {
	models: ModelSessions,
	cfg: Semantic,
}
impl SemanticScorer {
	pub fn new(models: ModelSessions, cfg: Semantic) -> Self {
		Self { models, cfg }
	}

	/// Returns the raw model output, or `None` when the model is unavailable or failed.
	async fn ask(
		&self,
		prompt: &str,
		schema: &Value,
		cancel: &CancellationToken,
	) -> Result<Option<String>> {
		let session = tokio::select! {
			biased;

			_ = cancel.cancelled() => return Err(Error::Cancelled),
			session = self.models.session(SEARCH_PURPOSE, SYSTEM_PROMPT) => session,
		};
		let session = match session {
			Ok(Some(session)) => session,
			Ok(None) => {
				tracing::info!("Language model unavailable. Skipping semantic scoring.");

				return Ok(None);
			},
			Err(Error::Cancelled) => return Err(Error::Cancelled),
			Err(err) => {
				tracing::warn!(error = %err, "Model session creation failed.");

				return Ok(None);
			},
		};

		check_cancelled(cancel)?;

		match self.models.prompt(&session, prompt, Some(schema), cancel).await {
			Ok(raw) => {
				check_cancelled(cancel)?;

				Ok(raw)
			},
			Err(Error::Cancelled) => Err(Error::Cancelled),
			Err(err) => {
				tracing::warn!(error = %err, "Semantic scoring request failed.");

				self.models.reset(SEARCH_PURPOSE);

				Ok(None)
			},
		}
	}
}

impl Scorer for SemanticScorer {
	fn source(&self) -> ResultSource {
		ResultSource::Semantic
	}

	fn score<'a>(
		&'a self,
		documents: &'a [Document],
		query: &'a ParsedQuery,
		cancel: &'a CancellationToken,
	) -> BoxFuture<'a, Result<Vec<ScoredCandidate>>> {
		Box::pin(async move {
			check_cancelled(cancel)?;

			let documents = match self.cfg.max_documents as usize {
				0 => documents,
				max => &documents[..documents.len().min(max)],
			};

			if documents.is_empty() {
				return Ok(Vec::new());
			}

			let refs = RefTable::new(documents);
			let prompt = build_prompt(query, &refs);
			let schema = response_schema();
			let Some(raw) = self.ask(&prompt, &schema, cancel).await? else {
				return Ok(Vec::new());
			};
			let payload = match tabrank_providers::llm::parse_json_payload(&raw) {
				Ok(payload) => payload,
				Err(err) => {
					tracing::warn!(error = %err, "Semantic scoring returned unreadable output.");

					return Ok(Vec::new());
				},
			};
			let accepted = validation::validate(&payload, &refs, &query.keywords, &self.cfg);

			tracing::debug!(
				offered = refs.len(),
				accepted = accepted.len(),
				"Semantic scoring finished."
			);

			Ok(accepted.into_iter().map(|accepted| candidate(accepted, &query.keywords)).collect())
		})
	}
}

pub fn response_schema() -> Value {
	serde_json::json!({
		"type": "object",
		"properties": {
			"results": {
				"type": "array",
				"items": {
					"type": "object",
					"properties": {
						"ref": { "type": "string" },
						"relevanceScore": { "type": "number", "minimum": 1, "maximum": 10 },
						"reason": { "type": "string" }
					},
					"required": ["ref", "relevanceScore", "reason"],
					"additionalProperties": false
				}
			}
		},
		"required": ["results"],
		"additionalProperties": false
	})
}

/// Builds the user prompt. Documents are listed by reference only.
pub fn build_prompt(query: &ParsedQuery, refs: &RefTable<'_>) -> String {
	let schema = r#"{"results": [{"ref": "docN", "relevanceScore": 1-10, "reason": "string"}]}"#;
	let mut prompt = format!(
		"Return JSON matching this exact schema:\n{schema}\nQuery:\n{query}\n\
Keywords:\n{keywords}\nDocuments:\n",
		query = query.raw,
		keywords = query.keywords.join(", "),
	);

	for (reference, document) in refs.iter() {
		prompt.push_str(&format!(
			"[{reference}]\nTitle: {title}\nURL: {url}\nTags: {tags}\nSummary: {summary}\n\n",
			title = document.title,
			url = document.url,
			tags = document.tags.join(", "),
			summary = text::truncate_chars(&document.summary, SUMMARY_PROMPT_CHARS),
		));
	}

	prompt
}

fn candidate(accepted: Accepted, keywords: &[String]) -> ScoredCandidate {
	let reason = accepted.reason.to_lowercase();
	let matched_terms =
		keywords.iter().filter(|keyword| reason.contains(keyword.as_str())).cloned().collect();

	ScoredCandidate {
		id: accepted.id,
		score: accepted.score,
		matched_fields: BTreeSet::new(),
		matched_terms,
		reason: accepted.reason,
		source: ResultSource::Semantic,
	}
}
