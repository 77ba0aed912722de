use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
	#[serde(default)]
	pub service: Service,
	#[serde(default)]
	pub search: Search,
	#[serde(default)]
	pub lexical: Lexical,
	#[serde(default)]
	pub semantic: Semantic,
	#[serde(default)]
	pub cache: Cache,
	pub providers: Providers,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Service {
	#[serde(default = "default_log_level")]
	pub log_level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Search {
	/// One of "hybrid", "semantic_only", or "aggressive".
	#[serde(default = "default_search_mode")]
	pub mode: String,
	/// Upper bound on ids kept in a result set. Zero keeps everything.
	#[serde(default)]
	pub max_results: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Lexical {
	#[serde(default)]
	pub weights: LexicalWeights,
	#[serde(default = "default_min_term_len")]
	pub min_term_len: u32,
	#[serde(default = "default_min_score_floor")]
	pub min_score_floor: f32,
	#[serde(default = "default_min_score_per_term")]
	pub min_score_per_term: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LexicalWeights {
	#[serde(default = "default_title_weight")]
	pub title: f32,
	#[serde(default = "default_tags_weight")]
	pub tags: f32,
	#[serde(default = "default_summary_weight")]
	pub summary: f32,
	#[serde(default = "default_url_weight")]
	pub url: f32,
	/// Used in place of `summary` when scoring full page text.
	#[serde(default = "default_content_weight")]
	pub content: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Semantic {
	#[serde(default = "default_true")]
	pub enabled: bool,
	#[serde(default = "default_primary_min_score")]
	pub primary_min_score: f32,
	#[serde(default = "default_fallback_min_score")]
	pub fallback_min_score: f32,
	#[serde(default = "default_primary_keyword_coverage")]
	pub primary_keyword_coverage: f32,
	#[serde(default = "default_fallback_keyword_coverage")]
	pub fallback_keyword_coverage: f32,
	/// Reasons at least this long skip the keyword coverage check.
	#[serde(default = "default_coverage_exempt_reason_chars")]
	pub coverage_exempt_reason_chars: u32,
	#[serde(default = "default_min_quote_chars")]
	pub min_quote_chars: u32,
	/// Reject reasons that quote nothing from the document.
	#[serde(default)]
	pub require_quote: bool,
	/// Documents beyond this count are not sent to the model. Zero sends all of them.
	#[serde(default)]
	pub max_documents: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Cache {
	#[serde(default = "default_durable_ttl_secs")]
	pub durable_ttl_secs: u64,
	#[serde(default = "default_session_ttl_secs")]
	pub session_ttl_secs: u64,
	#[serde(default = "default_summary_max_chars")]
	pub summary_max_chars: u32,
	#[serde(default = "default_max_tags")]
	pub max_tags: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Providers {
	pub llm: LlmProviderConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub temperature: f32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

impl Default for Service {
	fn default() -> Self {
		Self { log_level: default_log_level() }
	}
}

impl Default for Search {
	fn default() -> Self {
		Self { mode: default_search_mode(), max_results: 0 }
	}
}

impl Default for Lexical {
	fn default() -> Self {
		Self {
			weights: LexicalWeights::default(),
			min_term_len: default_min_term_len(),
			min_score_floor: default_min_score_floor(),
			min_score_per_term: default_min_score_per_term(),
		}
	}
}

impl Default for LexicalWeights {
	fn default() -> Self {
		Self {
			title: default_title_weight(),
			tags: default_tags_weight(),
			summary: default_summary_weight(),
			url: default_url_weight(),
			content: default_content_weight(),
		}
	}
}

impl Default for Semantic {
	fn default() -> Self {
		Self {
			enabled: true,
			primary_min_score: default_primary_min_score(),
			fallback_min_score: default_fallback_min_score(),
			primary_keyword_coverage: default_primary_keyword_coverage(),
			fallback_keyword_coverage: default_fallback_keyword_coverage(),
			coverage_exempt_reason_chars: default_coverage_exempt_reason_chars(),
			min_quote_chars: default_min_quote_chars(),
			require_quote: false,
			max_documents: 0,
		}
	}
}

impl Default for Cache {
	fn default() -> Self {
		Self {
			durable_ttl_secs: default_durable_ttl_secs(),
			session_ttl_secs: default_session_ttl_secs(),
			summary_max_chars: default_summary_max_chars(),
			max_tags: default_max_tags(),
		}
	}
}

fn default_log_level() -> String {
	"info".to_string()
}

fn default_search_mode() -> String {
	"hybrid".to_string()
}

fn default_true() -> bool {
	true
}

fn default_min_term_len() -> u32 {
	3
}

fn default_min_score_floor() -> f32 {
	4.0
}

fn default_min_score_per_term() -> f32 {
	2.0
}

fn default_title_weight() -> f32 {
	5.0
}

fn default_tags_weight() -> f32 {
	7.0
}

fn default_summary_weight() -> f32 {
	3.0
}

fn default_url_weight() -> f32 {
	1.0
}

fn default_content_weight() -> f32 {
	4.0
}

fn default_primary_min_score() -> f32 {
	6.0
}

fn default_fallback_min_score() -> f32 {
	4.0
}

fn default_primary_keyword_coverage() -> f32 {
	0.4
}

fn default_fallback_keyword_coverage() -> f32 {
	0.3
}

fn default_coverage_exempt_reason_chars() -> u32 {
	50
}

fn default_min_quote_chars() -> u32 {
	5
}

fn default_durable_ttl_secs() -> u64 {
	86_400
}

fn default_session_ttl_secs() -> u64 {
	300
}

fn default_summary_max_chars() -> u32 {
	500
}

fn default_max_tags() -> u32 {
	30
}
