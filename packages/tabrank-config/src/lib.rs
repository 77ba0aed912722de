mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Cache, Config, Lexical, LexicalWeights, LlmProviderConfig, Providers, Search, Semantic,
	Service,
};

use std::{fs, path::Path};

pub const SEARCH_MODES: [&str; 3] = ["hybrid", "semantic_only", "aggressive"];

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.log_level.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.log_level must be non-empty.".to_string(),
		});
	}
	if !SEARCH_MODES.contains(&cfg.search.mode.as_str()) {
		return Err(Error::Validation {
			message: "search.mode must be one of hybrid, semantic_only, or aggressive."
				.to_string(),
		});
	}

	let weights = &cfg.lexical.weights;

	for (label, weight) in [
		("lexical.weights.title", weights.title),
		("lexical.weights.tags", weights.tags),
		("lexical.weights.summary", weights.summary),
		("lexical.weights.url", weights.url),
		("lexical.weights.content", weights.content),
		("lexical.min_score_floor", cfg.lexical.min_score_floor),
		("lexical.min_score_per_term", cfg.lexical.min_score_per_term),
	] {
		if !weight.is_finite() {
			return Err(Error::Validation { message: format!("{label} must be a finite number.") });
		}
		if weight < 0.0 {
			return Err(Error::Validation { message: format!("{label} must be zero or greater.") });
		}
	}

	if cfg.lexical.min_term_len == 0 {
		return Err(Error::Validation {
			message: "lexical.min_term_len must be greater than zero.".to_string(),
		});
	}

	let semantic = &cfg.semantic;

	for (label, score) in [
		("semantic.primary_min_score", semantic.primary_min_score),
		("semantic.fallback_min_score", semantic.fallback_min_score),
	] {
		if !score.is_finite() || !(1.0..=10.0).contains(&score) {
			return Err(Error::Validation {
				message: format!("{label} must be in the range 1.0-10.0."),
			});
		}
	}

	if semantic.fallback_min_score > semantic.primary_min_score {
		return Err(Error::Validation {
			message: "semantic.fallback_min_score must not exceed semantic.primary_min_score."
				.to_string(),
		});
	}

	for (label, ratio) in [
		("semantic.primary_keyword_coverage", semantic.primary_keyword_coverage),
		("semantic.fallback_keyword_coverage", semantic.fallback_keyword_coverage),
	] {
		if !ratio.is_finite() || !(0.0..=1.0).contains(&ratio) {
			return Err(Error::Validation {
				message: format!("{label} must be in the range 0.0-1.0."),
			});
		}
	}

	if semantic.min_quote_chars == 0 {
		return Err(Error::Validation {
			message: "semantic.min_quote_chars must be greater than zero.".to_string(),
		});
	}
	if cfg.cache.durable_ttl_secs == 0 {
		return Err(Error::Validation {
			message: "cache.durable_ttl_secs must be greater than zero.".to_string(),
		});
	}
	if cfg.cache.session_ttl_secs == 0 {
		return Err(Error::Validation {
			message: "cache.session_ttl_secs must be greater than zero.".to_string(),
		});
	}
	if cfg.cache.summary_max_chars == 0 {
		return Err(Error::Validation {
			message: "cache.summary_max_chars must be greater than zero.".to_string(),
		});
	}

	let llm = &cfg.providers.llm;

	for (label, value) in [
		("providers.llm.provider_id", &llm.provider_id),
		("providers.llm.api_base", &llm.api_base),
		("providers.llm.model", &llm.model),
	] {
		if value.trim().is_empty() {
			return Err(Error::Validation { message: format!("{label} must be non-empty.") });
		}
	}

	if llm.timeout_ms == 0 {
		return Err(Error::Validation {
			message: "providers.llm.timeout_ms must be greater than zero.".to_string(),
		});
	}
	if !llm.temperature.is_finite() || llm.temperature < 0.0 {
		return Err(Error::Validation {
			message: "providers.llm.temperature must be a finite number zero or greater."
				.to_string(),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	cfg.search.mode = cfg.search.mode.trim().to_ascii_lowercase();
	cfg.providers.llm.api_base = cfg.providers.llm.api_base.trim_end_matches('/').to_string();
}
