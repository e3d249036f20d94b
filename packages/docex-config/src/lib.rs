mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	ApiToken, Config, EmbeddingProviderConfig, Postgres, Providers, Qdrant, Search, Security,
	Service, Storage,
};

use std::{collections::HashSet, fs, path::Path};

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
	if cfg.service.http_bind.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.http_bind must be non-empty.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions == 0 {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions != cfg.storage.qdrant.vector_dim {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must match storage.qdrant.vector_dim."
				.to_string(),
		});
	}
	if cfg.providers.embedding.api_key.trim().is_empty() {
		return Err(Error::Validation {
			message: "providers.embedding.api_key must be non-empty.".to_string(),
		});
	}

	let qdrant = &cfg.storage.qdrant;

	for (label, value) in [
		("storage.qdrant.documents_collection", &qdrant.documents_collection),
		("storage.qdrant.notes_collection", &qdrant.notes_collection),
	] {
		if value.trim().is_empty() {
			return Err(Error::Validation { message: format!("{label} must be non-empty.") });
		}
	}

	if qdrant.documents_collection == qdrant.notes_collection {
		return Err(Error::Validation {
			message: "storage.qdrant.documents_collection and storage.qdrant.notes_collection must differ."
				.to_string(),
		});
	}

	for (label, value) in [
		("search.candidate_k", cfg.search.candidate_k),
		("search.max_page_size", cfg.search.max_page_size),
		("search.time_range_scan_limit", cfg.search.time_range_scan_limit),
	] {
		if value == 0 {
			return Err(Error::Validation {
				message: format!("{label} must be greater than zero."),
			});
		}
	}

	if cfg.search.similar_notes_limit == 0
		|| cfg.search.similar_notes_limit > cfg.search.max_page_size
	{
		return Err(Error::Validation {
			message: "search.similar_notes_limit must be between 1 and search.max_page_size."
				.to_string(),
		});
	}
	if cfg.security.api_tokens.is_empty() {
		return Err(Error::Validation {
			message: "security.api_tokens must contain at least one token.".to_string(),
		});
	}

	let mut seen = HashSet::new();

	for entry in &cfg.security.api_tokens {
		if entry.token.trim().is_empty() || entry.user_id.trim().is_empty() {
			return Err(Error::Validation {
				message: "security.api_tokens entries must have a non-empty token and user_id."
					.to_string(),
			});
		}
		if !seen.insert(entry.token.as_str()) {
			return Err(Error::Validation {
				message: "security.api_tokens must not repeat a token.".to_string(),
			});
		}
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	cfg.providers.embedding.api_base =
		cfg.providers.embedding.api_base.trim().trim_end_matches('/').to_string();

	for entry in &mut cfg.security.api_tokens {
		entry.token = entry.token.trim().to_string();
		entry.user_id = entry.user_id.trim().to_string();
	}
}
