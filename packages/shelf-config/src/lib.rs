mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Config, EmbeddingProviderConfig, LOCAL_HASH_PROVIDER_ID, Postgres, Providers, Qdrant, Ranking,
	Search, Service, Storage,
};

use std::{fs, path::Path};

/// Hard ceiling on results per search request.
pub const SEARCH_LIMIT_CEILING: u32 = 100;

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	parse(&raw).map_err(|err| match err {
		Error::ParseConfig { source, .. } =>
			Error::ParseConfig { path: path.to_path_buf(), source },
		other => other,
	})
}

pub fn parse(raw: &str) -> Result<Config> {
	let mut cfg: Config = toml::from_str(raw)
		.map_err(|err| Error::ParseConfig { path: Default::default(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.storage.postgres.dsn.trim().is_empty() {
		return Err(Error::Validation {
			message: "storage.postgres.dsn must be non-empty.".to_string(),
		});
	}
	if cfg.storage.postgres.pool_max_conns == 0 {
		return Err(Error::Validation {
			message: "storage.postgres.pool_max_conns must be greater than zero.".to_string(),
		});
	}
	if cfg.storage.qdrant.collection.is_empty() {
		return Err(Error::Validation {
			message: "storage.qdrant.collection must be non-empty.".to_string(),
		});
	}
	if cfg.storage.qdrant.text_vector_dim == 0 || cfg.storage.qdrant.image_vector_dim == 0 {
		return Err(Error::Validation {
			message: "storage.qdrant vector dimensions must be greater than zero.".to_string(),
		});
	}
	if cfg.storage.qdrant.timeout_ms == 0 {
		return Err(Error::Validation {
			message: "storage.qdrant.timeout_ms must be greater than zero.".to_string(),
		});
	}

	let embedding = &cfg.providers.embedding;

	if embedding.dimensions == 0 {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must be greater than zero.".to_string(),
		});
	}
	if embedding.dimensions != cfg.storage.qdrant.text_vector_dim {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must match storage.qdrant.text_vector_dim."
				.to_string(),
		});
	}
	if embedding.timeout_ms == 0 {
		return Err(Error::Validation {
			message: "providers.embedding.timeout_ms must be greater than zero.".to_string(),
		});
	}
	if !embedding.is_local() {
		for (label, value) in [
			("api_base", &embedding.api_base),
			("api_key", &embedding.api_key),
			("path", &embedding.path),
		] {
			if value.trim().is_empty() {
				return Err(Error::Validation {
					message: format!("providers.embedding.{label} must be non-empty."),
				});
			}
		}
	}

	for (label, weight) in [
		("ranking.alpha", cfg.ranking.alpha),
		("ranking.beta", cfg.ranking.beta),
		("ranking.gamma", cfg.ranking.gamma),
	] {
		if !weight.is_finite() {
			return Err(Error::Validation { message: format!("{label} must be a finite number.") });
		}
	}

	if cfg.search.max_limit == 0 || cfg.search.max_limit > SEARCH_LIMIT_CEILING {
		return Err(Error::Validation {
			message: format!("search.max_limit must be in the range 1-{SEARCH_LIMIT_CEILING}."),
		});
	}
	if cfg.search.default_limit == 0 || cfg.search.default_limit > cfg.search.max_limit {
		return Err(Error::Validation {
			message: "search.default_limit must be in the range 1-search.max_limit.".to_string(),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	let log_level = cfg.service.log_level.trim();

	cfg.service.log_level =
		if log_level.is_empty() { "info".to_string() } else { log_level.to_string() };
	cfg.storage.qdrant.collection = cfg.storage.qdrant.collection.trim().to_string();
}
