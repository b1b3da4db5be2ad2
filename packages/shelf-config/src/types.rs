use serde::Deserialize;
use serde_json::{Map, Value};

pub const LOCAL_HASH_PROVIDER_ID: &str = "local-hash";

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub providers: Providers,
	#[serde(default)]
	pub ranking: Ranking,
	#[serde(default)]
	pub search: Search,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Service {
	#[serde(default = "default_log_level")]
	pub log_level: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
	pub qdrant: Qdrant,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Qdrant {
	pub url: String,
	pub collection: String,
	pub text_vector_dim: u32,
	pub image_vector_dim: u32,
	/// Upper bound for a single index call before it is reported as unavailable.
	#[serde(default = "default_qdrant_timeout_ms")]
	pub timeout_ms: u64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Providers {
	pub embedding: EmbeddingProviderConfig,
}

#[derive(Clone, Debug, Deserialize)]
pub struct EmbeddingProviderConfig {
	/// `openai-compatible` for the HTTP backend, `local-hash` for the offline hasher.
	pub provider_id: String,
	#[serde(default)]
	pub api_base: String,
	#[serde(default)]
	pub api_key: String,
	#[serde(default)]
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}
impl EmbeddingProviderConfig {
	pub fn is_local(&self) -> bool {
		self.provider_id == LOCAL_HASH_PROVIDER_ID
	}
}

/// Weights of `alpha * vector + beta * tag_jaccard + gamma * location_bonus`.
///
/// They are not required to sum to one.
#[derive(Clone, Copy, Debug, Deserialize)]
pub struct Ranking {
	#[serde(default = "default_alpha")]
	pub alpha: f64,
	#[serde(default = "default_beta")]
	pub beta: f64,
	#[serde(default = "default_gamma")]
	pub gamma: f64,
}
impl Default for Ranking {
	fn default() -> Self {
		Self { alpha: default_alpha(), beta: default_beta(), gamma: default_gamma() }
	}
}

#[derive(Clone, Copy, Debug, Deserialize)]
pub struct Search {
	#[serde(default = "default_limit")]
	pub default_limit: u32,
	#[serde(default = "default_max_limit")]
	pub max_limit: u32,
}
impl Default for Search {
	fn default() -> Self {
		Self { default_limit: default_limit(), max_limit: default_max_limit() }
	}
}

fn default_log_level() -> String {
	"info".to_string()
}

fn default_qdrant_timeout_ms() -> u64 {
	5_000
}

fn default_alpha() -> f64 {
	0.7
}

fn default_beta() -> f64 {
	0.2
}

fn default_gamma() -> f64 {
	0.1
}

fn default_limit() -> u32 {
	10
}

fn default_max_limit() -> u32 {
	100
}
