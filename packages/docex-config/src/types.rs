use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub providers: Providers,
	#[serde(default)]
	pub search: Search,
	pub security: Security,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub log_level: String,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
	pub qdrant: Qdrant,
}

#[derive(Debug, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

#[derive(Debug, Deserialize)]
pub struct Qdrant {
	pub url: String,
	/// Collection holding document chunks.
	pub documents_collection: String,
	/// Collection holding research notes.
	pub notes_collection: String,
	pub vector_dim: u32,
}

#[derive(Debug, Deserialize)]
pub struct Providers {
	pub embedding: EmbeddingProviderConfig,
}

#[derive(Debug, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Search {
	/// Hits requested from each index per hybrid search.
	pub candidate_k: u32,
	pub max_page_size: u32,
	/// Hits scanned from each index per time-range search.
	pub time_range_scan_limit: u32,
	pub similar_notes_limit: u32,
}
impl Default for Search {
	fn default() -> Self {
		Self {
			candidate_k: 50,
			max_page_size: 100,
			time_range_scan_limit: 1_000,
			similar_notes_limit: 5,
		}
	}
}

#[derive(Debug, Deserialize)]
pub struct Security {
	pub bind_localhost_only: bool,
	#[serde(default)]
	pub api_tokens: Vec<ApiToken>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiToken {
	pub token: String,
	pub user_id: String,
}
