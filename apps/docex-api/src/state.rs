use std::{collections::HashMap, sync::Arc};

use docex_service::DocexService;
use docex_storage::{db::Db, qdrant::QdrantStore};

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<DocexService>,
	/// Bearer token to user id.
	pub tokens: Arc<HashMap<String, String>>,
}
impl AppState {
	pub async fn new(config: docex_config::Config) -> color_eyre::Result<Self> {
		let db = Db::connect(&config.storage.postgres).await?;

		db.ensure_schema().await?;

		let qdrant = QdrantStore::new(&config.storage.qdrant)?;

		qdrant.ensure_collections().await?;

		let service = DocexService::new(config, db, qdrant);

		Ok(Self::from_service(Arc::new(service)))
	}

	pub fn from_service(service: Arc<DocexService>) -> Self {
		let tokens = service
			.cfg
			.security
			.api_tokens
			.iter()
			.map(|entry| (entry.token.clone(), entry.user_id.clone()))
			.collect();

		Self { service, tokens: Arc::new(tokens) }
	}
}
