pub mod backends;
pub mod documents;
pub mod notes;
pub mod search;
pub mod similar;
pub mod time_range;
pub mod time_serde;
pub mod validation;

mod error;

pub use documents::{DocumentChunk, IndexDocumentRequest, IndexDocumentResponse};
pub use error::{Error, Result};
pub use notes::{CreateNoteRequest, NoteOrigin, NoteStatus, ResearchNote, UpdateNoteRequest};
pub use search::{
	ResultSource, SearchRequest, SearchResponse, SearchResult, SearchType, VisualReference,
};
pub use time_range::TimeRangeSearchRequest;
pub use validation::ValidateNoteRequest;

use std::{future::Future, pin::Pin, sync::Arc};

use serde_json::{Map, Value};
use time::OffsetDateTime;
use uuid::Uuid;

use docex_config::{Config, EmbeddingProviderConfig};
use docex_providers::embedding;
use docex_storage::{
	db::Db,
	index::{IndexHit, IndexKind, IndexPoint, IndexQuery},
	models::{NewResearchNote, ResearchNoteRow, ValidationVerdict},
	qdrant::QdrantStore,
};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, Result<Vec<Vec<f32>>>>;
}

/// Nearest-neighbor index over the documents and notes collections.
pub trait VectorIndex
where
	Self: Send + Sync,
{
	fn search<'a>(&'a self, query: &'a IndexQuery) -> BoxFuture<'a, Result<Vec<IndexHit>>>;

	fn upsert<'a>(&'a self, kind: IndexKind, points: Vec<IndexPoint>) -> BoxFuture<'a, Result<()>>;

	fn delete<'a>(&'a self, kind: IndexKind, id: Uuid) -> BoxFuture<'a, Result<()>>;

	fn set_payload<'a>(
		&'a self,
		kind: IndexKind,
		id: Uuid,
		fields: Map<String, Value>,
	) -> BoxFuture<'a, Result<()>>;
}

/// Source of truth for research notes and their validation state.
pub trait NoteStore
where
	Self: Send + Sync,
{
	fn insert<'a>(&'a self, note: &'a NewResearchNote<'a>)
	-> BoxFuture<'a, Result<ResearchNoteRow>>;

	fn get<'a>(&'a self, note_id: Uuid) -> BoxFuture<'a, Result<Option<ResearchNoteRow>>>;

	fn list_by_document<'a>(
		&'a self,
		document_id: &'a str,
		verified_only: bool,
	) -> BoxFuture<'a, Result<Vec<ResearchNoteRow>>>;

	fn update<'a>(
		&'a self,
		note_id: Uuid,
		content: Option<&'a str>,
		metadata: Option<&'a Value>,
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<ResearchNoteRow>>;

	/// Overwrites the stored row with `row`, used to undo a change the index did not accept.
	fn restore<'a>(&'a self, row: &'a ResearchNoteRow) -> BoxFuture<'a, Result<ResearchNoteRow>>;

	fn delete<'a>(&'a self, note_id: Uuid) -> BoxFuture<'a, Result<()>>;

	fn submit<'a>(
		&'a self,
		note_id: Uuid,
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<ResearchNoteRow>>;

	fn record_validation<'a>(
		&'a self,
		note_id: Uuid,
		verdict: &'a ValidationVerdict<'a>,
	) -> BoxFuture<'a, Result<Option<ResearchNoteRow>>>;

	fn list_by_status<'a>(
		&'a self,
		status: NoteStatus,
		document_id: Option<&'a str>,
	) -> BoxFuture<'a, Result<Vec<ResearchNoteRow>>>;
}

#[derive(Clone)]
pub struct Providers {
	pub embedding: Arc<dyn EmbeddingProvider>,
}
impl Providers {
	pub fn new(embedding: Arc<dyn EmbeddingProvider>) -> Self {
		Self { embedding }
	}
}
impl Default for Providers {
	fn default() -> Self {
		Self { embedding: Arc::new(DefaultProviders) }
	}
}

struct DefaultProviders;
impl EmbeddingProvider for DefaultProviders {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, Result<Vec<Vec<f32>>>> {
		Box::pin(async move { Ok(embedding::embed(cfg, texts).await?) })
	}
}

pub struct DocexService {
	pub cfg: Config,
	pub notes: Arc<dyn NoteStore>,
	pub index: Arc<dyn VectorIndex>,
	pub providers: Providers,
}
impl DocexService {
	pub fn new(cfg: Config, db: Db, qdrant: QdrantStore) -> Self {
		Self::with_parts(cfg, Arc::new(db), Arc::new(qdrant), Providers::default())
	}

	pub fn with_parts(
		cfg: Config,
		notes: Arc<dyn NoteStore>,
		index: Arc<dyn VectorIndex>,
		providers: Providers,
	) -> Self {
		Self { cfg, notes, index, providers }
	}

	pub(crate) async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
		let vectors = self.providers.embedding.embed(&self.cfg.providers.embedding, texts).await?;

		if vectors.len() != texts.len() {
			return Err(Error::Provider {
				message: format!(
					"Embedding provider returned {} vectors for {} inputs.",
					vectors.len(),
					texts.len()
				),
			});
		}

		let expected = self.cfg.storage.qdrant.vector_dim as usize;

		if vectors.iter().any(|vec| vec.len() != expected) {
			return Err(Error::Provider {
				message: "Embedding vector dimension mismatch.".to_string(),
			});
		}

		Ok(vectors)
	}

	pub(crate) async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
		let mut vectors = self.embed_texts(&[text.to_string()]).await?;

		vectors.pop().ok_or_else(|| Error::Provider {
			message: "Embedding provider returned no vectors.".to_string(),
		})
	}
}

/// Trims a required free-text field, rejecting blank input.
pub(crate) fn required_text<'a>(value: &'a str, field: &str) -> Result<&'a str> {
	let trimmed = value.trim();

	if trimmed.is_empty() {
		return Err(Error::invalid(format!("{field} must be non-empty.")));
	}

	Ok(trimmed)
}

/// Treats a blank optional scope as absent.
pub(crate) fn optional_scope(value: Option<&str>) -> Option<&str> {
	value.map(str::trim).filter(|value| !value.is_empty())
}
