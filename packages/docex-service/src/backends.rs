//! Production bindings of the service traits to Postgres and Qdrant.

use serde_json::{Map, Value};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{BoxFuture, NoteStatus, NoteStore, Result, VectorIndex};
use docex_storage::{
	db::Db,
	index::{IndexHit, IndexKind, IndexPoint, IndexQuery},
	models::{NewResearchNote, ResearchNoteRow, ValidationVerdict},
	notes,
	qdrant::QdrantStore,
};

impl VectorIndex for QdrantStore {
	fn search<'a>(&'a self, query: &'a IndexQuery) -> BoxFuture<'a, Result<Vec<IndexHit>>> {
		Box::pin(async move { Ok(QdrantStore::search(self, query).await?) })
	}

	fn upsert<'a>(&'a self, kind: IndexKind, points: Vec<IndexPoint>) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move { Ok(self.upsert_points(kind, points).await?) })
	}

	fn delete<'a>(&'a self, kind: IndexKind, id: Uuid) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move { Ok(self.delete_point(kind, id).await?) })
	}

	fn set_payload<'a>(
		&'a self,
		kind: IndexKind,
		id: Uuid,
		fields: Map<String, Value>,
	) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move { Ok(QdrantStore::set_payload(self, kind, id, fields).await?) })
	}
}

impl NoteStore for Db {
	fn insert<'a>(
		&'a self,
		note: &'a NewResearchNote<'a>,
	) -> BoxFuture<'a, Result<ResearchNoteRow>> {
		Box::pin(async move { Ok(notes::insert_note(&self.pool, note).await?) })
	}

	fn get<'a>(&'a self, note_id: Uuid) -> BoxFuture<'a, Result<Option<ResearchNoteRow>>> {
		Box::pin(async move { Ok(notes::get_note(&self.pool, note_id).await?) })
	}

	fn list_by_document<'a>(
		&'a self,
		document_id: &'a str,
		verified_only: bool,
	) -> BoxFuture<'a, Result<Vec<ResearchNoteRow>>> {
		Box::pin(async move {
			Ok(notes::list_notes_by_document(&self.pool, document_id, verified_only).await?)
		})
	}

	fn update<'a>(
		&'a self,
		note_id: Uuid,
		content: Option<&'a str>,
		metadata: Option<&'a Value>,
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<ResearchNoteRow>> {
		Box::pin(async move {
			Ok(notes::update_note(&self.pool, note_id, content, metadata, now).await?)
		})
	}

	fn restore<'a>(&'a self, row: &'a ResearchNoteRow) -> BoxFuture<'a, Result<ResearchNoteRow>> {
		Box::pin(async move { Ok(notes::restore_note(&self.pool, row).await?) })
	}

	fn delete<'a>(&'a self, note_id: Uuid) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move { Ok(notes::delete_note(&self.pool, note_id).await?) })
	}

	fn submit<'a>(
		&'a self,
		note_id: Uuid,
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<ResearchNoteRow>> {
		Box::pin(async move { Ok(notes::submit_for_validation(&self.pool, note_id, now).await?) })
	}

	fn record_validation<'a>(
		&'a self,
		note_id: Uuid,
		verdict: &'a ValidationVerdict<'a>,
	) -> BoxFuture<'a, Result<Option<ResearchNoteRow>>> {
		Box::pin(async move { Ok(notes::record_validation(&self.pool, note_id, verdict).await?) })
	}

	fn list_by_status<'a>(
		&'a self,
		status: NoteStatus,
		document_id: Option<&'a str>,
	) -> BoxFuture<'a, Result<Vec<ResearchNoteRow>>> {
		Box::pin(async move {
			Ok(notes::list_by_status(&self.pool, status.as_str(), document_id).await?)
		})
	}
}
