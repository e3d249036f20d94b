use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{DocexService, Error, Result, required_text};
use docex_storage::{
	index::{IndexKind, IndexPoint},
	models::{NewResearchNote, ResearchNoteRow},
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteOrigin {
	#[default]
	Manual,
	QaDerived,
	SummaryDerived,
}
impl NoteOrigin {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Manual => "manual",
			Self::QaDerived => "qa_derived",
			Self::SummaryDerived => "summary_derived",
		}
	}

	pub fn parse(raw: &str) -> Option<Self> {
		match raw {
			"manual" => Some(Self::Manual),
			"qa_derived" => Some(Self::QaDerived),
			"summary_derived" => Some(Self::SummaryDerived),
			_ => None,
		}
	}
}

/// Validation state: `draft -> pending -> reviewed`, with `reviewed -> pending` on resubmission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteStatus {
	Draft,
	Pending,
	Reviewed,
}
impl NoteStatus {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Draft => "draft",
			Self::Pending => "pending",
			Self::Reviewed => "reviewed",
		}
	}

	pub fn parse(raw: &str) -> Option<Self> {
		match raw {
			"draft" => Some(Self::Draft),
			"pending" => Some(Self::Pending),
			"reviewed" => Some(Self::Reviewed),
			_ => None,
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchNote {
	pub note_id: Uuid,
	pub document_id: String,
	pub content: String,
	pub origin: NoteOrigin,
	pub metadata: Map<String, Value>,
	pub status: NoteStatus,
	pub verified: Option<bool>,
	pub validator: Option<String>,
	pub feedback: Option<String>,
	#[serde(with = "crate::time_serde")]
	pub created_at: OffsetDateTime,
	#[serde(with = "crate::time_serde")]
	pub updated_at: OffsetDateTime,
	#[serde(with = "crate::time_serde::option")]
	pub submitted_at: Option<OffsetDateTime>,
	#[serde(with = "crate::time_serde::option")]
	pub verified_at: Option<OffsetDateTime>,
}
impl TryFrom<ResearchNoteRow> for ResearchNote {
	type Error = Error;

	fn try_from(row: ResearchNoteRow) -> Result<Self> {
		let origin = NoteOrigin::parse(&row.origin).ok_or_else(|| Error::Storage {
			message: format!("Note {} has unknown origin {:?}.", row.note_id, row.origin),
		})?;
		let status = NoteStatus::parse(&row.status).ok_or_else(|| Error::Storage {
			message: format!("Note {} has unknown status {:?}.", row.note_id, row.status),
		})?;
		let metadata = match row.metadata {
			Value::Object(map) => map,
			Value::Null => Map::new(),
			other => {
				return Err(Error::Storage {
					message: format!("Note {} has non-object metadata: {other}.", row.note_id),
				});
			},
		};

		Ok(Self {
			note_id: row.note_id,
			document_id: row.document_id,
			content: row.content,
			origin,
			metadata,
			status,
			verified: row.verified,
			validator: row.validator,
			feedback: row.feedback,
			created_at: row.created_at,
			updated_at: row.updated_at,
			submitted_at: row.submitted_at,
			verified_at: row.verified_at,
		})
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateNoteRequest {
	pub content: String,
	#[serde(default)]
	pub origin: NoteOrigin,
	#[serde(default)]
	pub metadata: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateNoteRequest {
	#[serde(default)]
	pub content: Option<String>,
	#[serde(default)]
	pub metadata: Option<Map<String, Value>>,
}

impl DocexService {
	/// Stores a draft note and indexes it. The row is removed again if indexing fails.
	pub async fn create_note(
		&self,
		document_id: &str,
		req: CreateNoteRequest,
	) -> Result<ResearchNote> {
		let document_id = required_text(document_id, "document_id")?;
		let content = required_text(&req.content, "content")?;
		let vector = self.embed_one(content).await?;
		let now = OffsetDateTime::now_utc();
		let new_note = NewResearchNote {
			note_id: Uuid::new_v4(),
			document_id,
			content,
			origin: req.origin.as_str(),
			metadata: Value::Object(req.metadata.unwrap_or_default()),
			now,
		};
		let note = ResearchNote::try_from(self.notes.insert(&new_note).await?)?;

		if let Err(err) = self.index_note(&note, vector).await {
			tracing::error!(
				error = %err,
				note_id = %note.note_id,
				"Failed to index research note."
			);

			if let Err(cleanup) = self.notes.delete(note.note_id).await {
				tracing::error!(
					error = %cleanup,
					note_id = %note.note_id,
					"Failed to remove unindexed research note."
				);
			}

			return Err(err);
		}

		tracing::info!(
			note_id = %note.note_id,
			document_id = %note.document_id,
			origin = note.origin.as_str(),
			"Research note created."
		);

		Ok(note)
	}

	/// Records an answer from a question-answering exchange as a note.
	pub async fn create_qa_derived_note(
		&self,
		document_id: &str,
		question: &str,
		answer: &str,
		context: Option<&str>,
	) -> Result<ResearchNote> {
		let mut metadata = Map::new();

		metadata.insert("question".to_string(), Value::String(question.to_string()));
		metadata.insert(
			"context".to_string(),
			context.map_or(Value::Null, |context| Value::String(context.to_string())),
		);

		self.create_note(
			document_id,
			CreateNoteRequest {
				content: answer.to_string(),
				origin: NoteOrigin::QaDerived,
				metadata: Some(metadata),
			},
		)
		.await
	}

	pub async fn create_summary_derived_note(
		&self,
		document_id: &str,
		summary: &str,
		source_content: Option<&str>,
	) -> Result<ResearchNote> {
		let mut metadata = Map::new();

		metadata.insert(
			"source_content".to_string(),
			source_content.map_or(Value::Null, |source| Value::String(source.to_string())),
		);

		self.create_note(
			document_id,
			CreateNoteRequest {
				content: summary.to_string(),
				origin: NoteOrigin::SummaryDerived,
				metadata: Some(metadata),
			},
		)
		.await
	}

	pub async fn get_note(&self, note_id: Uuid) -> Result<ResearchNote> {
		let row = self.notes.get(note_id).await?.ok_or_else(|| Error::note_not_found(note_id))?;

		ResearchNote::try_from(row)
	}

	/// Notes attached to a document, newest first.
	pub async fn list_notes(
		&self,
		document_id: &str,
		verified_only: bool,
	) -> Result<Vec<ResearchNote>> {
		let document_id = required_text(document_id, "document_id")?;
		let rows = self.notes.list_by_document(document_id, verified_only).await?;

		rows.into_iter().map(ResearchNote::try_from).collect()
	}

	/// Replaces the content and/or shallowly merges metadata. New content is re-embedded and
	/// re-indexed before the response is returned.
	pub async fn update_note(
		&self,
		note_id: Uuid,
		req: UpdateNoteRequest,
	) -> Result<ResearchNote> {
		if req.content.is_none() && req.metadata.is_none() {
			return Err(Error::invalid("At least one of content or metadata must be provided."));
		}

		let content =
			req.content.as_deref().map(|content| required_text(content, "content")).transpose()?;
		let vector = match content {
			Some(content) => Some(self.embed_one(content).await?),
			None => None,
		};
		let metadata = req.metadata.map(Value::Object);
		let before = self.notes.get(note_id).await?.ok_or_else(|| Error::note_not_found(note_id))?;
		let row = self
			.notes
			.update(note_id, content, metadata.as_ref(), OffsetDateTime::now_utc())
			.await?;
		let note = ResearchNote::try_from(row)?;

		if let Some(vector) = vector
			&& let Err(err) = self.index_note(&note, vector).await
		{
			return Err(self.restore_note(&before, err).await);
		}

		Ok(note)
	}

	/// Removes the index point first so a failed delete never leaves a searchable orphan.
	pub async fn delete_note(&self, note_id: Uuid) -> Result<()> {
		if self.notes.get(note_id).await?.is_none() {
			return Err(Error::note_not_found(note_id));
		}

		self.index.delete(IndexKind::Notes, note_id).await?;
		self.notes.delete(note_id).await?;

		tracing::info!(%note_id, "Research note deleted.");

		Ok(())
	}

	/// Puts `before` back after the index rejected the matching write, so Postgres never runs
	/// ahead of what search serves. Returns the index error for the caller to propagate.
	pub(crate) async fn restore_note(&self, before: &ResearchNoteRow, err: Error) -> Error {
		tracing::error!(
			error = %err,
			note_id = %before.note_id,
			"Index write failed. Restoring research note."
		);

		if let Err(restore) = self.notes.restore(before).await {
			tracing::error!(
				error = %restore,
				note_id = %before.note_id,
				"Failed to restore research note."
			);
		}

		err
	}

	async fn index_note(&self, note: &ResearchNote, vector: Vec<f32>) -> Result<()> {
		let point = IndexPoint { id: note.note_id, vector, payload: note_payload(note)? };

		self.index.upsert(IndexKind::Notes, vec![point]).await
	}
}

/// Payload stored next to a note's vector in the notes collection.
pub(crate) fn note_payload(note: &ResearchNote) -> Result<Map<String, Value>> {
	let timestamp = crate::time_serde::format(note.created_at)
		.map_err(|err| Error::Index { message: format!("Failed to format timestamp: {err}.") })?;
	let mut payload = Map::new();

	payload.insert("note_id".to_string(), Value::String(note.note_id.to_string()));
	payload.insert("document_id".to_string(), Value::String(note.document_id.clone()));
	payload.insert("text".to_string(), Value::String(note.content.clone()));
	payload.insert("timestamp".to_string(), Value::String(timestamp));
	payload.insert("timestamp_unix".to_string(), Value::from(note.created_at.unix_timestamp()));
	payload.insert("origin".to_string(), Value::String(note.origin.as_str().to_string()));
	payload.extend(verdict_payload(note.verified, note.validator.as_deref()));

	Ok(payload)
}

/// The verdict fields mirrored into the index so search results can report them.
pub(crate) fn verdict_payload(
	verified: Option<bool>,
	validator: Option<&str>,
) -> Map<String, Value> {
	let mut payload = Map::new();

	payload.insert("verified".to_string(), verified.map_or(Value::Null, Value::Bool));
	payload.insert(
		"validator".to_string(),
		validator.map_or(Value::Null, |validator| Value::String(validator.to_string())),
	);

	payload
}
