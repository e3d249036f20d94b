use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
	DocexService, Error, NoteStatus, Result, optional_scope, required_text,
	notes::{ResearchNote, verdict_payload},
};
use docex_storage::{index::IndexKind, models::ValidationVerdict};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidateNoteRequest {
	pub is_valid: bool,
	#[serde(default)]
	pub feedback: Option<String>,
}

impl DocexService {
	/// Queues a note for review. Resubmitting a pending note is a no-op; resubmitting a reviewed
	/// note reopens it and clears the previous verdict.
	pub async fn submit_for_validation(&self, note_id: Uuid) -> Result<ResearchNote> {
		let before = self.notes.get(note_id).await?.ok_or_else(|| Error::note_not_found(note_id))?;
		let row = self.notes.submit(note_id, OffsetDateTime::now_utc()).await?;
		let note = ResearchNote::try_from(row)?;

		if before.status == NoteStatus::Reviewed.as_str()
			&& let Err(err) = self.mirror_verdict(&note).await
		{
			return Err(self.restore_note(&before, err).await);
		}

		tracing::info!(
			%note_id,
			previous = %before.status,
			"Research note submitted for validation."
		);

		Ok(note)
	}

	/// Records `validator`'s verdict on a pending note.
	pub async fn validate_note(
		&self,
		note_id: Uuid,
		validator: &str,
		req: ValidateNoteRequest,
	) -> Result<ResearchNote> {
		let validator = required_text(validator, "validator")?;
		let feedback = optional_scope(req.feedback.as_deref());
		let verdict = ValidationVerdict {
			verified: req.is_valid,
			validator,
			feedback,
			now: OffsetDateTime::now_utc(),
		};
		let before = self.notes.get(note_id).await?.ok_or_else(|| Error::note_not_found(note_id))?;
		let Some(row) = self.notes.record_validation(note_id, &verdict).await? else {
			return Err(match self.notes.get(note_id).await? {
				None => Error::note_not_found(note_id),
				Some(row) => Error::Conflict {
					message: format!(
						"Research note {note_id} is {} and must be submitted before validation.",
						row.status
					),
				},
			});
		};
		let note = ResearchNote::try_from(row)?;

		if let Err(err) = self.mirror_verdict(&note).await {
			return Err(self.restore_note(&before, err).await);
		}

		tracing::info!(%note_id, verified = req.is_valid, %validator, "Research note validated.");

		Ok(note)
	}

	/// Notes awaiting review, oldest submission first.
	pub async fn pending_validations(
		&self,
		document_id: Option<&str>,
	) -> Result<Vec<ResearchNote>> {
		self.notes_with_status(NoteStatus::Pending, document_id).await
	}

	pub async fn validated_notes(&self, document_id: Option<&str>) -> Result<Vec<ResearchNote>> {
		self.notes_with_status(NoteStatus::Reviewed, document_id).await
	}

	async fn notes_with_status(
		&self,
		status: NoteStatus,
		document_id: Option<&str>,
	) -> Result<Vec<ResearchNote>> {
		let rows = self.notes.list_by_status(status, optional_scope(document_id)).await?;

		rows.into_iter().map(ResearchNote::try_from).collect()
	}

	async fn mirror_verdict(&self, note: &ResearchNote) -> Result<()> {
		self.index
			.set_payload(
				IndexKind::Notes,
				note.note_id,
				verdict_payload(note.verified, note.validator.as_deref()),
			)
			.await
	}
}
