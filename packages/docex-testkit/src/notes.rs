use std::sync::{Mutex, MutexGuard};

use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

use docex_service::{BoxFuture, Error, NoteStatus, NoteStore, Result};
use docex_storage::models::{NewResearchNote, ResearchNoteRow, ValidationVerdict};

/// Mirrors the conditional updates of the `research_notes` table.
#[derive(Default)]
pub struct MemoryNoteStore {
	rows: Mutex<Vec<ResearchNoteRow>>,
}
impl MemoryNoteStore {
	pub fn row(&self, note_id: Uuid) -> Option<ResearchNoteRow> {
		lock(&self.rows).iter().find(|row| row.note_id == note_id).cloned()
	}

	pub fn len(&self) -> usize {
		lock(&self.rows).len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	fn modify<F>(&self, note_id: Uuid, apply: F) -> Result<ResearchNoteRow>
	where
		F: FnOnce(&mut ResearchNoteRow),
	{
		let mut rows = lock(&self.rows);
		let row = rows.iter_mut().find(|row| row.note_id == note_id).ok_or_else(|| {
			Error::NotFound { message: format!("Research note {note_id} does not exist.") }
		})?;

		apply(row);

		Ok(row.clone())
	}
}
impl NoteStore for MemoryNoteStore {
	fn insert<'a>(
		&'a self,
		note: &'a NewResearchNote<'a>,
	) -> BoxFuture<'a, Result<ResearchNoteRow>> {
		Box::pin(async move {
			let row = ResearchNoteRow {
				note_id: note.note_id,
				document_id: note.document_id.to_string(),
				content: note.content.to_string(),
				origin: note.origin.to_string(),
				metadata: note.metadata.clone(),
				status: NoteStatus::Draft.as_str().to_string(),
				verified: None,
				validator: None,
				feedback: None,
				created_at: note.now,
				updated_at: note.now,
				submitted_at: None,
				verified_at: None,
			};

			lock(&self.rows).push(row.clone());

			Ok(row)
		})
	}

	fn get<'a>(&'a self, note_id: Uuid) -> BoxFuture<'a, Result<Option<ResearchNoteRow>>> {
		Box::pin(async move { Ok(self.row(note_id)) })
	}

	fn list_by_document<'a>(
		&'a self,
		document_id: &'a str,
		verified_only: bool,
	) -> BoxFuture<'a, Result<Vec<ResearchNoteRow>>> {
		Box::pin(async move {
			// Later inserts first, so equal timestamps still list newest first.
			let mut rows = lock(&self.rows)
				.iter()
				.rev()
				.filter(|row| row.document_id == document_id)
				.filter(|row| !verified_only || row.verified == Some(true))
				.cloned()
				.collect::<Vec<_>>();

			rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));

			Ok(rows)
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
			self.modify(note_id, |row| {
				if let Some(content) = content {
					row.content = content.to_string();
				}
				if let (Some(Value::Object(patch)), Value::Object(existing)) =
					(metadata, &mut row.metadata)
				{
					existing.extend(patch.clone());
				}

				row.updated_at = now;
			})
		})
	}

	fn restore<'a>(&'a self, row: &'a ResearchNoteRow) -> BoxFuture<'a, Result<ResearchNoteRow>> {
		Box::pin(async move {
			self.modify(row.note_id, |stored| {
				*stored = row.clone();
			})
		})
	}

	fn delete<'a>(&'a self, note_id: Uuid) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			let mut rows = lock(&self.rows);
			let before = rows.len();

			rows.retain(|row| row.note_id != note_id);

			if rows.len() == before {
				return Err(Error::NotFound {
					message: format!("Research note {note_id} does not exist."),
				});
			}

			Ok(())
		})
	}

	fn submit<'a>(
		&'a self,
		note_id: Uuid,
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<ResearchNoteRow>> {
		Box::pin(async move {
			self.modify(note_id, |row| {
				if row.status != NoteStatus::Pending.as_str() {
					row.status = NoteStatus::Pending.as_str().to_string();
					row.submitted_at = Some(now);
					row.verified = None;
					row.validator = None;
					row.feedback = None;
					row.verified_at = None;
				}

				row.updated_at = now;
			})
		})
	}

	fn record_validation<'a>(
		&'a self,
		note_id: Uuid,
		verdict: &'a ValidationVerdict<'a>,
	) -> BoxFuture<'a, Result<Option<ResearchNoteRow>>> {
		Box::pin(async move {
			let mut rows = lock(&self.rows);
			let Some(row) = rows
				.iter_mut()
				.find(|row| row.note_id == note_id && row.status == NoteStatus::Pending.as_str())
			else {
				return Ok(None);
			};

			row.status = NoteStatus::Reviewed.as_str().to_string();
			row.verified = Some(verdict.verified);
			row.validator = Some(verdict.validator.to_string());
			row.feedback = verdict.feedback.map(ToString::to_string);
			row.verified_at = Some(verdict.now);
			row.updated_at = verdict.now;

			Ok(Some(row.clone()))
		})
	}

	fn list_by_status<'a>(
		&'a self,
		status: NoteStatus,
		document_id: Option<&'a str>,
	) -> BoxFuture<'a, Result<Vec<ResearchNoteRow>>> {
		Box::pin(async move {
			let mut rows = lock(&self.rows)
				.iter()
				.filter(|row| row.status == status.as_str())
				.filter(|row| document_id.is_none_or(|document_id| row.document_id == document_id))
				.cloned()
				.collect::<Vec<_>>();

			rows.sort_by_key(|row| row.verified_at.or(row.submitted_at).unwrap_or(row.created_at));

			Ok(rows)
		})
	}
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
	mutex.lock().unwrap_or_else(|err| err.into_inner())
}
