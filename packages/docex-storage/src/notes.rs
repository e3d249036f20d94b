use serde_json::Value;
use sqlx::PgExecutor;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
	Error, Result,
	models::{NewResearchNote, ResearchNoteRow, ValidationVerdict},
};

const NOTE_COLUMNS: &str = "\
note_id,
	document_id,
	content,
	origin,
	metadata,
	status,
	verified,
	validator,
	feedback,
	created_at,
	updated_at,
	submitted_at,
	verified_at";

pub async fn insert_note<'e, E>(executor: E, note: &NewResearchNote<'_>) -> Result<ResearchNoteRow>
where
	E: PgExecutor<'e>,
{
	let sql = format!(
		"\
INSERT INTO research_notes (
	note_id,
	document_id,
	content,
	origin,
	metadata,
	status,
	created_at,
	updated_at
)
VALUES ($1, $2, $3, $4, $5, 'draft', $6, $6)
RETURNING {NOTE_COLUMNS}"
	);
	let row = sqlx::query_as::<_, ResearchNoteRow>(&sql)
		.bind(note.note_id)
		.bind(note.document_id)
		.bind(note.content)
		.bind(note.origin)
		.bind(&note.metadata)
		.bind(note.now)
		.fetch_one(executor)
		.await?;

	Ok(row)
}

pub async fn get_note<'e, E>(executor: E, note_id: Uuid) -> Result<Option<ResearchNoteRow>>
where
	E: PgExecutor<'e>,
{
	let sql = format!("SELECT {NOTE_COLUMNS} FROM research_notes WHERE note_id = $1");
	let row =
		sqlx::query_as::<_, ResearchNoteRow>(&sql).bind(note_id).fetch_optional(executor).await?;

	Ok(row)
}

pub async fn list_notes_by_document<'e, E>(
	executor: E,
	document_id: &str,
	verified_only: bool,
) -> Result<Vec<ResearchNoteRow>>
where
	E: PgExecutor<'e>,
{
	let sql = format!(
		"\
SELECT {NOTE_COLUMNS}
FROM research_notes
WHERE document_id = $1
	AND ($2 = false OR verified IS TRUE)
ORDER BY created_at DESC, note_id"
	);
	let rows = sqlx::query_as::<_, ResearchNoteRow>(&sql)
		.bind(document_id)
		.bind(verified_only)
		.fetch_all(executor)
		.await?;

	Ok(rows)
}

/// Applies a content replacement and/or a shallow metadata merge.
pub async fn update_note<'e, E>(
	executor: E,
	note_id: Uuid,
	content: Option<&str>,
	metadata: Option<&Value>,
	now: OffsetDateTime,
) -> Result<ResearchNoteRow>
where
	E: PgExecutor<'e>,
{
	let sql = format!(
		"\
UPDATE research_notes
SET
	content = COALESCE($2, content),
	metadata = metadata || COALESCE($3, '{{}}'::jsonb),
	updated_at = $4
WHERE note_id = $1
RETURNING {NOTE_COLUMNS}"
	);

	sqlx::query_as::<_, ResearchNoteRow>(&sql)
		.bind(note_id)
		.bind(content)
		.bind(metadata)
		.bind(now)
		.fetch_optional(executor)
		.await?
		.ok_or_else(|| Error::NotFound(format!("Research note {note_id} does not exist.")))
}

/// Writes every mutable column of `row` back, undoing a change whose index write failed.
pub async fn restore_note<'e, E>(executor: E, row: &ResearchNoteRow) -> Result<ResearchNoteRow>
where
	E: PgExecutor<'e>,
{
	let sql = format!(
		"\
UPDATE research_notes
SET
	content = $2,
	metadata = $3,
	status = $4,
	verified = $5,
	validator = $6,
	feedback = $7,
	updated_at = $8,
	submitted_at = $9,
	verified_at = $10
WHERE note_id = $1
RETURNING {NOTE_COLUMNS}"
	);

	sqlx::query_as::<_, ResearchNoteRow>(&sql)
		.bind(row.note_id)
		.bind(&row.content)
		.bind(&row.metadata)
		.bind(&row.status)
		.bind(row.verified)
		.bind(row.validator.as_deref())
		.bind(row.feedback.as_deref())
		.bind(row.updated_at)
		.bind(row.submitted_at)
		.bind(row.verified_at)
		.fetch_optional(executor)
		.await?
		.ok_or_else(|| Error::NotFound(format!("Research note {} does not exist.", row.note_id)))
}

pub async fn delete_note<'e, E>(executor: E, note_id: Uuid) -> Result<()>
where
	E: PgExecutor<'e>,
{
	let result = sqlx::query("DELETE FROM research_notes WHERE note_id = $1")
		.bind(note_id)
		.execute(executor)
		.await?;

	if result.rows_affected() == 0 {
		return Err(Error::NotFound(format!("Research note {note_id} does not exist.")));
	}

	Ok(())
}

/// Moves a note into `pending`. Pending notes keep their submission time; reviewed notes are
/// re-opened and lose their verdict.
pub async fn submit_for_validation<'e, E>(
	executor: E,
	note_id: Uuid,
	now: OffsetDateTime,
) -> Result<ResearchNoteRow>
where
	E: PgExecutor<'e>,
{
	let sql = format!(
		"\
UPDATE research_notes
SET
	status = 'pending',
	submitted_at = CASE WHEN status = 'pending' THEN submitted_at ELSE $2 END,
	verified = CASE WHEN status = 'pending' THEN verified ELSE NULL END,
	validator = CASE WHEN status = 'pending' THEN validator ELSE NULL END,
	feedback = CASE WHEN status = 'pending' THEN feedback ELSE NULL END,
	verified_at = CASE WHEN status = 'pending' THEN verified_at ELSE NULL END,
	updated_at = $2
WHERE note_id = $1
RETURNING {NOTE_COLUMNS}"
	);

	sqlx::query_as::<_, ResearchNoteRow>(&sql)
		.bind(note_id)
		.bind(now)
		.fetch_optional(executor)
		.await?
		.ok_or_else(|| Error::NotFound(format!("Research note {note_id} does not exist.")))
}

/// Records a verdict on a pending note. Returns `None` when no pending note matched, leaving the
/// caller to tell a missing note from a note in the wrong state.
pub async fn record_validation<'e, E>(
	executor: E,
	note_id: Uuid,
	verdict: &ValidationVerdict<'_>,
) -> Result<Option<ResearchNoteRow>>
where
	E: PgExecutor<'e>,
{
	let sql = format!(
		"\
UPDATE research_notes
SET
	status = 'reviewed',
	verified = $2,
	validator = $3,
	feedback = $4,
	verified_at = $5,
	updated_at = $5
WHERE note_id = $1
	AND status = 'pending'
RETURNING {NOTE_COLUMNS}"
	);
	let row = sqlx::query_as::<_, ResearchNoteRow>(&sql)
		.bind(note_id)
		.bind(verdict.verified)
		.bind(verdict.validator)
		.bind(verdict.feedback)
		.bind(verdict.now)
		.fetch_optional(executor)
		.await?;

	Ok(row)
}

pub async fn list_by_status<'e, E>(
	executor: E,
	status: &str,
	document_id: Option<&str>,
) -> Result<Vec<ResearchNoteRow>>
where
	E: PgExecutor<'e>,
{
	let sql = format!(
		"\
SELECT {NOTE_COLUMNS}
FROM research_notes
WHERE status = $1
	AND ($2::text IS NULL OR document_id = $2)
ORDER BY COALESCE(verified_at, submitted_at, created_at) ASC, note_id"
	);
	let rows = sqlx::query_as::<_, ResearchNoteRow>(&sql)
		.bind(status)
		.bind(document_id)
		.fetch_all(executor)
		.await?;

	Ok(rows)
}
