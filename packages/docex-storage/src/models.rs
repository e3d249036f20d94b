use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ResearchNoteRow {
	pub note_id: Uuid,
	pub document_id: String,
	pub content: String,
	pub origin: String,
	pub metadata: Value,
	pub status: String,
	pub verified: Option<bool>,
	pub validator: Option<String>,
	pub feedback: Option<String>,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
	pub submitted_at: Option<OffsetDateTime>,
	pub verified_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone)]
pub struct NewResearchNote<'a> {
	pub note_id: Uuid,
	pub document_id: &'a str,
	pub content: &'a str,
	pub origin: &'a str,
	pub metadata: Value,
	pub now: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct ValidationVerdict<'a> {
	pub verified: bool,
	pub validator: &'a str,
	pub feedback: Option<&'a str>,
	pub now: OffsetDateTime,
}
