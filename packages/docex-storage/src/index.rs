//! Provider-neutral shapes exchanged with the vector index.

use serde_json::{Map, Value};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
	Documents,
	Notes,
}
impl IndexKind {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Documents => "documents",
			Self::Notes => "notes",
		}
	}
}

/// Inclusive timestamp window pushed down to the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
	pub start: OffsetDateTime,
	pub end: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct IndexQuery {
	pub kind: IndexKind,
	pub vector: Vec<f32>,
	pub document_id: Option<String>,
	pub exclude_ids: Vec<Uuid>,
	pub time_window: Option<TimeWindow>,
	pub limit: u32,
}
impl IndexQuery {
	pub fn new(kind: IndexKind, vector: Vec<f32>, limit: u32) -> Self {
		Self { kind, vector, document_id: None, exclude_ids: Vec::new(), time_window: None, limit }
	}
}

/// A nearest-neighbor hit with its payload flattened to JSON.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexHit {
	pub id: Option<String>,
	pub score: f32,
	pub payload: Map<String, Value>,
}
impl IndexHit {
	pub fn text(&self) -> &str {
		self.payload.get("text").and_then(Value::as_str).unwrap_or_default()
	}
}

#[derive(Debug, Clone)]
pub struct IndexPoint {
	pub id: Uuid,
	pub vector: Vec<f32>,
	pub payload: Map<String, Value>,
}
