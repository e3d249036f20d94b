//! Maps raw index hits onto [`SearchResult`]s.
//!
//! Missing optional payload fields never fail a search. A missing or unparseable timestamp
//! falls back to `timestamp_unix`, then to the query time. A missing document id falls back to
//! the request scope. Both substitutions are logged.

use serde_json::{Map, Value};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::search::{ResultSource, SearchResult, VisualReference};
use docex_storage::index::IndexHit;

pub(crate) fn document_hit(
	hit: &IndexHit,
	scope: Option<&str>,
	now: OffsetDateTime,
) -> SearchResult {
	SearchResult {
		document_id: document_id(hit, scope),
		content: hit.text().to_string(),
		relevance_score: hit.score,
		source: ResultSource::Document {
			page_number: hit.payload.get("page_number").and_then(as_page),
			visual_references: visual_references(hit),
		},
		timestamp: timestamp(hit, now),
	}
}

pub(crate) fn note_hit(hit: &IndexHit, scope: Option<&str>, now: OffsetDateTime) -> SearchResult {
	SearchResult {
		document_id: document_id(hit, scope),
		content: hit.text().to_string(),
		relevance_score: hit.score,
		source: ResultSource::ResearchNote {
			note_id: note_id(hit),
			verified: hit.payload.get("verified").and_then(Value::as_bool),
			validator: non_empty_str(&hit.payload, "validator").map(ToString::to_string),
		},
		timestamp: timestamp(hit, now),
	}
}

fn document_id(hit: &IndexHit, scope: Option<&str>) -> String {
	if let Some(document_id) = non_empty_str(&hit.payload, "document_id") {
		return document_id.to_string();
	}
	if let Some(scope) = scope {
		return scope.to_string();
	}

	tracing::warn!(hit_id = ?hit.id, "Index hit has no document_id. Using an empty id.");

	String::new()
}

fn timestamp(hit: &IndexHit, now: OffsetDateTime) -> OffsetDateTime {
	match hit_timestamp(hit) {
		Some(ts) => ts,
		None => {
			tracing::debug!(
				hit_id = ?hit.id,
				"Index hit has no usable timestamp. Using query time."
			);

			now
		},
	}
}

/// The stored RFC 3339 `timestamp`, else the `timestamp_unix` the index filters on.
pub(crate) fn hit_timestamp(hit: &IndexHit) -> Option<OffsetDateTime> {
	non_empty_str(&hit.payload, "timestamp").and_then(crate::time_serde::parse).or_else(|| {
		hit.payload
			.get("timestamp_unix")
			.and_then(Value::as_i64)
			.and_then(|ts| OffsetDateTime::from_unix_timestamp(ts).ok())
	})
}

fn note_id(hit: &IndexHit) -> Option<Uuid> {
	hit.id
		.as_deref()
		.and_then(|id| Uuid::parse_str(id).ok())
		.or_else(|| non_empty_str(&hit.payload, "note_id").and_then(|id| Uuid::parse_str(id).ok()))
}

fn visual_references(hit: &IndexHit) -> Vec<VisualReference> {
	let Some(entries) = hit.payload.get("visual_elements").and_then(Value::as_array) else {
		return Vec::new();
	};
	let mut refs = Vec::with_capacity(entries.len());

	for entry in entries {
		let Some(object) = entry.as_object() else {
			tracing::warn!(hit_id = ?hit.id, "Skipping visual element that is not an object.");

			continue;
		};
		let kind = non_empty_str(object, "type");
		let page = object.get("page").and_then(as_page);

		match (kind, page) {
			(Some(kind), Some(page)) => refs.push(VisualReference {
				kind: kind.to_string(),
				page,
				caption: non_empty_str(object, "caption").map(ToString::to_string),
			}),
			_ => {
				tracing::warn!(hit_id = ?hit.id, "Skipping visual element without type or page.");
			},
		}
	}

	refs
}

fn non_empty_str<'a>(object: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
	object.get(key).and_then(Value::as_str).map(str::trim).filter(|value| !value.is_empty())
}

/// Page numbers arrive as integers or, after some JSON round-trips, as integral floats.
fn as_page(value: &Value) -> Option<u32> {
	if let Some(page) = value.as_u64() {
		return u32::try_from(page).ok();
	}

	let page = value.as_f64()?;

	if page.fract() != 0.0 || page < 0.0 || page > f64::from(u32::MAX) {
		return None;
	}

	Some(page as u32)
}
