use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{DocexService, Error, Result, VisualReference, required_text};
use docex_storage::index::{IndexKind, IndexPoint};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentChunk {
	pub chunk_index: u32,
	pub text: String,
	#[serde(default)]
	pub page_number: Option<u32>,
	#[serde(default)]
	pub visual_elements: Vec<VisualReference>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexDocumentRequest {
	pub chunks: Vec<DocumentChunk>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexDocumentResponse {
	pub document_id: String,
	pub indexed: u32,
}

impl DocexService {
	/// Embeds and upserts a batch of chunks. Point ids are derived from the document id and chunk
	/// index, so re-sending a chunk replaces the earlier copy.
	pub async fn index_document_chunks(
		&self,
		document_id: &str,
		req: IndexDocumentRequest,
	) -> Result<IndexDocumentResponse> {
		let document_id = required_text(document_id, "document_id")?;

		if req.chunks.is_empty() {
			return Err(Error::invalid("chunks must contain at least one chunk."));
		}

		let mut seen = HashSet::new();
		let mut texts = Vec::with_capacity(req.chunks.len());

		for chunk in &req.chunks {
			let text = required_text(&chunk.text, "chunks[].text")?;

			if !seen.insert(chunk.chunk_index) {
				return Err(Error::invalid(format!(
					"chunk_index {} appears more than once.",
					chunk.chunk_index
				)));
			}

			texts.push(text.to_string());
		}

		let vectors = self.embed_texts(&texts).await?;
		let now = OffsetDateTime::now_utc();
		let timestamp = crate::time_serde::format(now).map_err(|err| Error::Index {
			message: format!("Failed to format timestamp: {err}."),
		})?;
		let points = req
			.chunks
			.iter()
			.zip(texts)
			.zip(vectors)
			.map(|((chunk, text), vector)| IndexPoint {
				id: chunk_point_id(document_id, chunk.chunk_index),
				vector,
				payload: chunk_payload(document_id, chunk, text, &timestamp, now),
			})
			.collect::<Vec<_>>();
		let indexed = u32::try_from(points.len()).unwrap_or(u32::MAX);

		self.index.upsert(IndexKind::Documents, points).await?;

		tracing::info!(%document_id, indexed, "Indexed document chunks.");

		Ok(IndexDocumentResponse { document_id: document_id.to_string(), indexed })
	}
}

pub fn chunk_point_id(document_id: &str, chunk_index: u32) -> Uuid {
	let name = format!("docex:chunk:{document_id}:{chunk_index}");

	Uuid::new_v5(&Uuid::NAMESPACE_URL, name.as_bytes())
}

fn chunk_payload(
	document_id: &str,
	chunk: &DocumentChunk,
	text: String,
	timestamp: &str,
	now: OffsetDateTime,
) -> Map<String, Value> {
	let mut payload = Map::new();

	payload.insert("document_id".to_string(), Value::String(document_id.to_string()));
	payload.insert("chunk_index".to_string(), Value::from(chunk.chunk_index));
	payload.insert("text".to_string(), Value::String(text));
	payload.insert("page_number".to_string(), chunk.page_number.map_or(Value::Null, Value::from));
	payload.insert(
		"visual_elements".to_string(),
		Value::Array(
			chunk
				.visual_elements
				.iter()
				.map(|visual| {
					let mut entry = Map::new();

					entry.insert("type".to_string(), Value::String(visual.kind.clone()));
					entry.insert("page".to_string(), Value::from(visual.page));

					if let Some(caption) = visual.caption.as_ref() {
						entry.insert("caption".to_string(), Value::String(caption.clone()));
					}

					Value::Object(entry)
				})
				.collect(),
		),
	);
	payload.insert("timestamp".to_string(), Value::String(timestamp.to_string()));
	payload.insert("timestamp_unix".to_string(), Value::from(now.unix_timestamp()));

	payload
}
