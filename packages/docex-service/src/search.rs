mod normalize;
mod pagination;

pub use pagination::Pagination;

pub(crate) use normalize::{hit_timestamp, note_hit};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{DocexService, Result, optional_scope, required_text};
use docex_storage::index::{IndexHit, IndexKind, IndexQuery, TimeWindow};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchType {
	Document,
	ResearchNotes,
	#[default]
	Both,
}
impl SearchType {
	pub fn includes_documents(self) -> bool {
		matches!(self, Self::Document | Self::Both)
	}

	pub fn includes_notes(self) -> bool {
		matches!(self, Self::ResearchNotes | Self::Both)
	}
}

/// A figure, table, or image that a document chunk points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisualReference {
	#[serde(rename = "type")]
	pub kind: String,
	pub page: u32,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub caption: Option<String>,
}

/// Source-specific fields of a result. Only document chunks carry page and visual data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source_type", rename_all = "snake_case")]
pub enum ResultSource {
	Document {
		page_number: Option<u32>,
		#[serde(default)]
		visual_references: Vec<VisualReference>,
	},
	ResearchNote {
		note_id: Option<Uuid>,
		verified: Option<bool>,
		validator: Option<String>,
	},
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
	pub document_id: String,
	pub content: String,
	pub relevance_score: f32,
	#[serde(flatten)]
	pub source: ResultSource,
	#[serde(with = "crate::time_serde")]
	pub timestamp: OffsetDateTime,
}
impl SearchResult {
	pub fn is_research_note(&self) -> bool {
		matches!(self.source, ResultSource::ResearchNote { .. })
	}

	pub fn note_id(&self) -> Option<Uuid> {
		match &self.source {
			ResultSource::ResearchNote { note_id, .. } => *note_id,
			ResultSource::Document { .. } => None,
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
	pub query: String,
	#[serde(default)]
	pub document_id: Option<String>,
	#[serde(default)]
	pub search_type: SearchType,
	#[serde(default = "default_page")]
	pub page: u32,
	#[serde(default = "default_page_size")]
	pub page_size: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
	pub results: Vec<SearchResult>,
	pub total_results: u32,
	pub page: u32,
	pub total_pages: u32,
	pub query: String,
	pub search_type: SearchType,
	pub document_id: Option<String>,
}
impl SearchResponse {
	pub(crate) fn paginate(
		merged: Vec<SearchResult>,
		pagination: Pagination,
		query: &str,
		search_type: SearchType,
		document_id: Option<&str>,
	) -> Self {
		let total_results = u32::try_from(merged.len()).unwrap_or(u32::MAX);
		let total_pages = pagination.total_pages(merged.len());

		Self {
			results: pagination.slice(merged),
			total_results,
			page: pagination.page,
			total_pages,
			query: query.to_string(),
			search_type,
			document_id: document_id.map(ToString::to_string),
		}
	}
}

/// Parameters shared by every fan-out over the two collections.
pub(crate) struct FanOut<'a> {
	pub(crate) search_type: SearchType,
	pub(crate) vector: Vec<f32>,
	pub(crate) document_id: Option<&'a str>,
	pub(crate) time_window: Option<TimeWindow>,
	pub(crate) limit: u32,
	/// Drop hits whose timestamp would have to be defaulted to the query time.
	pub(crate) require_timestamp: bool,
}

pub(crate) struct FanOutResults {
	pub(crate) merged: Vec<SearchResult>,
	pub(crate) document_hits: usize,
	pub(crate) note_hits: usize,
}

impl DocexService {
	pub async fn hybrid_search(&self, req: SearchRequest) -> Result<SearchResponse> {
		let query = required_text(&req.query, "query")?;
		let pagination = Pagination::new(req.page, req.page_size, self.cfg.search.max_page_size)?;
		let document_id = optional_scope(req.document_id.as_deref());
		let vector = self.embed_one(query).await?;
		let fan_out = self
			.fan_out(FanOut {
				search_type: req.search_type,
				vector,
				document_id,
				time_window: None,
				limit: self.cfg.search.candidate_k,
				require_timestamp: false,
			})
			.await?;

		tracing::debug!(
			search_type = ?req.search_type,
			document_hits = fan_out.document_hits,
			note_hits = fan_out.note_hits,
			"Hybrid search fan-out finished."
		);

		Ok(SearchResponse::paginate(
			fan_out.merged,
			pagination,
			query,
			req.search_type,
			document_id,
		))
	}

	/// Queries the selected collections concurrently, normalizes the hits, and merges them by
	/// descending score. Documents precede notes before the stable sort, so ties keep that order.
	pub(crate) async fn fan_out(&self, args: FanOut<'_>) -> Result<FanOutResults> {
		let build = |kind| {
			let mut query = IndexQuery::new(kind, args.vector.clone(), args.limit);

			query.document_id = args.document_id.map(ToString::to_string);
			query.time_window = args.time_window;

			query
		};
		let document_query =
			args.search_type.includes_documents().then(|| build(IndexKind::Documents));
		let note_query = args.search_type.includes_notes().then(|| build(IndexKind::Notes));
		let (document_hits, note_hits) = tokio::try_join!(
			self.search_index(document_query.as_ref()),
			self.search_index(note_query.as_ref()),
		)?;
		let now = OffsetDateTime::now_utc();
		let keep = |hit: &&IndexHit| {
			if !args.require_timestamp || hit_timestamp(hit).is_some() {
				return true;
			}

			tracing::warn!(hit_id = ?hit.id, "Dropping index hit without a usable timestamp.");

			false
		};
		let mut merged = Vec::with_capacity(document_hits.len() + note_hits.len());

		merged.extend(
			document_hits
				.iter()
				.filter(keep)
				.map(|hit| normalize::document_hit(hit, args.document_id, now)),
		);
		merged.extend(
			note_hits.iter().filter(keep).map(|hit| note_hit(hit, args.document_id, now)),
		);
		merged.sort_by(|a, b| b.relevance_score.total_cmp(&a.relevance_score));

		Ok(FanOutResults {
			merged,
			document_hits: document_hits.len(),
			note_hits: note_hits.len(),
		})
	}

	async fn search_index(&self, query: Option<&IndexQuery>) -> Result<Vec<IndexHit>> {
		match query {
			Some(query) => self.index.search(query).await,
			None => Ok(Vec::new()),
		}
	}
}

pub(crate) fn default_page() -> u32 {
	1
}

pub(crate) fn default_page_size() -> u32 {
	10
}
