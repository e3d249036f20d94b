use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
	DocexService, Error, Result, required_text,
	search::{FanOut, Pagination, SearchResponse, SearchType},
};
use docex_storage::index::TimeWindow;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeRangeSearchRequest {
	pub query: String,
	#[serde(with = "crate::time_serde")]
	pub start_date: OffsetDateTime,
	#[serde(with = "crate::time_serde")]
	pub end_date: OffsetDateTime,
	#[serde(default)]
	pub search_type: SearchType,
	#[serde(default = "crate::search::default_page")]
	pub page: u32,
	#[serde(default = "crate::search::default_page_size")]
	pub page_size: u32,
}

impl DocexService {
	/// Hybrid search restricted to results stamped inside `[start_date, end_date]`.
	///
	/// The window is pushed down to the index so each collection scans at most
	/// `search.time_range_scan_limit` in-window hits. Hits without a stored timestamp are dropped
	/// instead of being stamped with the query time, and the rest are checked against the exact
	/// window again.
	pub async fn search_by_time_range(
		&self,
		req: TimeRangeSearchRequest,
	) -> Result<SearchResponse> {
		let query = required_text(&req.query, "query")?;
		let pagination = Pagination::new(req.page, req.page_size, self.cfg.search.max_page_size)?;

		if req.start_date > req.end_date {
			return Err(Error::invalid("start_date must not be after end_date."));
		}

		let scan_limit = self.cfg.search.time_range_scan_limit;
		let vector = self.embed_one(query).await?;
		let fan_out = self
			.fan_out(FanOut {
				search_type: req.search_type,
				vector,
				document_id: None,
				time_window: Some(TimeWindow { start: req.start_date, end: req.end_date }),
				limit: scan_limit,
				require_timestamp: true,
			})
			.await?;

		for (source, hits) in
			[("documents", fan_out.document_hits), ("research_notes", fan_out.note_hits)]
		{
			if hits >= scan_limit as usize {
				tracing::warn!(
					source,
					scan_limit,
					"Time-range scan hit its limit. Lower-scoring in-window results may be missing."
				);
			}
		}

		let scanned = fan_out.merged.len();
		let filtered = fan_out
			.merged
			.into_iter()
			.filter(|result| result.timestamp >= req.start_date && result.timestamp <= req.end_date)
			.collect::<Vec<_>>();

		tracing::debug!(
			scanned,
			kept = filtered.len(),
			"Time-range search filtered merged results."
		);

		Ok(SearchResponse::paginate(filtered, pagination, query, req.search_type, None))
	}
}
