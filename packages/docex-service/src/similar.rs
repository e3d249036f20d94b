use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
	DocexService, Error, Result,
	search::{SearchResult, note_hit},
};
use docex_storage::index::{IndexKind, IndexQuery};

impl DocexService {
	/// Nearest research notes to `note_id`, in index order. The note itself is never returned.
	pub async fn search_similar_notes(
		&self,
		note_id: Uuid,
		limit: Option<u32>,
	) -> Result<Vec<SearchResult>> {
		let limit = limit.unwrap_or(self.cfg.search.similar_notes_limit);
		let max = self.cfg.search.max_page_size;

		if limit == 0 || limit > max {
			return Err(Error::invalid(format!("limit must be between 1 and {max}.")));
		}

		let note = self.notes.get(note_id).await?.ok_or_else(|| Error::note_not_found(note_id))?;
		let vector = self.embed_one(&note.content).await?;
		let mut query = IndexQuery::new(IndexKind::Notes, vector, limit.saturating_add(1));

		query.exclude_ids.push(note_id);

		let hits = self.index.search(&query).await?;
		let now = OffsetDateTime::now_utc();
		let results = hits
			.iter()
			.map(|hit| note_hit(hit, None, now))
			.filter(|result| result.note_id() != Some(note_id))
			.take(limit as usize)
			.collect::<Vec<_>>();

		tracing::debug!(
			%note_id,
			hits = hits.len(),
			returned = results.len(),
			"Similar notes found."
		);

		Ok(results)
	}
}
