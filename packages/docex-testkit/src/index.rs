use std::sync::{
	Mutex, MutexGuard,
	atomic::{AtomicBool, Ordering},
};

use serde_json::{Map, Value};
use uuid::Uuid;

use docex_service::{BoxFuture, Error, Result, VectorIndex};
use docex_storage::index::{IndexHit, IndexKind, IndexPoint, IndexQuery};

/// Score given to points written through `upsert`, so freshly indexed content is searchable.
pub const UPSERT_SCORE: f32 = 0.5;

#[derive(Debug, Clone)]
struct StoredPoint {
	kind: IndexKind,
	hit: IndexHit,
}

/// Honors the same filters as the Qdrant store: document scope, excluded ids, and the
/// `timestamp_unix` window. Results come back by descending score, seed order on ties.
#[derive(Default)]
pub struct MemoryIndex {
	points: Mutex<Vec<StoredPoint>>,
	queries: Mutex<Vec<IndexQuery>>,
	upserted: Mutex<Vec<(IndexKind, IndexPoint)>>,
	fail_searches: AtomicBool,
	fail_upserts: AtomicBool,
	fail_set_payload: AtomicBool,
	ignore_time_windows: AtomicBool,
}
impl MemoryIndex {
	pub fn seed(&self, kind: IndexKind, hits: Vec<IndexHit>) {
		lock(&self.points).extend(hits.into_iter().map(|hit| StoredPoint { kind, hit }));
	}

	pub fn queries(&self) -> Vec<IndexQuery> {
		lock(&self.queries).clone()
	}

	pub fn upserted(&self) -> Vec<(IndexKind, IndexPoint)> {
		lock(&self.upserted).clone()
	}

	pub fn payload(&self, kind: IndexKind, id: Uuid) -> Option<Map<String, Value>> {
		let id = id.to_string();

		lock(&self.points)
			.iter()
			.find(|point| point.kind == kind && point.hit.id.as_deref() == Some(id.as_str()))
			.map(|point| point.hit.payload.clone())
	}

	pub fn len(&self, kind: IndexKind) -> usize {
		lock(&self.points).iter().filter(|point| point.kind == kind).count()
	}

	pub fn is_empty(&self, kind: IndexKind) -> bool {
		self.len(kind) == 0
	}

	pub fn fail_searches(&self, fail: bool) {
		self.fail_searches.store(fail, Ordering::SeqCst);
	}

	pub fn fail_upserts(&self, fail: bool) {
		self.fail_upserts.store(fail, Ordering::SeqCst);
	}

	pub fn fail_set_payload(&self, fail: bool) {
		self.fail_set_payload.store(fail, Ordering::SeqCst);
	}

	/// Serves time-window queries as if the index had no `timestamp_unix` range filter.
	pub fn ignore_time_windows(&self, ignore: bool) {
		self.ignore_time_windows.store(ignore, Ordering::SeqCst);
	}

	fn matches(&self, query: &IndexQuery, point: &StoredPoint) -> bool {
		if point.kind != query.kind {
			return false;
		}

		let excluded = query
			.exclude_ids
			.iter()
			.any(|id| point.hit.id.as_deref() == Some(id.to_string().as_str()));

		if excluded {
			return false;
		}
		if let Some(document_id) = query.document_id.as_deref()
			&& point.hit.payload.get("document_id").and_then(Value::as_str) != Some(document_id)
		{
			return false;
		}
		if let Some(window) = query.time_window
			&& !self.ignore_time_windows.load(Ordering::SeqCst)
		{
			let Some(ts) = point.hit.payload.get("timestamp_unix").and_then(Value::as_i64) else {
				return false;
			};

			return ts >= window.start.unix_timestamp() && ts <= window.end.unix_timestamp();
		}

		true
	}
}
impl VectorIndex for MemoryIndex {
	fn search<'a>(&'a self, query: &'a IndexQuery) -> BoxFuture<'a, Result<Vec<IndexHit>>> {
		Box::pin(async move {
			lock(&self.queries).push(query.clone());

			if self.fail_searches.load(Ordering::SeqCst) {
				return Err(Error::Index { message: "Qdrant is unavailable.".to_string() });
			}

			let mut hits = lock(&self.points)
				.iter()
				.filter(|point| self.matches(query, point))
				.map(|point| point.hit.clone())
				.collect::<Vec<_>>();

			hits.sort_by(|a, b| b.score.total_cmp(&a.score));
			hits.truncate(query.limit as usize);

			Ok(hits)
		})
	}

	fn upsert<'a>(&'a self, kind: IndexKind, points: Vec<IndexPoint>) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			if self.fail_upserts.load(Ordering::SeqCst) {
				return Err(Error::Index { message: "Qdrant rejected the upsert.".to_string() });
			}

			let mut stored = lock(&self.points);

			for point in &points {
				let id = point.id.to_string();

				stored.retain(|existing| {
					existing.kind != kind || existing.hit.id.as_deref() != Some(id.as_str())
				});
				stored.push(StoredPoint {
					kind,
					hit: IndexHit {
						id: Some(id),
						score: UPSERT_SCORE,
						payload: point.payload.clone(),
					},
				});
			}

			drop(stored);

			lock(&self.upserted).extend(points.into_iter().map(|point| (kind, point)));

			Ok(())
		})
	}

	fn delete<'a>(&'a self, kind: IndexKind, id: Uuid) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			let id = id.to_string();

			lock(&self.points)
				.retain(|point| point.kind != kind || point.hit.id.as_deref() != Some(id.as_str()));

			Ok(())
		})
	}

	fn set_payload<'a>(
		&'a self,
		kind: IndexKind,
		id: Uuid,
		fields: Map<String, Value>,
	) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			if self.fail_set_payload.load(Ordering::SeqCst) {
				return Err(Error::Index {
					message: "Qdrant rejected the payload update.".to_string(),
				});
			}

			let id = id.to_string();

			for point in lock(&self.points).iter_mut() {
				if point.kind == kind && point.hit.id.as_deref() == Some(id.as_str()) {
					point.hit.payload.extend(fields.clone());
				}
			}

			Ok(())
		})
	}
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
	mutex.lock().unwrap_or_else(|err| err.into_inner())
}
