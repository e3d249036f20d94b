pub const DENSE_VECTOR_NAME: &str = "dense";

use std::collections::HashMap;

use qdrant_client::{
	Qdrant,
	client::Payload,
	qdrant::{
		Condition, CreateCollectionBuilder, CreateFieldIndexCollectionBuilder,
		DeletePointsBuilder, Distance, FieldType, Filter, PointId, PointStruct, PointsIdsList,
		Query, QueryPointsBuilder, Range, ScoredPoint, SetPayloadPointsBuilder,
		UpsertPointsBuilder, Value as QdrantValue, Vector, VectorParamsBuilder,
		VectorsConfigBuilder, point_id::PointIdOptions, value::Kind,
	},
};
use serde_json::{Map, Number, Value};
use uuid::Uuid;

use crate::{
	Result,
	index::{IndexHit, IndexKind, IndexPoint, IndexQuery},
};

pub struct QdrantStore {
	pub client: Qdrant,
	pub documents_collection: String,
	pub notes_collection: String,
	pub vector_dim: u32,
}
impl QdrantStore {
	pub fn new(cfg: &docex_config::Qdrant) -> Result<Self> {
		let client = Qdrant::from_url(&cfg.url).build()?;

		Ok(Self {
			client,
			documents_collection: cfg.documents_collection.clone(),
			notes_collection: cfg.notes_collection.clone(),
			vector_dim: cfg.vector_dim,
		})
	}

	pub fn collection(&self, kind: IndexKind) -> &str {
		match kind {
			IndexKind::Documents => &self.documents_collection,
			IndexKind::Notes => &self.notes_collection,
		}
	}

	/// Creates missing collections with a cosine dense vector and the payload indexes used by
	/// search filters.
	pub async fn ensure_collections(&self) -> Result<()> {
		for kind in [IndexKind::Documents, IndexKind::Notes] {
			let collection = self.collection(kind).to_string();

			if self.client.collection_exists(collection.clone()).await? {
				continue;
			}

			let mut vectors_config = VectorsConfigBuilder::default();

			vectors_config.add_named_vector_params(
				DENSE_VECTOR_NAME,
				VectorParamsBuilder::new(self.vector_dim.into(), Distance::Cosine),
			);

			self.client
				.create_collection(
					CreateCollectionBuilder::new(collection.clone()).vectors_config(vectors_config),
				)
				.await?;

			for (field, field_type) in
				[("document_id", FieldType::Keyword), ("timestamp_unix", FieldType::Integer)]
			{
				self.client
					.create_field_index(
						CreateFieldIndexCollectionBuilder::new(collection.clone(), field, field_type)
							.wait(true),
					)
					.await?;
			}

			tracing::info!(%collection, kind = kind.as_str(), "Created Qdrant collection.");
		}

		Ok(())
	}

	pub async fn search(&self, query: &IndexQuery) -> Result<Vec<IndexHit>> {
		let search = QueryPointsBuilder::new(self.collection(query.kind))
			.query(Query::new_nearest(query.vector.clone()))
			.using(DENSE_VECTOR_NAME)
			.filter(build_filter(query))
			.limit(u64::from(query.limit))
			.with_payload(true);
		let response = self.client.query(search).await?;

		Ok(response.result.into_iter().map(scored_point_to_hit).collect())
	}

	pub async fn upsert_points(&self, kind: IndexKind, points: Vec<IndexPoint>) -> Result<()> {
		if points.is_empty() {
			return Ok(());
		}

		let points = points
			.into_iter()
			.map(|point| {
				let mut vector_map = HashMap::new();

				vector_map.insert(DENSE_VECTOR_NAME.to_string(), Vector::from(point.vector));

				PointStruct::new(point.id.to_string(), vector_map, json_to_payload(point.payload))
			})
			.collect::<Vec<_>>();
		let upsert = UpsertPointsBuilder::new(self.collection(kind), points).wait(true);

		self.client.upsert_points(upsert).await?;

		Ok(())
	}

	pub async fn delete_point(&self, kind: IndexKind, id: Uuid) -> Result<()> {
		let delete = DeletePointsBuilder::new(self.collection(kind))
			.points(PointsIdsList { ids: vec![PointId::from(id.to_string())] })
			.wait(true);

		self.client.delete_points(delete).await?;

		Ok(())
	}

	/// Overwrites the given payload keys on one point, leaving its vector untouched.
	pub async fn set_payload(
		&self,
		kind: IndexKind,
		id: Uuid,
		fields: Map<String, Value>,
	) -> Result<()> {
		let update = SetPayloadPointsBuilder::new(self.collection(kind), json_to_payload(fields))
			.points_selector(PointsIdsList { ids: vec![PointId::from(id.to_string())] })
			.wait(true);

		self.client.set_payload(update).await?;

		Ok(())
	}
}

fn build_filter(query: &IndexQuery) -> Filter {
	let mut must = Vec::new();

	if let Some(document_id) = query.document_id.as_ref() {
		must.push(Condition::matches("document_id", document_id.clone()));
	}
	if let Some(window) = query.time_window {
		// Whole seconds keep the pushed-down range a superset of the exact window.
		must.push(Condition::range(
			"timestamp_unix",
			Range {
				gte: Some(window.start.unix_timestamp() as f64),
				lte: Some(window.end.unix_timestamp() as f64),
				..Default::default()
			},
		));
	}

	let must_not = if query.exclude_ids.is_empty() {
		Vec::new()
	} else {
		vec![Condition::has_id(query.exclude_ids.iter().map(|id| PointId::from(id.to_string())))]
	};

	Filter { must, must_not, ..Default::default() }
}

fn scored_point_to_hit(point: ScoredPoint) -> IndexHit {
	let id = point.id.as_ref().and_then(point_id_to_string);
	let payload = point
		.payload
		.into_iter()
		.map(|(key, value)| (key, qdrant_value_to_json(value)))
		.collect::<Map<_, _>>();

	IndexHit { id, score: point.score, payload }
}

fn point_id_to_string(point_id: &PointId) -> Option<String> {
	match point_id.point_id_options.as_ref()? {
		PointIdOptions::Uuid(id) => Some(id.clone()),
		PointIdOptions::Num(num) => Some(num.to_string()),
	}
}

fn json_to_payload(fields: Map<String, Value>) -> Payload {
	let map = fields
		.into_iter()
		.map(|(key, value)| (key, QdrantValue::from(value)))
		.collect::<HashMap<_, _>>();

	Payload::from(map)
}

pub fn qdrant_value_to_json(value: QdrantValue) -> Value {
	match value.kind {
		None | Some(Kind::NullValue(_)) => Value::Null,
		Some(Kind::BoolValue(flag)) => Value::Bool(flag),
		Some(Kind::IntegerValue(number)) => Value::from(number),
		Some(Kind::DoubleValue(number)) =>
			Number::from_f64(number).map(Value::Number).unwrap_or(Value::Null),
		Some(Kind::StringValue(text)) => Value::String(text),
		Some(Kind::ListValue(list)) =>
			Value::Array(list.values.into_iter().map(qdrant_value_to_json).collect()),
		Some(Kind::StructValue(object)) => Value::Object(
			object
				.fields
				.into_iter()
				.map(|(key, value)| (key, qdrant_value_to_json(value)))
				.collect(),
		),
	}
}
