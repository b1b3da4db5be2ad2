use std::collections::HashMap;

use qdrant_client::{
	QdrantError,
	client::Payload,
	qdrant::{
		Condition, DeletePointsBuilder, Filter, PointId, PointStruct, PointVectors, PointsIdsList,
		Query, QueryPointsBuilder, ScoredPoint, SetPayloadPointsBuilder,
		UpdatePointVectorsBuilder, UpsertPointsBuilder, Value as QdrantValue, Vector,
		point_id::PointIdOptions, value::Kind,
	},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::{BoxFuture, IndexFilter, VectorIndex};
use shelf_domain::{hierarchy, ranking::Candidate};
use shelf_storage::qdrant::QdrantStore;

/// Item fields mirrored into the index so search results need no database round trip.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IndexPayload {
	pub thing_id: Uuid,
	pub name: String,
	pub description: Option<String>,
	pub category: String,
	pub tags: Vec<String>,
	pub location_path: Option<String>,
}
impl IndexPayload {
	fn to_payload(&self) -> Payload {
		let mut payload = location_payload(self.location_path.as_deref());

		payload.insert("thing_id", self.thing_id.to_string());
		payload.insert("name", self.name.clone());
		payload.insert(
			"description",
			self.description.clone().map(Value::String).unwrap_or(Value::Null),
		);
		payload.insert("category", self.category.clone());
		payload.insert("tags", Value::from(self.tags.clone()));

		payload
	}

	fn from_point(thing_id: Uuid, fields: &HashMap<String, QdrantValue>) -> Self {
		Self {
			thing_id,
			name: payload_string(fields, "name").unwrap_or_default(),
			description: payload_string(fields, "description"),
			category: payload_string(fields, "category").unwrap_or_default(),
			tags: payload_strings(fields, "tags"),
			location_path: payload_string(fields, "location_path").filter(|path| !path.is_empty()),
		}
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct VectorMatch {
	pub thing_id: Uuid,
	/// Raw similarity reported by the index.
	pub score: f64,
	pub payload: IndexPayload,
}
impl VectorMatch {
	pub fn into_candidate(self) -> Candidate {
		Candidate {
			item_id: self.thing_id,
			name: self.payload.name,
			description: self.payload.description,
			category: self.payload.category,
			tags: self.payload.tags,
			location_path: self.payload.location_path,
			vector_score: self.score,
		}
	}
}

/// [`VectorIndex`] over a Qdrant collection with one point per item, keyed by item id.
pub struct QdrantIndex {
	store: QdrantStore,
}
impl QdrantIndex {
	pub fn new(store: QdrantStore) -> Self {
		Self { store }
	}

	pub fn store(&self) -> &QdrantStore {
		&self.store
	}

	async fn upsert_inner(
		&self,
		thing_id: Uuid,
		vector_name: &str,
		vector: Vec<f32>,
		payload: &IndexPayload,
	) -> color_eyre::Result<()> {
		let collection = self.store.collection.clone();
		let point_id = thing_id.to_string();
		let update = PointVectors {
			id: Some(PointId::from(point_id.clone())),
			vectors: Some(named_vector(vector_name, vector.clone()).into()),
		};
		let updated = self
			.store
			.client
			.update_vectors(
				UpdatePointVectorsBuilder::new(collection.clone(), vec![update]).wait(true),
			)
			.await;

		match updated {
			Ok(_) => {
				self.store
					.client
					.overwrite_payload(
						SetPayloadPointsBuilder::new(collection, payload.to_payload())
							.points_selector(ids_selector(thing_id))
							.wait(true),
					)
					.await?;
			},
			Err(err) if is_missing_point(&err) => {
				let point = PointStruct::new(
					point_id,
					named_vector(vector_name, vector),
					payload.to_payload(),
				);

				self.store
					.client
					.upsert_points(UpsertPointsBuilder::new(collection, vec![point]).wait(true))
					.await?;
			},
			Err(err) => return Err(err.into()),
		}

		Ok(())
	}

	async fn set_location_inner(
		&self,
		thing_id: Uuid,
		location_path: Option<&str>,
	) -> color_eyre::Result<()> {
		let updated = self
			.store
			.client
			.set_payload(
				SetPayloadPointsBuilder::new(
					self.store.collection.clone(),
					location_payload(location_path),
				)
				.points_selector(ids_selector(thing_id))
				.wait(true),
			)
			.await;

		match updated {
			Ok(_) => Ok(()),
			// Unindexed items pick up their location on the next reindex.
			Err(err) if is_missing_point(&err) => {
				tracing::debug!(thing_id = %thing_id, "No index entry to refresh.");

				Ok(())
			},
			Err(err) => Err(err.into()),
		}
	}

	async fn search_inner(
		&self,
		vector_name: &str,
		vector: Vec<f32>,
		filter: &IndexFilter,
		limit: u64,
	) -> color_eyre::Result<Vec<VectorMatch>> {
		let mut query = QueryPointsBuilder::new(self.store.collection.clone())
			.query(Query::new_nearest(vector))
			.using(vector_name)
			.limit(limit)
			.with_payload(true);

		if let Some(filter) = to_filter(filter) {
			query = query.filter(filter);
		}

		let response = self.store.client.query(query).await?;

		Ok(response.result.iter().filter_map(scored_to_match).collect())
	}

	async fn delete_inner(&self, thing_id: Uuid) -> color_eyre::Result<()> {
		let delete = DeletePointsBuilder::new(self.store.collection.clone())
			.points(ids_selector(thing_id))
			.wait(true);

		match self.store.client.delete_points(delete).await {
			Ok(_) => Ok(()),
			Err(err) if is_missing_point(&err) => {
				tracing::info!(thing_id = %thing_id, "Index entry already absent during delete.");

				Ok(())
			},
			Err(err) => Err(err.into()),
		}
	}
}
impl VectorIndex for QdrantIndex {
	fn upsert<'a>(
		&'a self,
		thing_id: Uuid,
		vector_name: &'a str,
		vector: Vec<f32>,
		payload: &'a IndexPayload,
	) -> BoxFuture<'a, color_eyre::Result<()>> {
		Box::pin(self.upsert_inner(thing_id, vector_name, vector, payload))
	}

	fn set_location<'a>(
		&'a self,
		thing_id: Uuid,
		location_path: Option<&'a str>,
	) -> BoxFuture<'a, color_eyre::Result<()>> {
		Box::pin(self.set_location_inner(thing_id, location_path))
	}

	fn search<'a>(
		&'a self,
		vector_name: &'a str,
		vector: Vec<f32>,
		filter: &'a IndexFilter,
		limit: u64,
	) -> BoxFuture<'a, color_eyre::Result<Vec<VectorMatch>>> {
		Box::pin(self.search_inner(vector_name, vector, filter, limit))
	}

	fn delete<'a>(&'a self, thing_id: Uuid) -> BoxFuture<'a, color_eyre::Result<()>> {
		Box::pin(self.delete_inner(thing_id))
	}
}

/// `location_path` plus the `location_ancestors` list that subtree filters match against.
fn location_payload(location_path: Option<&str>) -> Payload {
	let mut payload = Payload::new();
	let ancestors = location_path.map(hierarchy::ancestors).unwrap_or_default();

	payload.insert(
		"location_path",
		location_path.map(|path| Value::String(path.to_string())).unwrap_or(Value::Null),
	);
	payload.insert("location_ancestors", Value::from(ancestors));

	payload
}

fn to_filter(filter: &IndexFilter) -> Option<Filter> {
	let mut conditions = Vec::new();

	if let Some(location) = filter.location.as_ref() {
		conditions.push(Condition::matches("location_ancestors", location.clone()));
	}
	if let Some(category) = filter.category.as_ref() {
		conditions.push(Condition::matches("category", category.clone()));
	}

	for tag in &filter.tags {
		conditions.push(Condition::matches("tags", tag.clone()));
	}

	if conditions.is_empty() { None } else { Some(Filter::must(conditions)) }
}

fn named_vector(vector_name: &str, vector: Vec<f32>) -> HashMap<String, Vector> {
	HashMap::from([(vector_name.to_string(), Vector::from(vector))])
}

fn ids_selector(thing_id: Uuid) -> PointsIdsList {
	PointsIdsList { ids: vec![PointId::from(thing_id.to_string())] }
}

fn scored_to_match(point: &ScoredPoint) -> Option<VectorMatch> {
	let thing_id = point
		.id
		.as_ref()
		.and_then(point_id_to_uuid)
		.or_else(|| payload_string(&point.payload, "thing_id").and_then(|raw| raw.parse().ok()))?;

	Some(VectorMatch {
		thing_id,
		score: f64::from(point.score),
		payload: IndexPayload::from_point(thing_id, &point.payload),
	})
}

fn point_id_to_uuid(point_id: &PointId) -> Option<Uuid> {
	match &point_id.point_id_options {
		Some(PointIdOptions::Uuid(id)) => Uuid::parse_str(id).ok(),
		_ => None,
	}
}

fn payload_string(fields: &HashMap<String, QdrantValue>, key: &str) -> Option<String> {
	match &fields.get(key)?.kind {
		Some(Kind::StringValue(text)) => Some(text.clone()),
		_ => None,
	}
}

fn payload_strings(fields: &HashMap<String, QdrantValue>, key: &str) -> Vec<String> {
	match fields.get(key).and_then(|value| value.kind.as_ref()) {
		Some(Kind::ListValue(list)) => list
			.values
			.iter()
			.filter_map(|value| match &value.kind {
				Some(Kind::StringValue(text)) => Some(text.clone()),
				_ => None,
			})
			.collect(),
		_ => Vec::new(),
	}
}

fn is_missing_point(err: &QdrantError) -> bool {
	let message = err.to_string().to_lowercase();
	let point_not_found =
		(message.contains("not found") || message.contains("404")) && message.contains("point");
	let no_point_found = message.contains("no point") && message.contains("found");

	point_not_found || no_point_found
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn location_payload_lists_every_ancestor() {
		let payload = serde_json::Value::from(location_payload(Some("/Home/Kitchen")));

		assert_eq!(payload["location_path"], "/Home/Kitchen");
		assert_eq!(payload["location_ancestors"], serde_json::json!(["/Home", "/Home/Kitchen"]));

		let unplaced = serde_json::Value::from(location_payload(None));

		assert!(unplaced["location_path"].is_null());
		assert_eq!(unplaced["location_ancestors"], serde_json::json!([]));
	}

	#[test]
	fn empty_filter_means_no_server_side_restriction() {
		assert!(to_filter(&IndexFilter::default()).is_none());

		let filter = IndexFilter {
			location: Some("/Home".to_string()),
			category: None,
			tags: vec!["red".to_string()],
		};

		assert_eq!(to_filter(&filter).map(|f| f.must.len()), Some(2));
	}

	#[test]
	fn payload_round_trips_through_qdrant_values() {
		let payload = IndexPayload {
			thing_id: Uuid::new_v4(),
			name: "Spatula".to_string(),
			description: Some("Silicone".to_string()),
			category: "kitchenware".to_string(),
			tags: vec!["red".to_string(), "spatula".to_string()],
			location_path: Some("/Home/Kitchen".to_string()),
		};
		let fields: HashMap<String, QdrantValue> = payload.to_payload().into();

		assert_eq!(IndexPayload::from_point(payload.thing_id, &fields), payload);
	}
}
