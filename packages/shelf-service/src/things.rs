use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{Error, IndexPayload, Result, ShelfService};
use shelf_domain::{metadata::MetadataSchema, naming};
use shelf_storage::{
	models::ThingRow,
	placements,
	qdrant::{IMAGE_VECTOR_NAME, TEXT_VECTOR_NAME},
	things,
};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Thing {
	pub thing_id: Uuid,
	pub name: String,
	pub description: Option<String>,
	pub metadata: MetadataSchema,
	#[serde(with = "crate::time_serde")]
	pub created_at: OffsetDateTime,
	#[serde(with = "crate::time_serde")]
	pub updated_at: OffsetDateTime,
}
impl TryFrom<ThingRow> for Thing {
	type Error = Error;

	fn try_from(row: ThingRow) -> Result<Self> {
		Ok(Self {
			thing_id: row.thing_id,
			name: row.name,
			description: row.description,
			metadata: serde_json::from_value(row.metadata)?,
			created_at: row.created_at,
			updated_at: row.updated_at,
		})
	}
}

/// A persisted item plus whether its text vector reached the index.
///
/// `indexed == false` means the item is stored but invisible to text search until
/// `reindex_thing` or `rebuild_index` succeeds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RegisteredThing {
	#[serde(flatten)]
	pub thing: Thing,
	pub indexed: bool,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct UpdateThingRequest {
	#[serde(default)]
	pub name: Option<String>,
	/// `Some("")` clears the description.
	#[serde(default)]
	pub description: Option<String>,
	/// Replaces the metadata wholesale from the (updated) name and description.
	#[serde(default)]
	pub regenerate_metadata: bool,
}

impl ShelfService {
	pub async fn register_thing(
		&self,
		name: &str,
		description: Option<&str>,
	) -> Result<RegisteredThing> {
		let name = item_name(name)?;
		let description = description.and_then(clean_description);
		let metadata = self.enrich(&name, description.as_deref());
		let now = OffsetDateTime::now_utc();
		let row = ThingRow {
			thing_id: Uuid::new_v4(),
			name,
			description,
			metadata: serde_json::to_value(&metadata)?,
			created_at: now,
			updated_at: now,
		};

		things::insert_thing(&self.db.pool, &row).await?;

		tracing::info!(thing_id = %row.thing_id, category = %metadata.category, "Item registered.");

		let thing = Thing::try_from(row)?;
		let indexed = self.try_index(&thing).await;

		Ok(RegisteredThing { thing, indexed })
	}

	pub async fn get_thing(&self, thing_id: Uuid) -> Result<Thing> {
		things::get_thing(&self.db.pool, thing_id)
			.await?
			.ok_or_else(|| Error::not_found(format!("Item {thing_id} not found.")))?
			.try_into()
	}

	/// A page of items ordered by creation time, then id.
	pub async fn list_things(&self, offset: u32, limit: u32) -> Result<Vec<Thing>> {
		if limit == 0 {
			return Err(Error::validation("limit must be at least 1."));
		}

		let rows =
			things::list_things(&self.db.pool, i64::from(offset), i64::from(limit)).await?;

		rows.into_iter().map(Thing::try_from).collect()
	}

	pub async fn count_things(&self) -> Result<u64> {
		let count = things::count_things(&self.db.pool).await?;

		Ok(u64::try_from(count).unwrap_or_default())
	}

	pub async fn update_thing(
		&self,
		thing_id: Uuid,
		req: &UpdateThingRequest,
	) -> Result<RegisteredThing> {
		let name = req.name.as_deref().map(item_name).transpose()?;
		let mut tx = self.db.pool.begin().await?;
		let current: Thing = things::get_thing_for_update(&mut *tx, thing_id)
			.await?
			.ok_or_else(|| Error::not_found(format!("Item {thing_id} not found.")))?
			.try_into()?;
		let name = name.unwrap_or(current.name);
		let description = match req.description.as_deref() {
			Some(raw) => clean_description(raw),
			None => current.description,
		};
		let metadata = if req.regenerate_metadata {
			self.enrich(&name, description.as_deref())
		} else {
			current.metadata
		};
		let row = ThingRow {
			thing_id,
			name,
			description,
			metadata: serde_json::to_value(&metadata)?,
			created_at: current.created_at,
			updated_at: OffsetDateTime::now_utc(),
		};

		things::update_thing(&mut *tx, &row).await?;
		tx.commit().await?;

		tracing::info!(
			thing_id = %thing_id,
			regenerated = req.regenerate_metadata,
			"Item updated."
		);

		let thing = Thing::try_from(row)?;
		let indexed = self.try_index(&thing).await;

		Ok(RegisteredThing { thing, indexed })
	}

	/// Re-runs enrichment and replaces the item's metadata wholesale.
	pub async fn reenrich_thing(&self, thing_id: Uuid) -> Result<RegisteredThing> {
		let req = UpdateThingRequest { regenerate_metadata: true, ..Default::default() };

		self.update_thing(thing_id, &req).await
	}

	/// Re-embeds the item and rewrites its index entry, failing if either collaborator does.
	pub async fn reindex_thing(&self, thing_id: Uuid) -> Result<()> {
		let thing = self.get_thing(thing_id).await?;

		self.index_text(&thing).await
	}

	/// Removes the index entry, then the item and its placement history.
	///
	/// The item row stays locked while the index entry is removed, and nothing is deleted when
	/// the index cannot be reached. The entry is removed once more after the commit in case a
	/// concurrent reindex wrote it back meanwhile.
	pub async fn delete_thing(&self, thing_id: Uuid) -> Result<()> {
		let mut tx = self.db.pool.begin().await?;

		if things::get_thing_for_update(&mut *tx, thing_id).await?.is_none() {
			return Err(Error::not_found(format!("Item {thing_id} not found.")));
		}

		crate::bounded(self.index_timeout(), "Vector index", self.index.delete(thing_id)).await?;
		things::delete_thing(&mut *tx, thing_id).await?;
		tx.commit().await?;

		tracing::info!(thing_id = %thing_id, "Item deleted.");

		let swept =
			crate::bounded(self.index_timeout(), "Vector index", self.index.delete(thing_id)).await;

		if let Err(err) = swept {
			tracing::warn!(
				thing_id = %thing_id,
				error = %err,
				"Index entry of a deleted item may linger until the next rebuild."
			);
		}

		Ok(())
	}

	/// Stores an image vector for the item next to its text vector.
	///
	/// Returns `false` without touching the index when no vision model is deployed or the
	/// image yields no vector.
	pub async fn index_image(&self, thing_id: Uuid, image: &[u8]) -> Result<bool> {
		let thing = self.get_thing(thing_id).await?;

		if self.providers.vision.is_noop() {
			tracing::warn!(thing_id = %thing_id, "Image indexing skipped without a vision model.");

			return Ok(false);
		}

		let processed = crate::bounded(
			self.embedding_timeout(),
			"Vision preprocessing",
			self.providers.vision.preprocess(image),
		)
		.await?;
		let vectors = crate::bounded(
			self.embedding_timeout(),
			"Vision embedding",
			self.providers.vision.embed(&processed),
		)
		.await?;

		if vectors.is_empty() {
			return Ok(false);
		}

		let vector =
			crate::first_vector(vectors, self.cfg.storage.qdrant.image_vector_dim as usize)?;
		let payload = self.index_payload(&thing).await?;

		crate::bounded(
			self.index_timeout(),
			"Vector index",
			self.index.upsert(thing_id, IMAGE_VECTOR_NAME, vector, &payload),
		)
		.await?;

		tracing::info!(thing_id = %thing_id, "Item image indexed.");

		Ok(true)
	}

	/// Embeds the item's text and writes its `text` vector with a fresh payload.
	pub(crate) async fn index_text(&self, thing: &Thing) -> Result<()> {
		let vector = self.embed_one(embed_text(thing)).await?;
		let payload = self.index_payload(thing).await?;

		crate::bounded(
			self.index_timeout(),
			"Vector index",
			self.index.upsert(thing.thing_id, TEXT_VECTOR_NAME, vector, &payload),
		)
		.await?;

		// A delete that committed while the vector was written leaves no row behind.
		if things::get_thing(&self.db.pool, thing.thing_id).await?.is_none() {
			crate::bounded(self.index_timeout(), "Vector index", self.index.delete(thing.thing_id))
				.await?;

			return Err(Error::not_found(format!("Item {} not found.", thing.thing_id)));
		}

		Ok(())
	}

	async fn try_index(&self, thing: &Thing) -> bool {
		match self.index_text(thing).await {
			Ok(()) => true,
			Err(err) => {
				tracing::warn!(
					thing_id = %thing.thing_id,
					error = %err,
					"Item persisted but not indexed. Text search misses it until reindexed."
				);

				false
			},
		}
	}

	async fn index_payload(&self, thing: &Thing) -> Result<IndexPayload> {
		let placed = placements::placed_thing(&self.db.pool, thing.thing_id).await?;

		Ok(IndexPayload {
			thing_id: thing.thing_id,
			name: thing.name.clone(),
			description: thing.description.clone(),
			category: thing.metadata.category.as_str().to_string(),
			tags: thing.metadata.tags.clone(),
			location_path: placed.map(|placed| placed.location_path),
		})
	}

	fn enrich(&self, name: &str, description: Option<&str>) -> MetadataSchema {
		let metadata = self.enricher.enrich(name, description);

		tracing::debug!(
			category = %metadata.category,
			material = ?metadata.material,
			room_hint = ?metadata.room_hint,
			tag_count = metadata.tags.len(),
			"Item metadata enriched."
		);

		metadata
	}
}

/// Text embedded for an item: name, description, and tags separated by spaces.
pub fn embed_text(thing: &Thing) -> String {
	let mut parts = vec![thing.name.as_str()];

	if let Some(description) = thing.description.as_deref() {
		parts.push(description);
	}

	parts.extend(thing.metadata.tags.iter().map(String::as_str));

	parts.join(" ")
}

fn item_name(raw: &str) -> Result<String> {
	naming::item_name(raw).map_err(|rejection| Error::validation(rejection.describe("name")))
}

fn clean_description(raw: &str) -> Option<String> {
	let trimmed = raw.trim();

	if trimmed.is_empty() { None } else { Some(trimmed.to_string()) }
}
