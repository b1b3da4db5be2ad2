//! Item placements.
//!
//! An item is either unplaced or placed at exactly one location. Moving an item flips its
//! active row to inactive and inserts the new active row in the same transaction, so no
//! reader ever sees two active rows or a transiently unplaced item.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{Error, Result, ShelfService, Thing};
use shelf_storage::{locations, models::PlacementRow, placements, things};

const REFRESH_ATTEMPTS: usize = 5;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
	pub placement_id: Uuid,
	pub thing_id: Uuid,
	pub location_id: Uuid,
	#[serde(with = "crate::time_serde")]
	pub placed_at: OffsetDateTime,
	pub active: bool,
}
impl From<PlacementRow> for Placement {
	fn from(row: PlacementRow) -> Self {
		Self {
			placement_id: row.placement_id,
			thing_id: row.thing_id,
			location_id: row.location_id,
			placed_at: row.placed_at,
			active: row.active,
		}
	}
}

impl ShelfService {
	/// Places the item at `location_id`, replacing any current placement atomically.
	pub async fn place_thing(&self, thing_id: Uuid, location_id: Uuid) -> Result<Placement> {
		let mut tx = self.db.pool.begin().await?;

		if things::get_thing_for_update(&mut *tx, thing_id).await?.is_none() {
			return Err(Error::not_found(format!("Item {thing_id} not found.")));
		}

		let Some(location) = locations::get_location_for_share(&mut *tx, location_id).await? else {
			return Err(Error::not_found(format!("Location {location_id} not found.")));
		};
		let replaced = placements::deactivate_for_thing(&mut *tx, thing_id).await?;
		let row = PlacementRow {
			placement_id: Uuid::new_v4(),
			thing_id,
			location_id,
			placed_at: OffsetDateTime::now_utc(),
			active: true,
		};

		placements::insert_placement(&mut *tx, &row).await?;
		tx.commit().await?;

		tracing::info!(
			thing_id = %thing_id,
			location_id = %location_id,
			path = %location.path,
			moved = replaced > 0,
			"Item placed."
		);

		self.refresh_index_locations(&[thing_id]).await;

		Ok(row.into())
	}

	/// Unplaces the item. Returns the number of deactivated rows, 0 when it was not placed.
	pub async fn remove_placement(&self, thing_id: Uuid) -> Result<u64> {
		let mut tx = self.db.pool.begin().await?;

		if things::get_thing_for_update(&mut *tx, thing_id).await?.is_none() {
			return Err(Error::not_found(format!("Item {thing_id} not found.")));
		}

		let deactivated = placements::deactivate_for_thing(&mut *tx, thing_id).await?;

		tx.commit().await?;

		if deactivated > 0 {
			tracing::info!(thing_id = %thing_id, "Item unplaced.");

			self.refresh_index_locations(&[thing_id]).await;
		}

		Ok(deactivated)
	}

	pub async fn current_placement(&self, thing_id: Uuid) -> Result<Option<Placement>> {
		self.get_thing(thing_id).await?;

		let row = placements::current_placement(&self.db.pool, thing_id).await?;

		Ok(row.map(Placement::from))
	}

	/// Every placement the item ever had, newest first.
	pub async fn placement_history(&self, thing_id: Uuid) -> Result<Vec<Placement>> {
		self.get_thing(thing_id).await?;

		let rows = placements::placement_history(&self.db.pool, thing_id).await?;

		Ok(rows.into_iter().map(Placement::from).collect())
	}

	/// Items actively placed at exactly this location.
	pub async fn things_at_location(&self, location_id: Uuid) -> Result<Vec<Thing>> {
		self.get_location(location_id).await?;

		let rows = placements::things_at_location(&self.db.pool, location_id).await?;

		rows.into_iter().map(Thing::try_from).collect()
	}

	/// Writes each item's committed location path into its index payload.
	///
	/// The path is read after the write again and rewritten when a concurrent placement
	/// changed it meanwhile. Failures are logged and leave the payload stale until the next
	/// reindex.
	pub(crate) async fn refresh_index_locations(&self, thing_ids: &[Uuid]) {
		for thing_id in thing_ids {
			if let Err(err) = self.refresh_index_location(*thing_id).await {
				tracing::warn!(
					thing_id = %thing_id,
					error = %err,
					"Index location refresh failed. Payload stays stale until reindexed."
				);
			}
		}
	}

	async fn refresh_index_location(&self, thing_id: Uuid) -> Result<()> {
		let mut location_path = self.committed_location_path(thing_id).await?;

		for _ in 0..REFRESH_ATTEMPTS {
			crate::bounded(
				self.index_timeout(),
				"Vector index",
				self.index.set_location(thing_id, location_path.as_deref()),
			)
			.await?;

			let committed = self.committed_location_path(thing_id).await?;

			if committed == location_path {
				return Ok(());
			}

			tracing::debug!(thing_id = %thing_id, "Placement changed during index refresh.");

			location_path = committed;
		}

		Err(Error::unavailable(format!(
			"Placement of item {thing_id} kept changing during index refresh."
		)))
	}

	async fn committed_location_path(&self, thing_id: Uuid) -> Result<Option<String>> {
		let placed = placements::placed_thing(&self.db.pool, thing_id).await?;

		Ok(placed.map(|placed| placed.location_path))
	}
}
