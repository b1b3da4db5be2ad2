//! Location hierarchy with materialized paths.
//!
//! Every mutation runs in one transaction that first takes the hierarchy advisory lock, so
//! two renames or moves touching overlapping subtrees can never interleave their writes.
//! Readers are not blocked and see the last committed tree.

use serde::{Deserialize, Serialize};
use sqlx::{Postgres, Transaction};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{Error, Result, ShelfService};
use shelf_domain::{hierarchy, naming};
use shelf_storage::{locations, models::LocationRow, placements};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
	pub location_id: Uuid,
	pub name: String,
	pub parent_id: Option<Uuid>,
	pub path: String,
	#[serde(with = "crate::time_serde")]
	pub created_at: OffsetDateTime,
}
impl From<LocationRow> for Location {
	fn from(row: LocationRow) -> Self {
		Self {
			location_id: row.location_id,
			name: row.name,
			parent_id: row.parent_id,
			path: row.path,
			created_at: row.created_at,
		}
	}
}

impl ShelfService {
	pub async fn create_location(&self, name: &str, parent_id: Option<Uuid>) -> Result<Location> {
		let name = location_name(name)?;
		let mut tx = self.db.pool.begin().await?;

		locations::lock_hierarchy(&mut *tx).await?;

		let parent_path = match parent_id {
			Some(parent_id) =>
				Some(require_location(&mut tx, parent_id, "Parent location").await?.path),
			None => None,
		};

		if locations::sibling_name_taken(&mut *tx, parent_id, &name, None).await? {
			return Err(Error::conflict(format!(
				"A location named {name:?} already exists under {}.",
				parent_path.as_deref().unwrap_or("the root")
			)));
		}

		let row = LocationRow {
			location_id: Uuid::new_v4(),
			path: hierarchy::child_path(parent_path.as_deref(), &name),
			name,
			parent_id,
			created_at: OffsetDateTime::now_utc(),
		};

		locations::insert_location(&mut *tx, &row).await?;
		tx.commit().await?;

		tracing::info!(location_id = %row.location_id, path = %row.path, "Location created.");

		Ok(row.into())
	}

	pub async fn get_location(&self, location_id: Uuid) -> Result<Location> {
		locations::get_location(&self.db.pool, location_id)
			.await?
			.map(Location::from)
			.ok_or_else(|| Error::not_found(format!("Location {location_id} not found.")))
	}

	pub async fn get_location_by_path(&self, path: &str) -> Result<Location> {
		let Some(path) = hierarchy::normalize_filter(path) else {
			return Err(Error::validation("path must be non-empty."));
		};

		locations::get_location_by_path(&self.db.pool, &path)
			.await?
			.map(Location::from)
			.ok_or_else(|| Error::not_found(format!("Location at {path} not found.")))
	}

	/// Direct children of `parent_id`, or the roots when `None`.
	pub async fn get_children(&self, parent_id: Option<Uuid>) -> Result<Vec<Location>> {
		if let Some(parent_id) = parent_id {
			self.get_location(parent_id).await?;
		}

		let rows = locations::list_children(&self.db.pool, parent_id).await?;

		Ok(rows.into_iter().map(Location::from).collect())
	}

	/// The location and every descendant, in pre-order.
	pub async fn get_subtree(&self, location_id: Uuid) -> Result<Vec<Location>> {
		let root = self.get_location(location_id).await?;
		let rows = locations::list_subtree(&self.db.pool, &root.path).await?;

		Ok(rows.into_iter().map(Location::from).collect())
	}

	/// Every location, in pre-order.
	pub async fn list_locations(&self) -> Result<Vec<Location>> {
		let rows = locations::list_all(&self.db.pool).await?;

		Ok(rows.into_iter().map(Location::from).collect())
	}

	/// Renames a location and rewrites its whole subtree atomically.
	pub async fn rename_location(&self, location_id: Uuid, new_name: &str) -> Result<Location> {
		let new_name = location_name(new_name)?;
		let mut tx = self.db.pool.begin().await?;

		locations::lock_hierarchy(&mut *tx).await?;

		let node = lock_location(&mut tx, location_id).await?;
		let parent_path = match node.parent_id {
			Some(parent_id) =>
				Some(require_location(&mut tx, parent_id, "Parent location").await?.path),
			None => None,
		};

		self.relocate(tx, node, new_name, parent_path).await
	}

	/// Re-parents a location (to the root level when `new_parent_id` is `None`) and rewrites
	/// its whole subtree atomically.
	pub async fn move_location(
		&self,
		location_id: Uuid,
		new_parent_id: Option<Uuid>,
	) -> Result<Location> {
		if new_parent_id == Some(location_id) {
			return Err(Error::conflict(format!(
				"Location {location_id} cannot be moved under itself."
			)));
		}

		let mut tx = self.db.pool.begin().await?;

		locations::lock_hierarchy(&mut *tx).await?;

		let mut node = lock_location(&mut tx, location_id).await?;
		let parent_path = match new_parent_id {
			Some(parent_id) => {
				let parent = require_location(&mut tx, parent_id, "New parent location").await?;

				if hierarchy::would_create_cycle(&node.path, Some(parent.path.as_str())) {
					return Err(Error::conflict(format!(
						"Moving {} under {} would create a cycle.",
						node.path, parent.path
					)));
				}

				Some(parent.path)
			},
			None => None,
		};
		let name = node.name.clone();

		node.parent_id = new_parent_id;

		self.relocate(tx, node, name, parent_path).await
	}

	/// Deletes a childless location.
	///
	/// Active placements block deletion unless `force` is set, in which case they are
	/// deactivated in the same transaction. Returns the number of deactivated placements.
	pub async fn delete_location(&self, location_id: Uuid, force: bool) -> Result<u64> {
		let mut tx = self.db.pool.begin().await?;

		locations::lock_hierarchy(&mut *tx).await?;

		let node = lock_location(&mut tx, location_id).await?;

		if locations::has_children(&mut *tx, location_id).await? {
			return Err(Error::conflict(format!(
				"Location {} has children and cannot be deleted.",
				node.path
			)));
		}

		let placed = placements::placed_in_subtree(&mut *tx, &node.path).await?;

		if !placed.is_empty() && !force {
			return Err(Error::conflict(format!(
				"Location {} holds {} placed item(s); pass force to unplace them.",
				node.path,
				placed.len()
			)));
		}

		let deactivated = placements::deactivate_at_location(&mut *tx, location_id).await?;

		locations::delete_location(&mut *tx, location_id).await?;
		tx.commit().await?;

		tracing::info!(
			location_id = %location_id,
			path = %node.path,
			deactivated,
			"Location deleted."
		);

		let refresh: Vec<Uuid> = placed.into_iter().map(|item| item.thing_id).collect();

		self.refresh_index_locations(&refresh).await;

		Ok(deactivated)
	}

	/// Gives `node` a new name and/or parent and rebases its subtree onto the resulting path,
	/// committing `tx`.
	///
	/// `node.parent_id` must already hold the target parent and `parent_path` its path.
	async fn relocate(
		&self,
		mut tx: Transaction<'_, Postgres>,
		node: LocationRow,
		new_name: String,
		parent_path: Option<String>,
	) -> Result<Location> {
		let old_path = node.path.clone();
		let new_path = hierarchy::child_path(parent_path.as_deref(), &new_name);

		if new_path == old_path {
			tx.commit().await?;

			return Ok(node.into());
		}

		let exclude = Some(node.location_id);

		if locations::sibling_name_taken(&mut *tx, node.parent_id, &new_name, exclude).await? {
			return Err(Error::conflict(format!(
				"A location named {new_name:?} already exists under {}.",
				parent_path.as_deref().unwrap_or("the root")
			)));
		}
		if let Some(existing) =
			locations::find_rewrite_collision(&mut *tx, &old_path, &new_path).await?
		{
			return Err(Error::conflict(format!(
				"Rewriting {old_path} to {new_path} collides with existing location {existing}."
			)));
		}

		locations::lock_subtree(&mut *tx, &old_path).await?;
		locations::set_name_and_parent(&mut *tx, node.location_id, &new_name, node.parent_id)
			.await?;

		let rewritten = locations::rewrite_subtree(&mut *tx, &old_path, &new_path).await?;

		tx.commit().await?;

		tracing::info!(
			location_id = %node.location_id,
			old_path = %old_path,
			new_path = %new_path,
			rewritten,
			"Location subtree rewritten."
		);

		let placed = placements::placed_in_subtree(&self.db.pool, &new_path).await?;
		let refresh: Vec<Uuid> = placed.into_iter().map(|item| item.thing_id).collect();

		self.refresh_index_locations(&refresh).await;

		Ok(Location {
			location_id: node.location_id,
			name: new_name,
			parent_id: node.parent_id,
			path: new_path,
			created_at: node.created_at,
		})
	}
}

fn location_name(raw: &str) -> Result<String> {
	naming::location_name(raw).map_err(|rejection| Error::validation(rejection.describe("name")))
}

async fn require_location(
	tx: &mut Transaction<'_, Postgres>,
	location_id: Uuid,
	label: &str,
) -> Result<LocationRow> {
	locations::get_location(&mut **tx, location_id)
		.await?
		.ok_or_else(|| Error::not_found(format!("{label} {location_id} not found.")))
}

async fn lock_location(
	tx: &mut Transaction<'_, Postgres>,
	location_id: Uuid,
) -> Result<LocationRow> {
	locations::get_location_for_update(&mut **tx, location_id)
		.await?
		.ok_or_else(|| Error::not_found(format!("Location {location_id} not found.")))
}
