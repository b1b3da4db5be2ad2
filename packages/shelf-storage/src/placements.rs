//! SQL for placement rows.
//!
//! Rows are never deleted by placement operations; moving or removing an item flips its
//! active row to inactive. At most one active row per item is enforced by the partial unique
//! index `idx_placements_one_active`.

use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
	Result,
	models::{PlacedThing, PlacementRow, ThingRow},
};

const COLUMNS: &str = "placement_id, thing_id, location_id, placed_at, active";

pub async fn insert_placement<'e, E>(executor: E, row: &PlacementRow) -> Result<()>
where
	E: Executor<'e, Database = Postgres>,
{
	sqlx::query(
		"\
INSERT INTO placements (placement_id, thing_id, location_id, placed_at, active)
VALUES ($1, $2, $3, $4, $5)",
	)
	.bind(row.placement_id)
	.bind(row.thing_id)
	.bind(row.location_id)
	.bind(row.placed_at)
	.bind(row.active)
	.execute(executor)
	.await?;

	Ok(())
}

/// Flips the item's active row, if any, to inactive; returns 0 or 1.
pub async fn deactivate_for_thing<'e, E>(executor: E, thing_id: Uuid) -> Result<u64>
where
	E: Executor<'e, Database = Postgres>,
{
	let result =
		sqlx::query("UPDATE placements SET active = false WHERE thing_id = $1 AND active")
			.bind(thing_id)
			.execute(executor)
			.await?;

	Ok(result.rows_affected())
}

pub async fn deactivate_at_location<'e, E>(executor: E, location_id: Uuid) -> Result<u64>
where
	E: Executor<'e, Database = Postgres>,
{
	let result =
		sqlx::query("UPDATE placements SET active = false WHERE location_id = $1 AND active")
			.bind(location_id)
			.execute(executor)
			.await?;

	Ok(result.rows_affected())
}

pub async fn current_placement<'e, E>(executor: E, thing_id: Uuid) -> Result<Option<PlacementRow>>
where
	E: Executor<'e, Database = Postgres>,
{
	let sql = format!("SELECT {COLUMNS} FROM placements WHERE thing_id = $1 AND active");
	let row =
		sqlx::query_as::<_, PlacementRow>(&sql).bind(thing_id).fetch_optional(executor).await?;

	Ok(row)
}

/// Every placement of the item, newest first.
pub async fn placement_history<'e, E>(executor: E, thing_id: Uuid) -> Result<Vec<PlacementRow>>
where
	E: Executor<'e, Database = Postgres>,
{
	let sql = format!(
		"\
SELECT {COLUMNS}
FROM placements
WHERE thing_id = $1
ORDER BY placed_at DESC, active DESC, placement_id"
	);
	let rows = sqlx::query_as::<_, PlacementRow>(&sql).bind(thing_id).fetch_all(executor).await?;

	Ok(rows)
}

/// Items actively placed at exactly `location_id`, by name.
pub async fn things_at_location<'e, E>(executor: E, location_id: Uuid) -> Result<Vec<ThingRow>>
where
	E: Executor<'e, Database = Postgres>,
{
	let rows = sqlx::query_as::<_, ThingRow>(
		"\
SELECT t.thing_id, t.name, t.description, t.metadata, t.created_at, t.updated_at
FROM things t
JOIN placements p ON p.thing_id = t.thing_id
WHERE p.location_id = $1 AND p.active
ORDER BY t.name, t.thing_id",
	)
	.bind(location_id)
	.fetch_all(executor)
	.await?;

	Ok(rows)
}

/// The active placement of the item joined to its location's current path.
pub async fn placed_thing<'e, E>(executor: E, thing_id: Uuid) -> Result<Option<PlacedThing>>
where
	E: Executor<'e, Database = Postgres>,
{
	let row = sqlx::query_as::<_, PlacedThing>(
		"\
SELECT p.thing_id, p.location_id, l.path AS location_path
FROM placements p
JOIN locations l ON l.location_id = p.location_id
WHERE p.thing_id = $1 AND p.active",
	)
	.bind(thing_id)
	.fetch_optional(executor)
	.await?;

	Ok(row)
}

/// Active placements anywhere in the subtree rooted at `root_path`.
pub async fn placed_in_subtree<'e, E>(executor: E, root_path: &str) -> Result<Vec<PlacedThing>>
where
	E: Executor<'e, Database = Postgres>,
{
	let rows = sqlx::query_as::<_, PlacedThing>(
		"\
SELECT p.thing_id, p.location_id, l.path AS location_path
FROM placements p
JOIN locations l ON l.location_id = p.location_id
WHERE p.active AND (l.path = $1 OR starts_with(l.path, $1 || '/'))
ORDER BY p.thing_id",
	)
	.bind(root_path)
	.fetch_all(executor)
	.await?;

	Ok(rows)
}
