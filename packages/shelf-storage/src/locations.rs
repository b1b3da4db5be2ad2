//! SQL for the location tree.
//!
//! Subtree selection is `path = $root OR starts_with(path, $root || '/')`, which is
//! segment-aware: `/Home` does not select `/Homestead`.

use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{Result, models::LocationRow};

/// Key of the transaction-scoped advisory lock serialising every hierarchy mutation.
pub const HIERARCHY_LOCK: i64 = 7_120_301;

const COLUMNS: &str = "location_id, name, parent_id, path, created_at";
// Maps the separator below every other character so byte order is a pre-order walk even
// when names contain characters that sort before '/'.
const PREORDER: &str = "translate(path, '/', chr(1)) COLLATE \"C\"";

/// Blocks until no other hierarchy mutation is in flight; released at commit or rollback.
pub async fn lock_hierarchy<'e, E>(executor: E) -> Result<()>
where
	E: Executor<'e, Database = Postgres>,
{
	sqlx::query("SELECT pg_advisory_xact_lock($1)").bind(HIERARCHY_LOCK).execute(executor).await?;

	Ok(())
}

pub async fn insert_location<'e, E>(executor: E, row: &LocationRow) -> Result<()>
where
	E: Executor<'e, Database = Postgres>,
{
	sqlx::query(
		"\
INSERT INTO locations (location_id, name, parent_id, path, created_at)
VALUES ($1, $2, $3, $4, $5)",
	)
	.bind(row.location_id)
	.bind(row.name.as_str())
	.bind(row.parent_id)
	.bind(row.path.as_str())
	.bind(row.created_at)
	.execute(executor)
	.await?;

	Ok(())
}

pub async fn get_location<'e, E>(executor: E, location_id: Uuid) -> Result<Option<LocationRow>>
where
	E: Executor<'e, Database = Postgres>,
{
	let sql = format!("SELECT {COLUMNS} FROM locations WHERE location_id = $1");
	let row = sqlx::query_as::<_, LocationRow>(&sql)
		.bind(location_id)
		.fetch_optional(executor)
		.await?;

	Ok(row)
}

/// Like [`get_location`], holding a row lock until the transaction ends.
pub async fn get_location_for_update<'e, E>(
	executor: E,
	location_id: Uuid,
) -> Result<Option<LocationRow>>
where
	E: Executor<'e, Database = Postgres>,
{
	let sql = format!("SELECT {COLUMNS} FROM locations WHERE location_id = $1 FOR UPDATE");
	let row = sqlx::query_as::<_, LocationRow>(&sql)
		.bind(location_id)
		.fetch_optional(executor)
		.await?;

	Ok(row)
}

/// Like [`get_location`], holding a share lock so the row cannot be deleted or moved
/// until the transaction ends.
pub async fn get_location_for_share<'e, E>(
	executor: E,
	location_id: Uuid,
) -> Result<Option<LocationRow>>
where
	E: Executor<'e, Database = Postgres>,
{
	let sql = format!("SELECT {COLUMNS} FROM locations WHERE location_id = $1 FOR SHARE");
	let row = sqlx::query_as::<_, LocationRow>(&sql)
		.bind(location_id)
		.fetch_optional(executor)
		.await?;

	Ok(row)
}

pub async fn get_location_by_path<'e, E>(executor: E, path: &str) -> Result<Option<LocationRow>>
where
	E: Executor<'e, Database = Postgres>,
{
	let sql = format!("SELECT {COLUMNS} FROM locations WHERE path = $1");
	let row = sqlx::query_as::<_, LocationRow>(&sql).bind(path).fetch_optional(executor).await?;

	Ok(row)
}

/// Whether `parent_id` (or the root level when `None`) already has a child called `name`,
/// ignoring `exclude`.
pub async fn sibling_name_taken<'e, E>(
	executor: E,
	parent_id: Option<Uuid>,
	name: &str,
	exclude: Option<Uuid>,
) -> Result<bool>
where
	E: Executor<'e, Database = Postgres>,
{
	let taken: bool = sqlx::query_scalar(
		"\
SELECT EXISTS (
	SELECT 1
	FROM locations
	WHERE parent_id IS NOT DISTINCT FROM $1
		AND name = $2
		AND location_id IS DISTINCT FROM $3
)",
	)
	.bind(parent_id)
	.bind(name)
	.bind(exclude)
	.fetch_one(executor)
	.await?;

	Ok(taken)
}

pub async fn list_children<'e, E>(
	executor: E,
	parent_id: Option<Uuid>,
) -> Result<Vec<LocationRow>>
where
	E: Executor<'e, Database = Postgres>,
{
	let sql = format!(
		"SELECT {COLUMNS} FROM locations WHERE parent_id IS NOT DISTINCT FROM $1 ORDER BY {PREORDER}"
	);
	let rows = sqlx::query_as::<_, LocationRow>(&sql).bind(parent_id).fetch_all(executor).await?;

	Ok(rows)
}

pub async fn has_children<'e, E>(executor: E, location_id: Uuid) -> Result<bool>
where
	E: Executor<'e, Database = Postgres>,
{
	let exists: bool =
		sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM locations WHERE parent_id = $1)")
			.bind(location_id)
			.fetch_one(executor)
			.await?;

	Ok(exists)
}

/// The node at `root_path` and all of its descendants, in pre-order.
pub async fn list_subtree<'e, E>(executor: E, root_path: &str) -> Result<Vec<LocationRow>>
where
	E: Executor<'e, Database = Postgres>,
{
	let sql = format!(
		"\
SELECT {COLUMNS}
FROM locations
WHERE path = $1 OR starts_with(path, $1 || '/')
ORDER BY {PREORDER}"
	);
	let rows = sqlx::query_as::<_, LocationRow>(&sql).bind(root_path).fetch_all(executor).await?;

	Ok(rows)
}

pub async fn list_all<'e, E>(executor: E) -> Result<Vec<LocationRow>>
where
	E: Executor<'e, Database = Postgres>,
{
	let sql = format!("SELECT {COLUMNS} FROM locations ORDER BY {PREORDER}");
	let rows = sqlx::query_as::<_, LocationRow>(&sql).fetch_all(executor).await?;

	Ok(rows)
}

/// Row-locks every member of the subtree rooted at `root_path`; returns how many were locked.
pub async fn lock_subtree<'e, E>(executor: E, root_path: &str) -> Result<usize>
where
	E: Executor<'e, Database = Postgres>,
{
	let ids: Vec<Uuid> = sqlx::query_scalar(
		"\
SELECT location_id
FROM locations
WHERE path = $1 OR starts_with(path, $1 || '/')
FOR UPDATE",
	)
	.bind(root_path)
	.fetch_all(executor)
	.await?;

	Ok(ids.len())
}

/// The first existing path outside the `old_prefix` subtree that rebasing the subtree onto
/// `new_prefix` would produce, if any.
pub async fn find_rewrite_collision<'e, E>(
	executor: E,
	old_prefix: &str,
	new_prefix: &str,
) -> Result<Option<String>>
where
	E: Executor<'e, Database = Postgres>,
{
	let collision: Option<String> = sqlx::query_scalar(
		"\
SELECT existing.path
FROM locations existing
WHERE existing.path IN (
		SELECT $2 || substr(src.path, char_length($1) + 1)
		FROM locations src
		WHERE src.path = $1 OR starts_with(src.path, $1 || '/')
	)
	AND NOT (existing.path = $1 OR starts_with(existing.path, $1 || '/'))
ORDER BY existing.path
LIMIT 1",
	)
	.bind(old_prefix)
	.bind(new_prefix)
	.fetch_optional(executor)
	.await?;

	Ok(collision)
}

/// Replaces the `old_prefix` head of every path in its subtree with `new_prefix` in a single
/// statement; returns the number of rewritten rows.
pub async fn rewrite_subtree<'e, E>(executor: E, old_prefix: &str, new_prefix: &str) -> Result<u64>
where
	E: Executor<'e, Database = Postgres>,
{
	let result = sqlx::query(
		"\
UPDATE locations
SET path = $2 || substr(path, char_length($1) + 1)
WHERE path = $1 OR starts_with(path, $1 || '/')",
	)
	.bind(old_prefix)
	.bind(new_prefix)
	.execute(executor)
	.await?;

	Ok(result.rows_affected())
}

pub async fn set_name_and_parent<'e, E>(
	executor: E,
	location_id: Uuid,
	name: &str,
	parent_id: Option<Uuid>,
) -> Result<()>
where
	E: Executor<'e, Database = Postgres>,
{
	sqlx::query("UPDATE locations SET name = $2, parent_id = $3 WHERE location_id = $1")
		.bind(location_id)
		.bind(name)
		.bind(parent_id)
		.execute(executor)
		.await?;

	Ok(())
}

pub async fn delete_location<'e, E>(executor: E, location_id: Uuid) -> Result<u64>
where
	E: Executor<'e, Database = Postgres>,
{
	let result = sqlx::query("DELETE FROM locations WHERE location_id = $1")
		.bind(location_id)
		.execute(executor)
		.await?;

	Ok(result.rows_affected())
}
