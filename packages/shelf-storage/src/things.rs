use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{Result, models::ThingRow};

const COLUMNS: &str = "thing_id, name, description, metadata, created_at, updated_at";

pub async fn insert_thing<'e, E>(executor: E, row: &ThingRow) -> Result<()>
where
	E: Executor<'e, Database = Postgres>,
{
	sqlx::query(
		"\
INSERT INTO things (thing_id, name, description, metadata, created_at, updated_at)
VALUES ($1, $2, $3, $4, $5, $6)",
	)
	.bind(row.thing_id)
	.bind(row.name.as_str())
	.bind(row.description.as_deref())
	.bind(&row.metadata)
	.bind(row.created_at)
	.bind(row.updated_at)
	.execute(executor)
	.await?;

	Ok(())
}

pub async fn get_thing<'e, E>(executor: E, thing_id: Uuid) -> Result<Option<ThingRow>>
where
	E: Executor<'e, Database = Postgres>,
{
	let sql = format!("SELECT {COLUMNS} FROM things WHERE thing_id = $1");
	let row = sqlx::query_as::<_, ThingRow>(&sql).bind(thing_id).fetch_optional(executor).await?;

	Ok(row)
}

/// Locks the item row, serialising concurrent writers of the same item.
pub async fn get_thing_for_update<'e, E>(executor: E, thing_id: Uuid) -> Result<Option<ThingRow>>
where
	E: Executor<'e, Database = Postgres>,
{
	let sql = format!("SELECT {COLUMNS} FROM things WHERE thing_id = $1 FOR UPDATE");
	let row = sqlx::query_as::<_, ThingRow>(&sql).bind(thing_id).fetch_optional(executor).await?;

	Ok(row)
}

/// A page of items, oldest first with the id as tie-breaker.
pub async fn list_things<'e, E>(executor: E, offset: i64, limit: i64) -> Result<Vec<ThingRow>>
where
	E: Executor<'e, Database = Postgres>,
{
	let sql = format!(
		"SELECT {COLUMNS} FROM things ORDER BY created_at ASC, thing_id ASC OFFSET $1 LIMIT $2"
	);
	let rows = sqlx::query_as::<_, ThingRow>(&sql)
		.bind(offset)
		.bind(limit)
		.fetch_all(executor)
		.await?;

	Ok(rows)
}

pub async fn count_things<'e, E>(executor: E) -> Result<i64>
where
	E: Executor<'e, Database = Postgres>,
{
	let count: i64 = sqlx::query_scalar("SELECT count(*) FROM things").fetch_one(executor).await?;

	Ok(count)
}

/// Overwrites name, description, metadata, and `updated_at`.
pub async fn update_thing<'e, E>(executor: E, row: &ThingRow) -> Result<u64>
where
	E: Executor<'e, Database = Postgres>,
{
	let result = sqlx::query(
		"\
UPDATE things
SET
	name = $2,
	description = $3,
	metadata = $4,
	updated_at = $5
WHERE thing_id = $1",
	)
	.bind(row.thing_id)
	.bind(row.name.as_str())
	.bind(row.description.as_deref())
	.bind(&row.metadata)
	.bind(row.updated_at)
	.execute(executor)
	.await?;

	Ok(result.rows_affected())
}

/// Deletes the item; its placement rows go with it through the foreign key cascade.
pub async fn delete_thing<'e, E>(executor: E, thing_id: Uuid) -> Result<u64>
where
	E: Executor<'e, Database = Postgres>,
{
	let result =
		sqlx::query("DELETE FROM things WHERE thing_id = $1").bind(thing_id).execute(executor).await?;

	Ok(result.rows_affected())
}
