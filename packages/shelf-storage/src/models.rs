use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct LocationRow {
	pub location_id: Uuid,
	pub name: String,
	pub parent_id: Option<Uuid>,
	pub path: String,
	pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct ThingRow {
	pub thing_id: Uuid,
	pub name: String,
	pub description: Option<String>,
	pub metadata: Value,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct PlacementRow {
	pub placement_id: Uuid,
	pub thing_id: Uuid,
	pub location_id: Uuid,
	pub placed_at: OffsetDateTime,
	pub active: bool,
}

/// An item with an active placement, joined to the current path of its location.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct PlacedThing {
	pub thing_id: Uuid,
	pub location_id: Uuid,
	pub location_path: String,
}
