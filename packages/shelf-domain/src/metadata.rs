use std::{
	collections::{BTreeMap, HashSet},
	fmt,
};

use serde::{Deserialize, Serialize};

pub const MAX_TAGS: usize = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Category {
	Electronics,
	Kitchenware,
	Clothing,
	Tools,
	Furniture,
	Stationery,
	Toiletries,
	Toys,
	#[default]
	General,
}
impl Category {
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Electronics => "electronics",
			Self::Kitchenware => "kitchenware",
			Self::Clothing => "clothing",
			Self::Tools => "tools",
			Self::Furniture => "furniture",
			Self::Stationery => "stationery",
			Self::Toiletries => "toiletries",
			Self::Toys => "toys",
			Self::General => "general",
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Material {
	Metal,
	Plastic,
	Wood,
	Glass,
	Ceramic,
	Fabric,
	Paper,
}
impl Material {
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Metal => "metal",
			Self::Plastic => "plastic",
			Self::Wood => "wood",
			Self::Glass => "glass",
			Self::Ceramic => "ceramic",
			Self::Fabric => "fabric",
			Self::Paper => "paper",
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoomHint {
	#[serde(rename = "kitchen")]
	Kitchen,
	#[serde(rename = "bedroom")]
	Bedroom,
	#[serde(rename = "bathroom")]
	Bathroom,
	#[serde(rename = "living room")]
	LivingRoom,
	#[serde(rename = "garage")]
	Garage,
	#[serde(rename = "office")]
	Office,
	#[serde(rename = "laundry")]
	Laundry,
}
impl RoomHint {
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Kitchen => "kitchen",
			Self::Bedroom => "bedroom",
			Self::Bathroom => "bathroom",
			Self::LivingRoom => "living room",
			Self::Garage => "garage",
			Self::Office => "office",
			Self::Laundry => "laundry",
		}
	}
}

impl fmt::Display for Category {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl fmt::Display for Material {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl fmt::Display for RoomHint {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Structured metadata attached to an item.
///
/// Values are produced whole by enrichment and replaced whole on re-enrichment; nothing
/// patches individual fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct MetadataSchema {
	#[serde(default)]
	pub category: Category,
	/// Reserved.
	#[serde(default)]
	pub subtype: Option<String>,
	#[serde(default)]
	pub tags: Vec<String>,
	#[serde(default)]
	pub material: Option<Material>,
	#[serde(default)]
	pub room_hint: Option<RoomHint>,
	#[serde(default)]
	pub usage_context: Vec<String>,
	/// Reserved for caller extensions.
	#[serde(default)]
	pub custom: BTreeMap<String, String>,
}

/// Lowercases, trims, and deduplicates tags keeping first occurrences, capped at
/// [`MAX_TAGS`].
pub fn normalize_tags<I, S>(raw: I) -> Vec<String>
where
	I: IntoIterator<Item = S>,
	S: AsRef<str>,
{
	let mut seen = HashSet::new();
	let mut out = Vec::new();

	for tag in raw {
		let tag = tag.as_ref().trim().to_lowercase();

		if tag.is_empty() || !seen.insert(tag.clone()) {
			continue;
		}

		out.push(tag);

		if out.len() == MAX_TAGS {
			break;
		}
	}

	out
}

pub fn usage_context(category: Category, room_hint: Option<RoomHint>) -> Vec<String> {
	std::iter::once(category.as_str())
		.chain(room_hint.map(RoomHint::as_str))
		.map(str::to_string)
		.collect()
}
