//! Rule-based metadata enrichment.
//!
//! Category and room hint are chosen by the highest keyword hit count, ties going to the
//! entry declared first. Material is the first declared entry with any hit at all. The two
//! rules differ on purpose and must stay that way.

use std::collections::HashSet;

use crate::metadata::{self, Category, Material, MetadataSchema, RoomHint};

const MIN_TAG_CHARS: usize = 3;

/// One keyword, pre-split into tokens so multi-word entries match consecutive tokens.
#[derive(Debug, Clone)]
struct Keyword(Vec<String>);
impl Keyword {
	fn new(raw: &str) -> Self {
		Self(tokenize(raw))
	}

	fn matches(&self, tokens: &[String], token_set: &HashSet<&str>) -> bool {
		match self.0.as_slice() {
			[] => false,
			[single] => token_set.contains(single.as_str()),
			parts => tokens.windows(parts.len()).any(|window| window == parts),
		}
	}
}

/// Keyword tables used by [`MetadataEnricher`].
///
/// Declaration order is significant: it breaks ties for category and room hint, and decides
/// material outright.
#[derive(Debug, Clone)]
pub struct KeywordDictionary {
	pub categories: Vec<(Category, Vec<String>)>,
	pub materials: Vec<(Material, Vec<String>)>,
	pub rooms: Vec<(RoomHint, Vec<String>)>,
	pub stop_words: Vec<String>,
}
impl Default for KeywordDictionary {
	fn default() -> Self {
		Self {
			categories: vec![
				(
					Category::Electronics,
					words(&[
						"phone",
						"laptop",
						"charger",
						"cable",
						"headphone",
						"speaker",
						"tablet",
						"mouse",
						"keyboard",
						"monitor",
						"camera",
						"battery",
						"adapter",
						"usb",
						"remote",
						"controller",
						"console",
						"router",
						"hub",
					]),
				),
				(
					Category::Kitchenware,
					words(&[
						"pan", "pot", "spoon", "fork", "knife", "plate", "bowl", "cup", "mug", "glass",
						"blender", "toaster", "kettle", "spatula", "whisk", "grater", "peeler",
						"tray", "colander",
					]),
				),
				(
					Category::Clothing,
					words(&[
						"shirt", "pants", "jacket", "coat", "shoe", "sock", "hat", "scarf", "glove",
						"dress", "skirt", "sweater", "hoodie", "belt", "tie", "boot",
					]),
				),
				(
					Category::Tools,
					words(&[
						"hammer",
						"screwdriver",
						"wrench",
						"plier",
						"drill",
						"saw",
						"tape",
						"level",
						"clamp",
						"sandpaper",
						"nail",
						"screw",
						"bolt",
					]),
				),
				(
					Category::Furniture,
					words(&[
						"chair", "table", "desk", "shelf", "cabinet", "drawer", "bed", "couch",
						"sofa", "lamp", "mirror", "rug", "curtain", "stool",
					]),
				),
				(
					Category::Stationery,
					words(&[
						"pen",
						"pencil",
						"notebook",
						"paper",
						"stapler",
						"eraser",
						"ruler",
						"marker",
						"highlighter",
						"binder",
						"clip",
						"envelope",
						"stamp",
					]),
				),
				(
					Category::Toiletries,
					words(&[
						"soap",
						"shampoo",
						"toothbrush",
						"toothpaste",
						"towel",
						"razor",
						"comb",
						"brush",
						"lotion",
						"deodorant",
						"tissue",
					]),
				),
				(
					Category::Toys,
					words(&[
						"toy",
						"game",
						"puzzle",
						"doll",
						"lego",
						"block",
						"ball",
						"figure",
						"board game",
					]),
				),
			],
			materials: vec![
				(
					Material::Metal,
					words(&["steel", "iron", "aluminum", "copper", "brass", "metal", "tin"]),
				),
				(
					Material::Plastic,
					words(&["plastic", "polymer", "acrylic", "nylon", "pvc", "silicone"]),
				),
				(
					Material::Wood,
					words(&["wood", "wooden", "bamboo", "oak", "pine", "walnut", "plywood"]),
				),
				(Material::Glass, words(&["glass", "crystal"])),
				(Material::Ceramic, words(&["ceramic", "porcelain", "clay"])),
				(
					Material::Fabric,
					words(&["cotton", "polyester", "linen", "silk", "wool", "leather", "fabric"]),
				),
				(Material::Paper, words(&["paper", "cardboard", "cardstock"])),
			],
			rooms: vec![
				(RoomHint::Kitchen, words(&["kitchen", "cook", "bake", "food", "dish"])),
				(RoomHint::Bedroom, words(&["bed", "sleep", "pillow", "mattress", "nightstand"])),
				(RoomHint::Bathroom, words(&["bath", "shower", "toilet", "sink"])),
				(RoomHint::LivingRoom, words(&["couch", "sofa", "tv", "television", "remote"])),
				(RoomHint::Garage, words(&["car", "tool", "drill", "saw", "wrench"])),
				(
					RoomHint::Office,
					words(&["desk", "computer", "monitor", "keyboard", "pen", "paper"]),
				),
				(RoomHint::Laundry, words(&["wash", "iron", "dryer", "detergent"])),
			],
			stop_words: words(&[
				"a", "an", "the", "in", "on", "at", "to", "for", "of", "and", "or", "is", "it", "my",
				"with", "from", "this", "that",
			]),
		}
	}
}

/// Deterministic, offline enrichment: identical input always yields an identical schema.
#[derive(Debug, Clone)]
pub struct MetadataEnricher {
	categories: Vec<(Category, Vec<Keyword>)>,
	materials: Vec<(Material, Vec<Keyword>)>,
	rooms: Vec<(RoomHint, Vec<Keyword>)>,
	stop_words: HashSet<String>,
}
impl MetadataEnricher {
	pub fn new(dictionary: KeywordDictionary) -> Self {
		Self {
			categories: compile(dictionary.categories),
			materials: compile(dictionary.materials),
			rooms: compile(dictionary.rooms),
			stop_words: dictionary.stop_words.iter().map(|word| word.to_lowercase()).collect(),
		}
	}

	pub fn enrich(&self, name: &str, description: Option<&str>) -> MetadataSchema {
		let tokens = tokenize(&format!("{name} {}", description.unwrap_or("")));
		let token_set: HashSet<&str> = tokens.iter().map(String::as_str).collect();
		let category = best_scoring(&self.categories, &tokens, &token_set)
			.unwrap_or(Category::General);
		let material = first_matching(&self.materials, &tokens, &token_set);
		let room_hint = best_scoring(&self.rooms, &tokens, &token_set);
		let tags = self.tags(&tokens);

		MetadataSchema {
			category,
			subtype: None,
			tags,
			material,
			room_hint,
			usage_context: metadata::usage_context(category, room_hint),
			custom: Default::default(),
		}
	}

	fn tags(&self, tokens: &[String]) -> Vec<String> {
		metadata::normalize_tags(tokens.iter().filter(|token| {
			token.chars().count() >= MIN_TAG_CHARS && !self.stop_words.contains(token.as_str())
		}))
	}
}
impl Default for MetadataEnricher {
	fn default() -> Self {
		Self::new(KeywordDictionary::default())
	}
}

/// Lowercase alphanumeric runs of `text`, in order, duplicates kept.
pub fn tokenize(text: &str) -> Vec<String> {
	text.to_lowercase()
		.split(|ch: char| !ch.is_alphanumeric())
		.filter(|token| !token.is_empty())
		.map(str::to_string)
		.collect()
}

fn words(raw: &[&str]) -> Vec<String> {
	raw.iter().map(|word| word.to_string()).collect()
}

fn compile<T>(entries: Vec<(T, Vec<String>)>) -> Vec<(T, Vec<Keyword>)> {
	entries
		.into_iter()
		.map(|(label, keywords)| (label, keywords.iter().map(|kw| Keyword::new(kw)).collect()))
		.collect()
}

fn hits(keywords: &[Keyword], tokens: &[String], token_set: &HashSet<&str>) -> usize {
	keywords.iter().filter(|keyword| keyword.matches(tokens, token_set)).count()
}

fn best_scoring<T>(
	entries: &[(T, Vec<Keyword>)],
	tokens: &[String],
	token_set: &HashSet<&str>,
) -> Option<T>
where
	T: Copy,
{
	let mut best: Option<(T, usize)> = None;

	for (label, keywords) in entries {
		let score = hits(keywords, tokens, token_set);

		// Strictly greater keeps the earliest declared entry on ties.
		if score > best.map(|(_, top)| top).unwrap_or(0) {
			best = Some((*label, score));
		}
	}

	best.map(|(label, _)| label)
}

fn first_matching<T>(
	entries: &[(T, Vec<Keyword>)],
	tokens: &[String],
	token_set: &HashSet<&str>,
) -> Option<T>
where
	T: Copy,
{
	entries
		.iter()
		.find(|(_, keywords)| keywords.iter().any(|keyword| keyword.matches(tokens, token_set)))
		.map(|(label, _)| *label)
}
