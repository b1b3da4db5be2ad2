use unicode_normalization::UnicodeNormalization;

use crate::hierarchy::PATH_SEPARATOR;

pub const MAX_NAME_CHARS: usize = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameRejection {
	Empty,
	TooLong,
	ContainsSeparator,
}
impl NameRejection {
	pub fn describe(self, field: &str) -> String {
		match self {
			Self::Empty => format!("{field} must be non-empty."),
			Self::TooLong => format!("{field} must be at most {MAX_NAME_CHARS} characters."),
			Self::ContainsSeparator => format!("{field} must not contain '{PATH_SEPARATOR}'."),
		}
	}
}

/// Canonical form of a location name: trimmed, NFC, and free of the path separator.
pub fn location_name(raw: &str) -> Result<String, NameRejection> {
	let name = canonical(raw)?;

	if name.contains(PATH_SEPARATOR) {
		return Err(NameRejection::ContainsSeparator);
	}

	Ok(name)
}

pub fn item_name(raw: &str) -> Result<String, NameRejection> {
	canonical(raw)
}

fn canonical(raw: &str) -> Result<String, NameRejection> {
	let name: String = raw.trim().nfc().collect();

	if name.is_empty() {
		return Err(NameRejection::Empty);
	}
	if name.chars().count() > MAX_NAME_CHARS {
		return Err(NameRejection::TooLong);
	}

	Ok(name)
}
