//! Materialized path rules.
//!
//! A root named `Home` lives at `/Home`; its child `Kitchen` at `/Home/Kitchen`. Because every
//! segment is terminated by `/` or the end of the string, byte-wise ordering of paths is a
//! valid pre-order traversal and "descendant of" reduces to a prefix test on `path + "/"`.

pub const PATH_SEPARATOR: char = '/';

pub fn child_path(parent_path: Option<&str>, name: &str) -> String {
	let parent = parent_path.unwrap_or("");
	let mut path = String::with_capacity(parent.len() + name.len() + 1);

	path.push_str(parent);
	path.push(PATH_SEPARATOR);
	path.push_str(name);

	path
}

/// True when `path` is `root` itself or lies anywhere below it.
pub fn is_within(path: &str, root: &str) -> bool {
	match path.strip_prefix(root) {
		Some(rest) => rest.is_empty() || rest.starts_with(PATH_SEPARATOR),
		None => false,
	}
}

/// Moving the node at `node_path` under `new_parent_path` would make it its own ancestor.
pub fn would_create_cycle(node_path: &str, new_parent_path: Option<&str>) -> bool {
	new_parent_path.map(|parent| is_within(parent, node_path)).unwrap_or(false)
}

/// Every ancestor path from the root down to `path` itself.
///
/// `/Home/Kitchen/Drawer` yields `/Home`, `/Home/Kitchen`, `/Home/Kitchen/Drawer`.
pub fn ancestors(path: &str) -> Vec<String> {
	path.char_indices()
		.filter(|(idx, ch)| *idx > 0 && *ch == PATH_SEPARATOR)
		.map(|(idx, _)| path[..idx].to_string())
		.chain((!path.is_empty()).then(|| path.to_string()))
		.collect()
}

/// Canonical form of a caller-supplied subtree filter. Blank filters mean "no filter".
pub fn normalize_filter(filter: &str) -> Option<String> {
	let trimmed = filter.trim().trim_end_matches(PATH_SEPARATOR);

	if trimmed.is_empty() {
		return None;
	}
	if trimmed.starts_with(PATH_SEPARATOR) {
		Some(trimmed.to_string())
	} else {
		Some(format!("{PATH_SEPARATOR}{trimmed}"))
	}
}
