/// The bootstrap script with every `\ir` include inlined.
pub fn render_schema() -> String {
	expand_includes(include_str!("../../../sql/init.sql"))
}

fn expand_includes(sql: &str) -> String {
	let mut out = String::new();

	for line in sql.lines() {
		match line.trim().strip_prefix("\\ir ").map(str::trim) {
			Some("tables/001_locations.sql") =>
				out.push_str(include_str!("../../../sql/tables/001_locations.sql")),
			Some("tables/002_things.sql") =>
				out.push_str(include_str!("../../../sql/tables/002_things.sql")),
			Some("tables/003_placements.sql") =>
				out.push_str(include_str!("../../../sql/tables/003_placements.sql")),
			_ => out.push_str(line),
		}

		out.push('\n');
	}

	out
}
