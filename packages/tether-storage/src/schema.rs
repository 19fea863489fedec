/// Bumped whenever a table definition changes. Stored in `PRAGMA user_version`.
pub const SCHEMA_VERSION: i64 = 1;

pub fn render_schema() -> String {
	let init = include_str!("../../../sql/init.sql");

	expand_includes(init)
}

fn expand_includes(sql: &str) -> String {
	let mut out = String::new();

	for line in sql.lines() {
		let trimmed = line.trim();

		if let Some(path) = trimmed.strip_prefix("\\ir ") {
			match path.trim() {
				"tables/001_outbox_entries.sql" =>
					out.push_str(include_str!("../../../sql/tables/001_outbox_entries.sql")),
				"tables/002_response_cache.sql" =>
					out.push_str(include_str!("../../../sql/tables/002_response_cache.sql")),
				_ => out.push_str(line),
			}
		} else {
			out.push_str(line);
		}

		out.push('\n');
	}

	out
}
