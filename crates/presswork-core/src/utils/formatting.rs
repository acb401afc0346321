//! Formatting helpers for log output.

/// Shortens an id for use as a log field.
///
/// Entity ids are UUIDs; the first eight characters are enough to match log
/// lines by eye without flooding the output.
pub fn truncate_id(id: &str) -> String {
	if id.len() > 10 {
		format!("{}..", &id[..8])
	} else {
		id.to_string()
	}
}
