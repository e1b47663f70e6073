// Identifier helpers.
//
// Users, roles and profiles take PG's gen_random_uuid() (v4). Clinical rows
// and sessions are created with app-side UUIDv7 so they sort by creation time
// in both store implementations.

use uuid::Uuid;

/// Generate a new UUIDv7 (timestamp-sortable).
pub fn uuidv7() -> Uuid {
    Uuid::now_v7()
}

/// New UUIDv7 in its canonical hyphenated text form.
pub fn new_id() -> String {
    uuidv7().to_string()
}

/// Parse an externally supplied ID. Malformed IDs can never match a row, so
/// callers treat `None` as "no such row".
pub fn parse_id(raw: &str) -> Option<Uuid> {
    Uuid::parse_str(raw.trim()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_id_is_a_v7_uuid() {
        let id = parse_id(&new_id()).unwrap();
        assert_eq!(id.get_version(), Some(uuid::Version::SortRand));
    }

    #[test]
    fn ids_sort_by_creation() {
        let a = new_id();
        let b = new_id();
        assert!(b >= a);
    }

    #[test]
    fn malformed_ids_do_not_parse() {
        assert!(parse_id("not-a-uuid").is_none());
        assert!(parse_id("").is_none());
    }
}
