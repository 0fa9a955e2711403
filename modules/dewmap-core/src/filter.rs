//! Search filtering over the loaded find set.
//!
//! Pure substring matching: no fuzzy scoring, no re-sorting. Survivors keep
//! the relative order they had in the input.

use dewmap_common::Find;

/// Trim and lowercase a raw search box value.
pub fn normalize_query(query: &str) -> String {
    query.trim().to_lowercase()
}

/// Whether `find` matches an already-normalized, non-empty query.
pub fn matches(find: &Find, normalized: &str) -> bool {
    find.flavor.to_lowercase().contains(normalized)
        || find.location_name.to_lowercase().contains(normalized)
        || find.address.to_lowercase().contains(normalized)
}

/// Narrow `finds` to those whose flavor, location name, or address contains
/// the query. A blank query returns the input unchanged.
pub fn filter_finds(query: &str, finds: &[Find]) -> Vec<Find> {
    let normalized = normalize_query(query);
    if normalized.is_empty() {
        return finds.to_vec();
    }
    finds
        .iter()
        .filter(|find| matches(find, &normalized))
        .cloned()
        .collect()
}
