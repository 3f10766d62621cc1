//! Free-text facility search.

use crate::domain::Facility;

/// Facilities matching every word of `query`, in input order.
///
/// Each whitespace-separated token must appear, case-insensitively, in
/// the facility's name, station code or id. A blank query matches nothing.
pub fn search_facilities<'a>(facilities: &'a [Facility], query: &str) -> Vec<&'a Facility> {
    let tokens: Vec<String> = query.split_whitespace().map(str::to_lowercase).collect();
    if tokens.is_empty() {
        return Vec::new();
    }

    facilities
        .iter()
        .filter(|facility| {
            let haystack = search_text(facility);
            tokens.iter().all(|token| haystack.contains(token.as_str()))
        })
        .collect()
}

fn search_text(facility: &Facility) -> String {
    let code = facility
        .station_code
        .as_ref()
        .map(|c| c.as_str())
        .unwrap_or_default();
    format!("{} {} {}", facility.name, code, facility.id).to_lowercase()
}
