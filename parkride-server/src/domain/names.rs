//! Facility name normalization.
//!
//! Upstream feeds annotate retired car parks with markers such as
//! `(historical only)`, prefix most names with `Park&Ride - `, and are
//! loose with whitespace. Everything that compares or displays names goes
//! through these helpers so that all sources agree on one spelling.

/// Parenthetical markers removed from display names, lowercase.
///
/// Longest first so `(historical only)` is not left half-stripped.
const HISTORICAL_MARKERS: [&str; 2] = ["(historical only)", "(historical)"];

/// Prefix used on almost every TfNSW facility name, lowercase.
pub const FACILITY_PREFIX: &str = "park&ride";

/// Display form of the facility prefix.
pub const FACILITY_PREFIX_DISPLAY: &str = "Park&Ride - ";

/// Collapse runs of whitespace to a single space and trim the ends.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Remove historical-status markers (any case) and tidy whitespace.
///
/// ```
/// use parkride_server::domain::clean_display_name;
///
/// assert_eq!(
///     clean_display_name("Park&Ride - Gordon (Historical Only)"),
///     "Park&Ride - Gordon"
/// );
/// ```
pub fn clean_display_name(raw: &str) -> String {
    let mut name = collapse_whitespace(raw);

    // Markers are ASCII, so byte offsets in the lowercased copy line up
    // with the original. Whitespace is collapsed after every removal so a
    // marker split by extra spaces cannot reappear afterwards.
    loop {
        let lower = name.to_ascii_lowercase();
        let found = HISTORICAL_MARKERS
            .iter()
            .filter_map(|marker| lower.find(marker).map(|at| (at, marker.len())))
            .min_by_key(|(at, _)| *at);

        match found {
            Some((at, len)) => {
                name.replace_range(at..at + len, " ");
                name = collapse_whitespace(&name);
            }
            None => break,
        }
    }

    name
}

/// Lowercased clean name: the key form used by the coordinate table.
pub fn canonical_name(raw: &str) -> String {
    clean_display_name(raw).to_lowercase()
}

/// Strip a leading `Park&Ride -` (any case, any spacing around the dash).
///
/// Returns the input unchanged when there is no prefix.
pub fn strip_facility_prefix(name: &str) -> &str {
    let trimmed = name.trim_start();
    match split_after_prefix(trimmed) {
        Some(rest) => rest.trim(),
        None => name.trim(),
    }
}

/// Find `park&ride` anywhere in `name` and return what follows the dash.
///
/// Used to pull a station name out of strings like
/// `"old park&ride-gordon"`.
pub fn station_after_prefix(name: &str) -> Option<&str> {
    let lower = name.to_ascii_lowercase();
    let at = lower.find(FACILITY_PREFIX)?;
    let rest = split_after_prefix(&name[at..])?.trim();
    (!rest.is_empty()).then_some(rest)
}

/// Name form used for fuzzy matching between sources.
pub fn match_key(name: &str) -> String {
    collapse_whitespace(strip_facility_prefix(&clean_display_name(name))).to_lowercase()
}

/// Add the display prefix to bare names such as `"Ashfield"`.
pub fn with_facility_prefix(name: &str) -> String {
    let name = collapse_whitespace(name);
    if split_after_prefix(&name).is_some() {
        name
    } else {
        format!("{FACILITY_PREFIX_DISPLAY}{name}")
    }
}

/// If `s` starts with `park&ride` followed by optional spaces and a dash,
/// return the remainder after the dash.
fn split_after_prefix(s: &str) -> Option<&str> {
    let head = s.get(..FACILITY_PREFIX.len())?;
    if !head.eq_ignore_ascii_case(FACILITY_PREFIX) {
        return None;
    }
    let rest = s[FACILITY_PREFIX.len()..].trim_start();
    rest.strip_prefix('-')
}
