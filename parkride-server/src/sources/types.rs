//! Source payload DTOs and the raw records adapters hand to the pipeline.
//!
//! Upstream feeds are loose: numbers arrive as strings, ids as numbers,
//! and the same endpoint may answer with an array or an id-keyed object.
//! All of that is absorbed here so the pipeline only sees [`RawFacility`].

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ============================================================================
// Lenient scalars
// ============================================================================

/// A numeric field that may be sent as a number, a string, or junk.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum LenientNumber {
    Number(f64),
    Text(String),
    Other(serde_json::Value),
}

impl LenientNumber {
    /// The value as a finite float, if it is one.
    pub fn to_f64(&self) -> Option<f64> {
        let value = match self {
            LenientNumber::Number(n) => Some(*n),
            LenientNumber::Text(s) => parse_leading_number(s),
            LenientNumber::Other(_) => None,
        };
        value.filter(|v| v.is_finite())
    }

    /// The value as a non-negative count. Anything unusable is 0.
    pub fn to_count(&self) -> u32 {
        match self.to_f64() {
            Some(v) if v > 0.0 => v.min(f64::from(u32::MAX)) as u32,
            _ => 0,
        }
    }
}

impl From<u32> for LenientNumber {
    fn from(value: u32) -> Self {
        LenientNumber::Number(f64::from(value))
    }
}

impl From<f64> for LenientNumber {
    fn from(value: f64) -> Self {
        LenientNumber::Number(value)
    }
}

/// Count from an optional lenient field; missing is 0.
pub fn count_of(value: &Option<LenientNumber>) -> u32 {
    value.as_ref().map_or(0, LenientNumber::to_count)
}

/// Parse `"12"`, `" 12.5 "`, or the leading integer of `"12 spaces"`.
fn parse_leading_number(s: &str) -> Option<f64> {
    let s = s.trim();
    if let Ok(v) = s.parse::<f64>() {
        return Some(v);
    }
    let end = s
        .char_indices()
        .find(|(i, c)| !(c.is_ascii_digit() || (*i == 0 && *c == '-')))
        .map_or(s.len(), |(i, _)| i);
    s[..end].parse::<i64>().ok().map(|v| v as f64)
}

/// A text field that may be sent as a string or a number (ids, codes).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum LenientText {
    Text(String),
    Number(serde_json::Number),
}

impl fmt::Display for LenientText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LenientText::Text(s) => f.write_str(s),
            LenientText::Number(n) => write!(f, "{n}"),
        }
    }
}

/// Trimmed, non-empty text of an optional lenient field.
fn text_of(value: &Option<LenientText>) -> Option<String> {
    value
        .as_ref()
        .map(|v| v.to_string().trim().to_string())
        .filter(|s| !s.is_empty())
}

// ============================================================================
// Response shapes
// ============================================================================

/// A collection that arrives either as a JSON array or as an object keyed
/// by facility id.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CarparkPayload<T> {
    List(Vec<T>),
    Keyed(BTreeMap<String, T>),
}

impl<T> CarparkPayload<T> {
    /// Entries with their object key, if any.
    ///
    /// Keyed entries are ordered numerically where the keys are numbers,
    /// so `"2"` comes before `"10"`.
    pub fn into_entries(self) -> Vec<(Option<String>, T)> {
        match self {
            CarparkPayload::List(items) => items.into_iter().map(|item| (None, item)).collect(),
            CarparkPayload::Keyed(map) => {
                let mut entries: Vec<_> = map.into_iter().collect();
                entries.sort_by_cached_key(|(key, _)| {
                    let numeric = key.parse::<u64>().ok();
                    (numeric.is_none(), numeric, key.clone())
                });
                entries
                    .into_iter()
                    .map(|(key, item)| (Some(key), item))
                    .collect()
            }
        }
    }
}

/// One entry of the REST facility listing: a bare name or a full record.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum FacilityListing {
    Name(String),
    Detail(FacilityDetailDto),
}

/// Facility record as served by the REST API and the mock data file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FacilityDetailDto {
    pub facility_id: Option<LenientText>,
    pub facility_name: Option<String>,
    pub tsn: Option<LenientText>,
    pub latitude: Option<LenientNumber>,
    pub longitude: Option<LenientNumber>,
    pub location: Option<LocationDto>,
    pub occupancy: Option<OccupancyDto>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LocationDto {
    pub latitude: Option<LenientNumber>,
    pub longitude: Option<LenientNumber>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OccupancyDto {
    pub total: Option<LenientNumber>,
    pub occupied: Option<LenientNumber>,
    pub time: Option<LenientText>,
    pub month: Option<LenientText>,
}

impl FacilityDetailDto {
    /// Convert to a raw record. `key` is the object key the record was
    /// found under, used when the record has no id of its own.
    pub fn into_raw(self, key: Option<String>) -> RawFacility {
        let (latitude, longitude) = match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => (Some(lat), Some(lon)),
            _ => self
                .location
                .map_or((None, None), |loc| (loc.latitude, loc.longitude)),
        };

        let (counts, time, month) = match self.occupancy {
            Some(occ) => (
                RawCounts::TotalOccupied {
                    total: occ.total,
                    occupied: occ.occupied,
                },
                text_of(&occ.time),
                text_of(&occ.month),
            ),
            None => (RawCounts::Missing, None, None),
        };

        RawFacility {
            id: text_of(&self.facility_id).or(key),
            name: self.facility_name.unwrap_or_default(),
            latitude,
            longitude,
            station_code: text_of(&self.tsn),
            counts,
            time,
            month,
        }
    }
}

/// GraphQL envelope.
#[derive(Debug, Deserialize)]
pub struct GraphqlResponse {
    pub data: Option<GraphqlData>,
    pub errors: Option<Vec<GraphqlErrorDto>>,
}

#[derive(Debug, Deserialize)]
pub struct GraphqlErrorDto {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct GraphqlData {
    pub result: Option<WidgetsResult>,
}

#[derive(Debug, Deserialize)]
pub struct WidgetsResult {
    pub widgets: Option<Widgets>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Widgets {
    pub pnr_locations: Option<Vec<PnrLocation>>,
}

/// One Park&Ride location from the GraphQL widget query.
#[derive(Debug, Clone, Deserialize)]
pub struct PnrLocation {
    pub name: Option<String>,
    /// Free spaces.
    pub spots: Option<LenientNumber>,
    /// Occupied spaces.
    pub occupancy: Option<LenientNumber>,
}

/// One scraped car park: free-text name and free spaces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScrapedCarpark {
    pub name: String,
    pub spaces: u32,
}

/// Scraper response entry before validation.
#[derive(Debug, Deserialize)]
pub struct ScrapedCarparkDto {
    pub name: Option<String>,
    #[serde(alias = "availableSpaces")]
    pub spaces: Option<LenientNumber>,
}

// ============================================================================
// What adapters hand to the pipeline
// ============================================================================

/// The occupancy figures a source reported, in the source's own terms.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum RawCounts {
    /// No occupancy at all (listing-only records).
    #[default]
    Missing,
    /// Capacity and occupied count (REST, mock).
    TotalOccupied {
        total: Option<LenientNumber>,
        occupied: Option<LenientNumber>,
    },
    /// Free and occupied counts; capacity is their sum (GraphQL).
    AvailableOccupied {
        available: Option<LenientNumber>,
        occupied: Option<LenientNumber>,
    },
    /// Free spaces only (scraped pages).
    AvailableOnly { available: Option<LenientNumber> },
}

/// One facility record as decoded from a source, not yet normalized.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawFacility {
    pub id: Option<String>,
    pub name: String,
    pub latitude: Option<LenientNumber>,
    pub longitude: Option<LenientNumber>,
    pub station_code: Option<String>,
    pub counts: RawCounts,
    pub time: Option<String>,
    pub month: Option<String>,
}

impl RawFacility {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_counts(mut self, counts: RawCounts) -> Self {
        self.counts = counts;
        self
    }

    pub fn with_coordinates(mut self, latitude: f64, longitude: f64) -> Self {
        self.latitude = Some(latitude.into());
        self.longitude = Some(longitude.into());
        self
    }

    pub fn with_station_code(mut self, code: impl Into<String>) -> Self {
        self.station_code = Some(code.into());
        self
    }

    pub fn with_labels(mut self, time: impl Into<String>, month: impl Into<String>) -> Self {
        self.time = Some(time.into());
        self.month = Some(month.into());
        self
    }

    /// Records with neither a name nor an id carry nothing we can use.
    pub fn is_blank(&self) -> bool {
        self.name.trim().is_empty() && self.id.as_deref().is_none_or(|id| id.trim().is_empty())
    }
}

/// Everything one fetch from one source produced.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceBatch {
    /// Records that carry their own occupancy.
    Records(Vec<RawFacility>),
    /// A facility listing plus occupancy fetched separately; the pipeline
    /// merges them.
    Split {
        listing: Vec<RawFacility>,
        occupancy: Vec<RawFacility>,
    },
}

impl SourceBatch {
    /// Whether the batch has no facilities.
    pub fn is_empty(&self) -> bool {
        match self {
            SourceBatch::Records(records) => records.is_empty(),
            SourceBatch::Split { listing, .. } => listing.is_empty(),
        }
    }

    /// Number of facilities in the batch.
    pub fn len(&self) -> usize {
        match self {
            SourceBatch::Records(records) => records.len(),
            SourceBatch::Split { listing, .. } => listing.len(),
        }
    }
}

// ============================================================================
// Source identity
// ============================================================================

/// Which adapter served a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Graphql,
    Scrape,
    Rest,
    Mock,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Graphql => "graphql",
            SourceKind::Scrape => "scrape",
            SourceKind::Rest => "rest",
            SourceKind::Mock => "mock",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown source name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown source {0:?} (expected graphql, scrape, rest or mock)")]
pub struct UnknownSourceKind(pub String);

impl FromStr for SourceKind {
    type Err = UnknownSourceKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "graphql" => Ok(SourceKind::Graphql),
            "scrape" => Ok(SourceKind::Scrape),
            "rest" => Ok(SourceKind::Rest),
            "mock" => Ok(SourceKind::Mock),
            _ => Err(UnknownSourceKind(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lenient_numbers() {
        let parse = |json: &str| serde_json::from_str::<LenientNumber>(json).unwrap();

        assert_eq!(parse("42").to_count(), 42);
        assert_eq!(parse("\"42\"").to_count(), 42);
        assert_eq!(parse("\" 17 spaces\"").to_count(), 17);
        assert_eq!(parse("12.9").to_count(), 12);
        assert_eq!(parse("-5").to_count(), 0);
        assert_eq!(parse("\"n/a\"").to_count(), 0);
        assert_eq!(parse("true").to_count(), 0);
        assert_eq!(parse("{}").to_count(), 0);
        assert_eq!(parse("\"-33.6896\"").to_f64(), Some(-33.6896));
    }

    #[test]
    fn missing_count_is_zero() {
        assert_eq!(count_of(&None), 0);
        assert_eq!(count_of(&Some(LenientNumber::from(7u32))), 7);
    }

    #[test]
    fn lenient_text_accepts_numbers() {
        let t: LenientText = serde_json::from_str("26").unwrap();
        assert_eq!(t.to_string(), "26");
        let t: LenientText = serde_json::from_str("\"TWG\"").unwrap();
        assert_eq!(t.to_string(), "TWG");
    }

    #[test]
    fn keyed_payload_orders_numerically() {
        let payload: CarparkPayload<String> =
            serde_json::from_str(r#"{"10": "ten", "2": "two", "x": "other", "1": "one"}"#)
                .unwrap();
        let keys: Vec<_> = payload
            .into_entries()
            .into_iter()
            .map(|(k, _)| k.unwrap())
            .collect();
        assert_eq!(keys, ["1", "2", "10", "x"]);
    }

    #[test]
    fn list_payload_has_no_keys() {
        let payload: CarparkPayload<String> = serde_json::from_str(r#"["a", "b"]"#).unwrap();
        let entries = payload.into_entries();
        assert_eq!(entries, vec![(None, "a".to_string()), (None, "b".to_string())]);
    }

    #[test]
    fn detail_prefers_own_id_and_top_level_coordinates() {
        let dto: FacilityDetailDto = serde_json::from_str(
            r#"{
                "facility_id": 26,
                "facility_name": "Park&Ride - Tallawong P1",
                "tsn": "2155384",
                "location": {"latitude": "-33.69", "longitude": "150.90"},
                "occupancy": {"total": "1004", "occupied": 700, "time": "12:00", "month": "Oct"}
            }"#,
        )
        .unwrap();
        let raw = dto.into_raw(Some("key".into()));

        assert_eq!(raw.id.as_deref(), Some("26"));
        assert_eq!(raw.station_code.as_deref(), Some("2155384"));
        assert_eq!(raw.latitude.unwrap().to_f64(), Some(-33.69));
        assert_eq!(raw.time.as_deref(), Some("12:00"));
        match raw.counts {
            RawCounts::TotalOccupied { total, occupied } => {
                assert_eq!(count_of(&total), 1004);
                assert_eq!(count_of(&occupied), 700);
            }
            other => panic!("unexpected counts {other:?}"),
        }
    }

    #[test]
    fn detail_falls_back_to_key() {
        let raw = FacilityDetailDto::default().into_raw(Some("7".into()));
        assert_eq!(raw.id.as_deref(), Some("7"));
        assert_eq!(raw.counts, RawCounts::Missing);
    }

    #[test]
    fn listing_accepts_names_and_records() {
        let payload: CarparkPayload<FacilityListing> = serde_json::from_str(
            r#"{"1": "Park&Ride - Ashfield", "2": {"facility_name": "Park&Ride - Gordon"}}"#,
        )
        .unwrap();
        let entries = payload.into_entries();
        assert!(matches!(&entries[0].1, FacilityListing::Name(n) if n == "Park&Ride - Ashfield"));
        assert!(matches!(&entries[1].1, FacilityListing::Detail(_)));
    }

    #[test]
    fn blank_records() {
        assert!(RawFacility::default().is_blank());
        assert!(!RawFacility::named("Ashfield").is_blank());
        assert!(!RawFacility::default().with_id("3").is_blank());
    }

    #[test]
    fn source_kind_parsing() {
        assert_eq!("GraphQL".parse::<SourceKind>().unwrap(), SourceKind::Graphql);
        assert_eq!(" rest ".parse::<SourceKind>().unwrap(), SourceKind::Rest);
        assert!("ftp".parse::<SourceKind>().is_err());
        assert_eq!(SourceKind::Scrape.to_string(), "scrape");
        assert_eq!(serde_json::to_string(&SourceKind::Mock).unwrap(), "\"mock\"");
    }
}
