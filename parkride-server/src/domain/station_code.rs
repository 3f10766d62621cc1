//! Station code types.

use std::fmt;

use serde::{Serialize, Serializer};

/// Longest station code we accept. TfNSW uses short letter codes (`TWG`)
/// in its own data and longer numeric stop ids in some feeds.
const MAX_LEN: usize = 10;

/// Error returned when parsing an invalid station code.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid station code: {reason}")]
pub struct InvalidStationCode {
    reason: &'static str,
}

/// A short station code attached to a facility (e.g. `TWG` for Tallawong).
///
/// Codes are 1 to 10 uppercase ASCII letters or digits. This type guarantees
/// that any `StationCode` value is valid by construction.
///
/// # Examples
///
/// ```
/// use parkride_server::domain::StationCode;
///
/// let twg = StationCode::parse("TWG").unwrap();
/// assert_eq!(twg.as_str(), "TWG");
///
/// // Lowercase is rejected by the strict parser...
/// assert!(StationCode::parse("twg").is_err());
/// // ...but accepted by the normalizing one
/// assert_eq!(StationCode::parse_normalized(" twg ").unwrap(), twg);
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StationCode(String);

impl StationCode {
    /// Parse a station code from a string.
    ///
    /// The input must be 1 to 10 uppercase ASCII letters or digits.
    pub fn parse(s: &str) -> Result<Self, InvalidStationCode> {
        if s.is_empty() {
            return Err(InvalidStationCode {
                reason: "must not be empty",
            });
        }

        if s.len() > MAX_LEN {
            return Err(InvalidStationCode {
                reason: "must be at most 10 characters",
            });
        }

        if !s
            .bytes()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
        {
            return Err(InvalidStationCode {
                reason: "must be uppercase ASCII letters or digits",
            });
        }

        Ok(StationCode(s.to_string()))
    }

    /// Parse a station code after trimming and uppercasing the input.
    ///
    /// Source feeds are inconsistent about case, so adapters use this.
    pub fn parse_normalized(s: &str) -> Result<Self, InvalidStationCode> {
        Self::parse(&s.trim().to_ascii_uppercase())
    }

    /// Returns the station code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for StationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StationCode({})", self.0)
    }
}

impl fmt::Display for StationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for StationCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}
