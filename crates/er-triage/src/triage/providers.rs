use std::fmt;

use serde::{Deserialize, Serialize};

use super::domain::{DirectoryEntry, LiveFeedEntry};
use super::geo::{Coordinates, RouteEstimate};

/// Administrative area used to scope directory and feed lookups.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Region {
    pub primary: String,
    #[serde(default)]
    pub secondary: Option<String>,
}

impl Region {
    pub fn new(primary: impl Into<String>, secondary: Option<String>) -> Self {
        Self {
            primary: primary.into(),
            secondary: secondary.filter(|value| !value.trim().is_empty()),
        }
    }

    /// True when `other` sits inside this region. A region without a
    /// secondary level covers every secondary area of its primary.
    pub fn contains(&self, other: &Region) -> bool {
        if !self.primary.eq_ignore_ascii_case(other.primary.trim()) {
            return false;
        }
        match (&self.secondary, &other.secondary) {
            (None, _) => true,
            (Some(mine), Some(theirs)) => mine.eq_ignore_ascii_case(theirs.trim()),
            (Some(_), None) => false,
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.secondary {
            Some(secondary) => write!(f, "{} {}", self.primary, secondary),
            None => f.write_str(&self.primary),
        }
    }
}

/// Best-effort region from a free-form address: the first token is the
/// primary area and the second, when present, the secondary area.
pub fn guess_region_from_address(address: &str) -> Option<Region> {
    let mut parts = address.split_whitespace();
    let primary = parts.next()?;
    Some(Region::new(primary, parts.next().map(str::to_string)))
}

/// Answer from a reverse geocoder. Either half may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReverseGeocode {
    pub region: Option<Region>,
    pub address: Option<String>,
}

/// Failure reported by an external collaborator.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("{provider} unavailable: {reason}")]
    Unavailable {
        provider: &'static str,
        reason: String,
    },
    #[error("{provider} returned an invalid response: {reason}")]
    InvalidResponse {
        provider: &'static str,
        reason: String,
    },
}

/// Static hospital metadata (name, address, phone, coordinates).
pub trait HospitalDirectoryProvider: Send + Sync {
    fn lookup(&self, region: &Region) -> Result<Vec<DirectoryEntry>, ProviderError>;
}

/// Live bed counts and equipment flags.
pub trait LiveBedFeedProvider: Send + Sync {
    fn lookup(&self, region: &Region) -> Result<Vec<LiveFeedEntry>, ProviderError>;
}

pub trait GeocodingService: Send + Sync {
    fn reverse(&self, coordinates: Coordinates) -> Result<ReverseGeocode, ProviderError>;
}

pub trait RoutingService: Send + Sync {
    fn route(
        &self,
        origin: Coordinates,
        destination: Coordinates,
    ) -> Result<RouteEstimate, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guesses_region_from_leading_tokens() {
        let region = guess_region_from_address("  Gwangju Buk-gu Yongbong-ro 77 ").expect("region");
        assert_eq!(region.primary, "Gwangju");
        assert_eq!(region.secondary.as_deref(), Some("Buk-gu"));

        let coarse = guess_region_from_address("Gwangju").expect("primary only");
        assert_eq!(coarse.secondary, None);
        assert!(guess_region_from_address("   ").is_none());
    }

    #[test]
    fn primary_only_region_contains_its_districts() {
        let city = Region::new("Gwangju", None);
        let district = Region::new("Gwangju", Some("Buk-gu".to_string()));

        assert!(city.contains(&district));
        assert!(district.contains(&district.clone()));
        assert!(!district.contains(&city));
        assert!(!city.contains(&Region::new("Busan", None)));
        assert_eq!(district.to_string(), "Gwangju Buk-gu");
    }
}
