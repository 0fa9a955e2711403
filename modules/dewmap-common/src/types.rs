use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

// --- Geo Types ---

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Bucket key for markers that share near-identical coordinates.
    /// Coordinates are rounded to 5 decimal places (~1.1 m).
    pub fn bucket_key(&self) -> CoordKey {
        CoordKey {
            lat_e5: (self.lat * 1e5).round() as i64,
            lng_e5: (self.lng * 1e5).round() as i64,
        }
    }

    /// Euclidean distance in degree space. Only meaningful for tiny offsets.
    pub fn degree_distance(&self, other: &GeoPoint) -> f64 {
        ((self.lat - other.lat).powi(2) + (self.lng - other.lng).powi(2)).sqrt()
    }
}

/// Coordinates scaled by 1e5 and rounded, so equality is exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CoordKey {
    pub lat_e5: i64,
    pub lng_e5: i64,
}

// --- Identity ---

/// Server-assigned find identity. The API sends ids as strings, but older
/// rows and hand-written fixtures use bare integers, so both are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct FindId(String);

impl FindId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for FindId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FindId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for FindId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<u64> for FindId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl<'de> Deserialize<'de> for FindId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Signed(i64),
            Unsigned(u64),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(s) => FindId(s),
            RawId::Signed(n) => FindId(n.to_string()),
            RawId::Unsigned(n) => FindId(n.to_string()),
        })
    }
}

// --- Finds ---

/// A community-reported sighting of a flavor at a place.
///
/// Loaded sets are immutable: a refresh replaces the whole set rather than
/// editing entries in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Find {
    pub id: FindId,
    pub flavor: String,
    pub size: String,
    pub location_name: String,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(deserialize_with = "deserialize_instant")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub time_zone: Option<String>,
    #[serde(default)]
    pub submitted_by: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl Find {
    pub fn point(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }

    /// IANA zone used for display, UTC when the submitter's zone is unknown.
    pub fn display_zone(&self) -> &str {
        self.time_zone
            .as_deref()
            .filter(|tz| !tz.trim().is_empty())
            .unwrap_or("UTC")
    }
}

impl AsRef<Find> for Find {
    fn as_ref(&self) -> &Find {
        self
    }
}

/// Ordered flavor names supplied by the server. Consumed, never edited.
pub type FlavorList = Vec<String>;

/// Accepts RFC 3339 instants and naive timestamps (treated as UTC), which is
/// what older rows written without an offset look like.
fn deserialize_instant<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
    let raw = String::deserialize(deserializer)?;
    parse_instant(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}")))
}

pub fn parse_instant(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|ndt| ndt.and_utc())
}

// --- Submissions ---

/// Binary image attached to a submission. `content_type` is the declared
/// MIME type; nothing sniffs the bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageAttachment {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// A find as typed into the submission form, before validation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewFind {
    pub flavor: String,
    pub size: String,
    pub location_name: String,
    pub address: String,
    pub image_url: Option<String>,
    pub image: Option<ImageAttachment>,
}

// --- Admin ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminProfile {
    pub username: String,
}
