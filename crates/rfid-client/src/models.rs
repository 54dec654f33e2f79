//! Request and response types exchanged with the RFID backend.
//!
//! Field names on the wire follow the backend (`nome_completo`, `zona`,
//! `tipo_animal`, ...); the Rust side uses English names.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Display profile persisted next to the token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub username: String,

    #[serde(rename = "nome_completo", default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl UserProfile {
    /// Name to greet the user with.
    pub fn display_name(&self) -> &str {
        self.full_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(&self.username)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
    pub username: String,
    #[serde(rename = "nome_completo", default)]
    pub full_name: Option<String>,
}

impl LoginResponse {
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            username: self.username.clone(),
            full_name: self.full_name.clone(),
            email: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    #[serde(rename = "nome_completo", skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub message: String,
    pub username: String,
}

/// A single RFID detection event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub id: i64,

    #[serde(rename = "zona")]
    pub zone: i64,

    #[serde(rename = "tipo_animal")]
    pub animal_type: String,

    /// Tag UID.
    pub uid: String,

    /// Repeat count reported by the reader.
    #[serde(default)]
    pub count: i64,

    /// Source device.
    #[serde(rename = "arduino", default)]
    pub device: Option<String>,

    #[serde(with = "timestamp")]
    pub timestamp: DateTime<Utc>,
}

/// Server-computed dashboard aggregate. Replaced wholesale on every fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    #[serde(rename = "total_leituras")]
    pub total: u64,

    #[serde(rename = "leituras_hoje")]
    pub today: u64,

    /// Keyed `zona_<n>`.
    #[serde(rename = "por_zona", default)]
    pub by_zone: BTreeMap<String, u64>,

    /// Keyed by lower-cased animal type.
    #[serde(rename = "por_tipo", default)]
    pub by_animal_type: BTreeMap<String, u64>,

    #[serde(rename = "ultimas_leituras", default)]
    pub recent: Vec<Reading>,
}

impl StatsSnapshot {
    /// Readings recorded for an animal type, zero if the backend omitted it.
    pub fn count_for(&self, animal_type: &str) -> u64 {
        self.by_animal_type
            .get(&animal_type.to_lowercase())
            .copied()
            .unwrap_or(0)
    }
}

/// Optional filters for the readings listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadingFilter {
    pub zone: Option<i64>,
    pub animal_type: Option<String>,
}

impl ReadingFilter {
    pub fn zone(mut self, zone: i64) -> Self {
        self.zone = Some(zone);
        self
    }

    pub fn animal_type(mut self, animal_type: impl Into<String>) -> Self {
        self.animal_type = Some(animal_type.into());
        self
    }

    /// Query pairs for the request; absent filters are left out.
    pub fn query(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(zone) = self.zone {
            pairs.push(("zona", zone.to_string()));
        }
        if let Some(animal_type) = self.animal_type.as_deref().filter(|t| !t.is_empty()) {
            pairs.push(("tipo_animal", animal_type.to_string()));
        }
        pairs
    }
}

/// Backend health report from `GET /api/status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerStatus {
    pub status: String,
    pub timestamp: String,
    pub version: String,
}

/// Parse a backend timestamp: RFC 3339, or the zone-less ISO form which is UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    timestamp::parse(raw)
}

/// Accepts RFC 3339 as well as the zone-less ISO form the backend emits,
/// which is UTC.
mod timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp '{}'", raw)))
    }

    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
            return Some(parsed.with_timezone(&Utc));
        }
        ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
            .map(|naive| naive.and_utc())
    }
}
