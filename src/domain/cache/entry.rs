//! Cache entry and its persisted record form

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::DomainError;

/// Upper bound applied to TTLs on every backend (ten years)
pub const MAX_TTL_SECS: u64 = 10 * 365 * 24 * 60 * 60;

/// Clamps a TTL to `MAX_TTL_SECS`
pub fn clamp_ttl(ttl_secs: u64) -> u64 {
    ttl_secs.min(MAX_TTL_SECS)
}

/// A logical cache entry
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub key: String,
    pub payload: Value,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Creates an entry that expires `ttl_secs` seconds from `now`
    pub fn new(key: impl Into<String>, payload: Value, ttl_secs: u64, now: DateTime<Utc>) -> Self {
        // Clamped value always fits in i64
        let secs = clamp_ttl(ttl_secs) as i64;

        Self {
            key: key.into(),
            payload,
            expires_at: now + Duration::seconds(secs),
            created_at: now,
        }
    }

    /// Expiry is binary: dead once `now` reaches `expires_at`
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn to_record(&self) -> Result<CacheRecord, DomainError> {
        Ok(CacheRecord {
            key: self.key.clone(),
            data: serde_json::to_string(&self.payload)?,
            expires_at: format_timestamp(self.expires_at),
            created_at: format_timestamp(self.created_at),
        })
    }
}

/// Document-store representation of a cache entry
///
/// Timestamps are fixed-width RFC 3339 UTC strings, so lexicographic order
/// equals chronological order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheRecord {
    pub key: String,
    pub data: String,
    pub expires_at: String,
    pub created_at: String,
}

impl CacheRecord {
    pub fn expires_at(&self) -> Result<DateTime<Utc>, DomainError> {
        parse_timestamp(&self.expires_at)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> Result<bool, DomainError> {
        Ok(now >= self.expires_at()?)
    }

    pub fn into_entry(self) -> Result<CacheEntry, DomainError> {
        Ok(CacheEntry {
            payload: serde_json::from_str(&self.data)?,
            expires_at: parse_timestamp(&self.expires_at)?,
            created_at: parse_timestamp(&self.created_at)?,
            key: self.key,
        })
    }
}

pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, DomainError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| DomainError::serialization(format!("Invalid timestamp '{}': {}", raw, e)))
}
