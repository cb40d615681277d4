// Allow dead code: API response structs have fields for completeness
#![allow(dead_code)]

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One page of the contact listing endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactsPage {
    #[serde(default)]
    pub contacts: Vec<Contact>,
    /// Present in one protocol variant only.
    #[serde(default)]
    pub meta: Option<PageMeta>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageMeta {
    #[serde(default)]
    pub total: Option<i64>,
    #[serde(rename = "startAfterId")]
    pub start_after_id: Option<String>,
    #[serde(rename = "nextPageUrl")]
    pub next_page_url: Option<String>,
}

/// A CRM contact as the listing endpoint returns it.
///
/// Custom data arrives in two shapes depending on API vintage: a
/// `customFields` (v1: `customField`) list of id/key/name/value entries, or
/// plain extra properties on the contact object itself. Both are kept; the
/// transformer decides which one a given field comes from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contact {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "locationId")]
    pub location_id: Option<String>,
    #[serde(rename = "firstName")]
    pub first_name: Option<String>,
    #[serde(rename = "lastName")]
    pub last_name: Option<String>,
    pub email: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(rename = "dateAdded")]
    pub date_added: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: Option<String>,
    #[serde(rename = "customFields", alias = "customField", default)]
    pub custom_fields: Vec<CustomField>,
    /// Every property not captured above, including direct custom properties.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomField {
    pub id: Option<String>,
    pub key: Option<String>,
    pub name: Option<String>,
    #[serde(default)]
    pub value: serde_json::Value,
}

impl Contact {
    /// First and last names joined, trimmed and single-spaced.
    pub fn full_name(&self) -> String {
        let first = self.first_name.as_deref().unwrap_or("");
        let last = self.last_name.as_deref().unwrap_or("");
        format!("{} {}", first, last)
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// When the contact entered the CRM: `dateAdded` when present (non-empty),
    /// otherwise `createdAt`. None when neither parses.
    pub fn signup_time(&self) -> Option<DateTime<Utc>> {
        let raw = self
            .date_added
            .as_deref()
            .filter(|s| !s.is_empty())
            .or(self.created_at.as_deref())?;
        parse_instant(raw)
    }

    /// Case-insensitive exact tag membership.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }
}

/// Parse an RFC 3339 timestamp, falling back to a bare `YYYY-MM-DD` prefix
/// for date-only payloads.
fn parse_instant(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    let prefix: String = raw.chars().take(10).collect();
    let date = NaiveDate::parse_from_str(&prefix, "%Y-%m-%d").ok()?;
    Some(date.and_hms_opt(0, 0, 0)?.and_utc())
}
