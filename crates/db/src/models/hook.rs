//! Hook models and DTOs.
//!
//! Defines the database row struct for `hooks` and the create / update
//! types used by the registry and API layers.

use std::time::Duration;

use cms_core::error::CoreError;
use cms_core::hooks::HttpMethod;
use cms_core::types::{DbId, Timestamp};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// A hook row from the `hooks` table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Hook {
    pub id: DbId,
    pub name: String,
    pub event_type: String,
    pub endpoint_url: Option<String>,
    pub http_method: String,
    pub headers: serde_json::Value,
    pub payload_template: serde_json::Value,
    pub is_active: bool,
    pub retry_count: i32,
    pub timeout_seconds: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Hook {
    /// Parse the stored HTTP method.
    pub fn method(&self) -> Result<HttpMethod, CoreError> {
        HttpMethod::from_str(&self.http_method)
    }

    /// Per-attempt timeout as a [`Duration`]; never zero.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds.max(1) as u64)
    }
}

// ---------------------------------------------------------------------------
// Create DTO
// ---------------------------------------------------------------------------

/// Input for creating a new hook. Omitted fields take the column defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateHook {
    pub name: String,
    pub event_type: String,
    pub endpoint_url: Option<String>,
    pub http_method: Option<String>,
    pub headers: Option<serde_json::Value>,
    pub payload_template: Option<serde_json::Value>,
    pub is_active: Option<bool>,
    pub retry_count: Option<i32>,
    pub timeout_seconds: Option<i32>,
}

// ---------------------------------------------------------------------------
// Update DTO
// ---------------------------------------------------------------------------

/// Input for updating an existing hook. All fields are optional.
///
/// `endpoint_url` distinguishes an absent field (`None`, keep the current
/// value) from an explicit `null` (`Some(None)`, clear it).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateHook {
    pub name: Option<String>,
    pub event_type: Option<String>,
    #[serde(default, deserialize_with = "explicit_null")]
    pub endpoint_url: Option<Option<String>>,
    pub http_method: Option<String>,
    pub headers: Option<serde_json::Value>,
    pub payload_template: Option<serde_json::Value>,
    pub is_active: Option<bool>,
    pub retry_count: Option<i32>,
    pub timeout_seconds: Option<i32>,
}

impl UpdateHook {
    /// The new endpoint URL, if one was supplied (not cleared or absent).
    pub fn new_endpoint_url(&self) -> Option<&str> {
        self.endpoint_url.as_ref().and_then(|url| url.as_deref())
    }
}

/// Maps a present field to `Some(..)` so that `null` survives as `Some(None)`.
fn explicit_null<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}
