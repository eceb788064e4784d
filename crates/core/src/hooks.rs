//! Hook constants, HTTP method enum, validation, and header merging.
//!
//! A hook binds an event type to an outbound HTTP call. The database row
//! lives in the `db` crate; the rules that every row must satisfy live here
//! so the registry and the API layer share one definition.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Maximum length of a hook name.
pub const MAX_HOOK_NAME_LENGTH: usize = 200;

/// Maximum length of an endpoint URL.
pub const MAX_ENDPOINT_URL_LENGTH: usize = 2048;

/// Retry attempts granted to a hook when the creator does not specify any.
pub const DEFAULT_RETRY_COUNT: i32 = 3;

/// Upper bound on configurable retry attempts.
pub const MAX_RETRY_COUNT: i32 = 10;

/// Per-attempt timeout applied when the creator does not specify one.
pub const DEFAULT_TIMEOUT_SECS: i32 = 30;

/// Upper bound on the per-attempt timeout.
pub const MAX_TIMEOUT_SECS: i32 = 300;

/// Header name always present on outbound hook requests.
pub const CONTENT_TYPE_HEADER: &str = "Content-Type";

/// Default value for [`CONTENT_TYPE_HEADER`].
pub const JSON_CONTENT_TYPE: &str = "application/json";

// ---------------------------------------------------------------------------
// HttpMethod
// ---------------------------------------------------------------------------

/// HTTP verb used for a hook's outbound request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    #[default]
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    /// Return the wire-format (upper-case) string for this variant.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }

    /// Parse a method name, ignoring case.
    pub fn from_str(s: &str) -> Result<Self, CoreError> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "PATCH" => Ok(Self::Patch),
            "DELETE" => Ok(Self::Delete),
            _ => Err(CoreError::Validation(format!(
                "Invalid http_method: '{s}'. Must be one of: GET, POST, PUT, PATCH, DELETE"
            ))),
        }
    }

    /// Whether the rendered payload is sent as the request body.
    pub fn sends_body(&self) -> bool {
        !matches!(self, Self::Get)
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate a hook name: must be non-empty and within length limit.
pub fn validate_hook_name(name: &str) -> Result<(), CoreError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(CoreError::Validation(
            "Hook name must not be empty".to_string(),
        ));
    }
    if trimmed.len() > MAX_HOOK_NAME_LENGTH {
        return Err(CoreError::Validation(format!(
            "Hook name exceeds maximum length of {MAX_HOOK_NAME_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Validate an endpoint URL: absolute `http` or `https` with a host part.
pub fn validate_endpoint_url(url: &str) -> Result<(), CoreError> {
    if url.len() > MAX_ENDPOINT_URL_LENGTH {
        return Err(CoreError::Validation(format!(
            "endpoint_url exceeds maximum length of {MAX_ENDPOINT_URL_LENGTH} characters"
        )));
    }
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .ok_or_else(|| {
            CoreError::Validation(format!(
                "endpoint_url must start with http:// or https://, got '{url}'"
            ))
        })?;
    let host = rest.split(['/', '?', '#']).next().unwrap_or_default();
    if host.is_empty() || url.chars().any(char::is_whitespace) {
        return Err(CoreError::Validation(format!(
            "endpoint_url is not a valid absolute URL: '{url}'"
        )));
    }
    Ok(())
}

/// Validate the retry budget: `0..=MAX_RETRY_COUNT`.
pub fn validate_retry_count(retry_count: i32) -> Result<(), CoreError> {
    if !(0..=MAX_RETRY_COUNT).contains(&retry_count) {
        return Err(CoreError::Validation(format!(
            "retry_count must be between 0 and {MAX_RETRY_COUNT}, got {retry_count}"
        )));
    }
    Ok(())
}

/// Validate the per-attempt timeout: `1..=MAX_TIMEOUT_SECS`.
pub fn validate_timeout_seconds(timeout_seconds: i32) -> Result<(), CoreError> {
    if !(1..=MAX_TIMEOUT_SECS).contains(&timeout_seconds) {
        return Err(CoreError::Validation(format!(
            "timeout_seconds must be between 1 and {MAX_TIMEOUT_SECS}, got {timeout_seconds}"
        )));
    }
    Ok(())
}

/// Validate custom headers: a JSON object whose values are all strings.
pub fn validate_headers(headers: &serde_json::Value) -> Result<(), CoreError> {
    let obj = headers
        .as_object()
        .ok_or_else(|| CoreError::Validation("headers must be a JSON object".to_string()))?;

    for (name, value) in obj {
        if name.trim().is_empty() {
            return Err(CoreError::Validation(
                "header names must not be empty".to_string(),
            ));
        }
        if !value.is_string() {
            return Err(CoreError::Validation(format!(
                "header '{name}' must have a string value"
            )));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Header merging
// ---------------------------------------------------------------------------

/// Merge a hook's custom headers over a base header list.
///
/// A custom header replaces any base header with the same name, compared
/// case-insensitively. Non-string values are skipped; they cannot pass
/// [`validate_headers`] but older rows may predate it.
pub fn merge_headers(
    mut base: Vec<(String, String)>,
    custom: &serde_json::Value,
) -> Vec<(String, String)> {
    let Some(obj) = custom.as_object() else {
        return base;
    };

    for (name, value) in obj {
        let Some(value) = value.as_str() else {
            continue;
        };
        base.retain(|(existing, _)| !existing.eq_ignore_ascii_case(name));
        base.push((name.clone(), value.to_string()));
    }
    base
}

/// The headers every hook request starts from.
pub fn default_headers() -> Vec<(String, String)> {
    vec![(CONTENT_TYPE_HEADER.to_string(), JSON_CONTENT_TYPE.to_string())]
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // -- HttpMethod ---------------------------------------------------------

    #[test]
    fn http_method_all_variants_roundtrip() {
        let pairs = [
            ("GET", HttpMethod::Get),
            ("POST", HttpMethod::Post),
            ("PUT", HttpMethod::Put),
            ("PATCH", HttpMethod::Patch),
            ("DELETE", HttpMethod::Delete),
        ];
        for (s, variant) in &pairs {
            assert_eq!(&HttpMethod::from_str(s).unwrap(), variant);
            assert_eq!(variant.as_str(), *s);
        }
    }

    #[test]
    fn http_method_is_case_insensitive() {
        assert_eq!(HttpMethod::from_str("post").unwrap(), HttpMethod::Post);
        assert_eq!(HttpMethod::from_str("Patch").unwrap(), HttpMethod::Patch);
    }

    #[test]
    fn http_method_invalid_rejects() {
        assert!(HttpMethod::from_str("TRACE").is_err());
        assert!(HttpMethod::from_str("").is_err());
    }

    #[test]
    fn http_method_defaults_to_post() {
        assert_eq!(HttpMethod::default(), HttpMethod::Post);
    }

    #[test]
    fn only_get_omits_body() {
        assert!(!HttpMethod::Get.sends_body());
        assert!(HttpMethod::Post.sends_body());
        assert!(HttpMethod::Delete.sends_body());
    }

    // -- validate_hook_name -------------------------------------------------

    #[test]
    fn valid_hook_name() {
        assert!(validate_hook_name("Notify search indexer").is_ok());
    }

    #[test]
    fn empty_hook_name_rejects() {
        assert!(validate_hook_name("").is_err());
        assert!(validate_hook_name("   ").is_err());
    }

    #[test]
    fn too_long_hook_name_rejects() {
        let long = "a".repeat(MAX_HOOK_NAME_LENGTH + 1);
        assert!(validate_hook_name(&long).is_err());
        let exact = "a".repeat(MAX_HOOK_NAME_LENGTH);
        assert!(validate_hook_name(&exact).is_ok());
    }

    // -- validate_endpoint_url ----------------------------------------------

    #[test]
    fn valid_urls() {
        assert!(validate_endpoint_url("https://hooks.example.com/cms").is_ok());
        assert!(validate_endpoint_url("http://127.0.0.1:8080").is_ok());
        assert!(validate_endpoint_url("https://example.com?x=1").is_ok());
    }

    #[test]
    fn invalid_urls_reject() {
        assert!(validate_endpoint_url("ftp://example.com").is_err());
        assert!(validate_endpoint_url("example.com/hook").is_err());
        assert!(validate_endpoint_url("https://").is_err());
        assert!(validate_endpoint_url("https:///path").is_err());
        assert!(validate_endpoint_url("https://exa mple.com").is_err());
    }

    // -- numeric bounds -----------------------------------------------------

    #[test]
    fn retry_count_bounds() {
        assert!(validate_retry_count(0).is_ok());
        assert!(validate_retry_count(MAX_RETRY_COUNT).is_ok());
        assert!(validate_retry_count(-1).is_err());
        assert!(validate_retry_count(MAX_RETRY_COUNT + 1).is_err());
    }

    #[test]
    fn timeout_bounds() {
        assert!(validate_timeout_seconds(1).is_ok());
        assert!(validate_timeout_seconds(MAX_TIMEOUT_SECS).is_ok());
        assert!(validate_timeout_seconds(0).is_err());
        assert!(validate_timeout_seconds(-3).is_err());
        assert!(validate_timeout_seconds(MAX_TIMEOUT_SECS + 1).is_err());
    }

    // -- validate_headers ---------------------------------------------------

    #[test]
    fn string_headers_valid() {
        let h = json!({ "Authorization": "Bearer abc", "X-Source": "cms" });
        assert!(validate_headers(&h).is_ok());
        assert!(validate_headers(&json!({})).is_ok());
    }

    #[test]
    fn non_object_headers_reject() {
        assert!(validate_headers(&json!(["Authorization"])).is_err());
        assert!(validate_headers(&json!(null)).is_err());
    }

    #[test]
    fn non_string_header_value_rejects() {
        assert!(validate_headers(&json!({ "X-Retries": 3 })).is_err());
    }

    #[test]
    fn blank_header_name_rejects() {
        assert!(validate_headers(&json!({ " ": "x" })).is_err());
    }

    // -- merge_headers ------------------------------------------------------

    #[test]
    fn defaults_include_json_content_type() {
        let merged = merge_headers(default_headers(), &json!({}));
        assert_eq!(
            merged,
            vec![("Content-Type".to_string(), "application/json".to_string())]
        );
    }

    #[test]
    fn custom_headers_are_appended() {
        let merged = merge_headers(default_headers(), &json!({ "X-Token": "t" }));
        assert_eq!(merged.len(), 2);
        assert!(merged.contains(&("X-Token".to_string(), "t".to_string())));
    }

    #[test]
    fn custom_header_overrides_case_insensitively() {
        let merged = merge_headers(
            default_headers(),
            &json!({ "content-type": "application/vnd.cms+json" }),
        );
        assert_eq!(
            merged,
            vec![(
                "content-type".to_string(),
                "application/vnd.cms+json".to_string()
            )]
        );
    }

    #[test]
    fn non_string_custom_values_are_skipped() {
        let merged = merge_headers(default_headers(), &json!({ "X-Count": 1 }));
        assert_eq!(merged.len(), 1);
    }
}
