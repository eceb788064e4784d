//! Well-known domain event type names.
//!
//! Hooks subscribe to one of these tags. The taxonomy is open-ended: any
//! well-formed dot-separated tag is accepted, the constants below are the
//! ones the surrounding CMS emits today.

use crate::error::CoreError;

/// A content entry was created.
pub const CONTENT_CREATED: &str = "content.created";

/// A content entry was edited.
pub const CONTENT_UPDATED: &str = "content.updated";

/// A content entry was removed.
pub const CONTENT_DELETED: &str = "content.deleted";

/// A content entry went live.
pub const CONTENT_PUBLISHED: &str = "content.published";

/// A live content entry was taken down.
pub const CONTENT_UNPUBLISHED: &str = "content.unpublished";

/// A media asset finished uploading.
pub const MEDIA_UPLOADED: &str = "media.uploaded";

/// A media asset was removed.
pub const MEDIA_DELETED: &str = "media.deleted";

/// A role was granted to a user.
pub const USER_ROLE_ASSIGNED: &str = "user.role_assigned";

/// A role was revoked from a user.
pub const USER_ROLE_REMOVED: &str = "user.role_removed";

/// Every event type emitted by the platform, in display order.
pub const KNOWN_EVENT_TYPES: &[&str] = &[
    CONTENT_CREATED,
    CONTENT_UPDATED,
    CONTENT_DELETED,
    CONTENT_PUBLISHED,
    CONTENT_UNPUBLISHED,
    MEDIA_UPLOADED,
    MEDIA_DELETED,
    USER_ROLE_ASSIGNED,
    USER_ROLE_REMOVED,
];

/// Maximum length of an event type tag.
pub const MAX_EVENT_TYPE_LENGTH: usize = 100;

/// Whether `event_type` is one of the platform's built-in tags.
pub fn is_known_event_type(event_type: &str) -> bool {
    KNOWN_EVENT_TYPES.contains(&event_type)
}

/// Validate an event type tag: non-empty, bounded, and free of whitespace.
pub fn validate_event_type(event_type: &str) -> Result<(), CoreError> {
    if event_type.is_empty() {
        return Err(CoreError::Validation(
            "event_type must not be empty".to_string(),
        ));
    }
    if event_type.len() > MAX_EVENT_TYPE_LENGTH {
        return Err(CoreError::Validation(format!(
            "event_type exceeds maximum length of {MAX_EVENT_TYPE_LENGTH} characters"
        )));
    }
    if event_type.chars().any(char::is_whitespace) {
        return Err(CoreError::Validation(format!(
            "event_type must not contain whitespace: '{event_type}'"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
