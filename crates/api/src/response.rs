//! Shared response envelope.
//!
//! Every API response body is `{ "data": ... }`; build it with
//! [`DataResponse`] rather than an ad-hoc `json!`.

use serde::Serialize;

/// Standard `{ "data": T }` response envelope.
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}
