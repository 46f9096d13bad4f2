//! API Models
//!
//! This module defines the response bodies served by the REST API and
//! documented with `utoipa`.

use chrono::{DateTime, Utc};
use mission_core::store::SessionRecord;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A stored relay session as exposed over HTTP.
#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
pub struct SessionView {
    #[schema(example = "mission-relay")]
    pub app_name: String,
    #[schema(example = "pilot-7")]
    pub user_id: String,
    #[schema(example = "mission-42")]
    pub session_id: String,
    pub created_at: DateTime<Utc>,
}

impl From<SessionRecord> for SessionView {
    fn from(record: SessionRecord) -> Self {
        Self {
            app_name: record.app_name,
            user_id: record.user_id,
            session_id: record.session_id,
            created_at: record.created_at,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
pub struct HealthResponse {
    #[schema(example = "ok")]
    pub status: String,
    #[schema(example = "mission-relay")]
    pub app_name: String,
}

#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct ErrorResponse {
    pub message: String,
}
