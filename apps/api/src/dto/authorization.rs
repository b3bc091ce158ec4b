use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use ts_rs::TS;

/// Incoming payload for a permission check of the calling subject.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/authorization-check-request.ts"
)]
pub struct AuthorizationCheckRequest {
    pub resource: String,
    pub action: String,
    /// Target entity attributes evaluated by conditional permissions.
    #[serde(default)]
    #[ts(type = "Record<string, unknown> | null")]
    pub entity: Option<Map<String, Value>>,
}

/// Permission check outcome.
#[derive(Debug, Serialize, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/authorization-check-response.ts"
)]
pub struct AuthorizationCheckResponse {
    pub allowed: bool,
}
