//! did:web document for the service identity.

use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::state::AppState;

/// Serve the DID document advertising this host as a feed generator.
///
/// Only meaningful when the service identity is a `did:web` anchored at
/// this hostname; other identity schemes resolve elsewhere.
pub async fn did_document(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let config = &state.config;
    if !config.service_did.starts_with("did:web:") {
        return Err(ApiError::NotFound(
            "service identity is not a did:web".to_string(),
        ));
    }

    Ok(Json(json!({
        "@context": ["https://www.w3.org/ns/did/v1"],
        "id": config.service_did,
        "service": [{
            "id": "#bsky_fg",
            "type": "BskyFeedGenerator",
            "serviceEndpoint": format!("https://{}", config.hostname),
        }],
    })))
}
