//! Request and response bodies for the command endpoint.

use serde::{Deserialize, Serialize};

use super::ClanData;

/// Request body for running a clan command.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandRequest {
    /// Name of the acting user
    pub actor: String,
    /// Command name without the leading slash, e.g. `givepoints`
    pub command: String,
    /// Comma-delimited arguments
    #[serde(default)]
    pub target: String,
}

/// Result of a successful command.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandReply {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clan: Option<ClanData>,
}

/// Query string for the modlog listing.
#[derive(Debug, Clone, Deserialize)]
pub struct ModlogQuery {
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_limit() -> u32 {
    50
}
