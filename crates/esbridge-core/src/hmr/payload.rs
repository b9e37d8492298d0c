//! Dev-server HMR wire messages.
//!
//! Messages arrive as JSON objects tagged by `type`, the format Vite's
//! client protocol uses.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Malformed wire message.
#[derive(Debug, thiserror::Error)]
pub enum HmrPayloadError {
    #[error("invalid HMR message: {0}")]
    Decode(#[from] serde_json::Error),
}

/// A message sent by the dev server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum HmrMessage {
    Connected,
    Ping,
    Update {
        updates: Vec<UpdatePayload>,
    },
    /// Modules that are no longer imported anywhere.
    Prune {
        paths: Vec<String>,
    },
    /// Reload the entire application.
    FullReload {
        #[serde(default)]
        path: Option<String>,
        #[serde(default)]
        triggered_by: Option<String>,
    },
    Custom {
        event: String,
        #[serde(default)]
        data: Value,
    },
    Error {
        err: ErrorPayload,
    },
}

/// Kind of a single update entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UpdateKind {
    JsUpdate,
    CssUpdate,
}

/// One entry of an `update` message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePayload {
    #[serde(rename = "type")]
    pub kind: UpdateKind,
    /// The boundary module that accepted the change.
    pub path: String,
    /// The module to re-import.
    pub accepted_path: String,
    /// Milliseconds since the epoch.
    pub timestamp: u64,
}

/// Build error reported by the dev server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPayload {
    pub message: String,
    #[serde(default)]
    pub stack: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub plugin: Option<String>,
    #[serde(default, flatten)]
    pub extra: HashMap<String, Value>,
}

/// What the host has to do in response to a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum HmrEvent {
    /// Re-import these modules and run their update sequence.
    Update { paths: Vec<String> },
    /// Dispose and forget these modules.
    Prune { paths: Vec<String> },
    /// Restart the application.
    FullReload,
}

impl HmrMessage {
    /// Decode one JSON message.
    pub fn from_json(text: &str) -> Result<Self, HmrPayloadError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Map the message to a host action. Informational messages map to `None`.
    #[must_use]
    pub fn into_event(self) -> Option<HmrEvent> {
        match self {
            Self::Connected => {
                tracing::info!("HMR connection established");
                None
            }
            Self::Ping | Self::Custom { .. } => None,
            Self::Update { updates } => {
                let mut paths: Vec<String> = Vec::with_capacity(updates.len());
                for update in updates {
                    if !paths.contains(&update.accepted_path) {
                        paths.push(update.accepted_path);
                    }
                }
                (!paths.is_empty()).then_some(HmrEvent::Update { paths })
            }
            Self::Prune { paths } => (!paths.is_empty()).then_some(HmrEvent::Prune { paths }),
            Self::FullReload { path, triggered_by } => {
                tracing::info!(
                    path = path.as_deref().unwrap_or_default(),
                    triggered_by = triggered_by.as_deref().unwrap_or_default(),
                    "full reload requested"
                );
                Some(HmrEvent::FullReload)
            }
            Self::Error { err } => {
                tracing::error!(
                    plugin = err.plugin.as_deref().unwrap_or_default(),
                    id = err.id.as_deref().unwrap_or_default(),
                    "dev server error: {}",
                    err.message
                );
                None
            }
        }
    }
}
