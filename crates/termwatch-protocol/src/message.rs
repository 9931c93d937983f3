//! JSON payloads of the query API.

use serde::{Deserialize, Serialize};
use termwatch_core::{AgentState, WindowId, WindowRecord, WindowSnapshot};

use crate::version::ApiVersion;

/// Body of `GET /api/health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl HealthResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            version: ApiVersion::CURRENT.to_string(),
        }
    }
}

/// One window as exposed on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowView {
    pub id: WindowId,
    pub pid: u32,
    pub ax_index: u32,
    pub title: String,
    pub claude_state: AgentState,
    pub display_name: String,
    pub workstream_name: Option<String>,
    pub has_claude_process: bool,
}

impl From<&WindowRecord> for WindowView {
    fn from(record: &WindowRecord) -> Self {
        Self {
            id: record.id,
            pid: record.owner_pid,
            ax_index: record.index,
            title: record.title.clone(),
            claude_state: record.agent_state,
            display_name: record.display_name().to_string(),
            workstream_name: record.project.clone(),
            has_claude_process: record.has_agent_process,
        }
    }
}

/// Body of `GET /api/windows`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowsResponse {
    pub windows: Vec<WindowView>,
}

impl From<&WindowSnapshot> for WindowsResponse {
    fn from(snapshot: &WindowSnapshot) -> Self {
        Self {
            windows: snapshot.windows.iter().map(WindowView::from).collect(),
        }
    }
}

/// Body of a focus response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FocusResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FocusResponse {
    pub fn success() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}

/// Body of every plain error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }

    pub fn not_found() -> Self {
        Self::new("Not found")
    }
}
