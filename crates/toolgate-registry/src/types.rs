//! Registry entities.

use serde::{Deserialize, Serialize};
use std::fmt;
use toolgate_core::{AgentId, RiskTier, ServerId, Timestamp, ToolId};

/// A calling principal whose tool access the gateway governs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentProfile {
    /// Unique identifier.
    pub id: AgentId,
    /// Display name.
    pub name: String,
    /// Optional free-form description.
    pub description: Option<String>,
    /// Which AI host created this profile (free-form tag).
    pub host_type: String,
    /// Optional credential the agent presents to the gateway.
    pub api_key: Option<String>,
    /// Creation time.
    pub created_at: Timestamp,
}

/// Parameters for creating an agent profile.
#[derive(Debug, Clone)]
pub struct NewAgent {
    /// Display name.
    pub name: String,
    /// Optional free-form description.
    pub description: Option<String>,
    /// Which AI host created this profile.
    pub host_type: String,
    /// Optional credential the agent presents to the gateway.
    pub api_key: Option<String>,
}

/// What kind of surface a server exposes its tools over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServerKind {
    /// A Model Context Protocol server (spawned or remote).
    Mcp,
    /// A plain HTTP API.
    Http,
}

impl ServerKind {
    /// Stable storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mcp => "mcp",
            Self::Http => "http",
        }
    }

    /// Parse a stored kind value.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "mcp" => Some(Self::Mcp),
            "http" => Some(Self::Http),
            _ => None,
        }
    }
}

impl fmt::Display for ServerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A downstream system that exposes tools.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Server {
    /// Unique identifier.
    pub id: ServerId,
    /// Display name.
    pub name: String,
    /// Transport kind.
    pub kind: ServerKind,
    /// Launch command (MCP servers spawned as subprocesses).
    pub command: Option<String>,
    /// Base URL (HTTP servers).
    pub base_url: Option<String>,
    /// Optional free-form description.
    pub description: Option<String>,
    /// Creation time.
    pub created_at: Timestamp,
}

/// Parameters for creating a server.
#[derive(Debug, Clone)]
pub struct NewServer {
    /// Display name.
    pub name: String,
    /// Transport kind.
    pub kind: ServerKind,
    /// Launch command, if any.
    pub command: Option<String>,
    /// Base URL, if any.
    pub base_url: Option<String>,
    /// Optional description.
    pub description: Option<String>,
}

/// A callable capability exposed by a server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tool {
    /// Unique identifier.
    pub id: ToolId,
    /// Owning server.
    pub server_id: ServerId,
    /// Tool name, unique within its server.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Opaque input-shape descriptor (serialized JSON schema), if known.
    pub input_schema: Option<String>,
    /// Administrator-assigned risk tier.
    pub risk_tier: RiskTier,
    /// Creation time.
    pub created_at: Timestamp,
}

/// Parameters for creating a tool by hand.
#[derive(Debug, Clone)]
pub struct NewTool {
    /// Owning server.
    pub server_id: ServerId,
    /// Tool name, unique within the server.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Opaque input-shape descriptor, if known.
    pub input_schema: Option<String>,
    /// Risk tier; defaults to [`RiskTier::NeedsApproval`] when `None`.
    pub risk_tier: Option<RiskTier>,
}

/// A per-agent, per-tool grant. Absent row behaves as `allowed: false`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolPermission {
    /// The agent this grant applies to.
    pub agent_id: AgentId,
    /// The tool this grant applies to.
    pub tool_id: ToolId,
    /// Whether the agent may request this tool.
    pub allowed: bool,
}
