//! Tool discovery for server sync.
//!
//! Production discovery talks to the server itself (listing MCP tools,
//! reading an OpenAPI document) and lives outside this crate; the
//! registry only consumes the reported descriptors. [`StaticDiscovery`]
//! serves tests and offline bootstrapping.

use serde::{Deserialize, Serialize};

use crate::error::RegistryResult;
use crate::types::Server;

/// A tool descriptor reported by a discovery source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveredTool {
    /// Tool name, unique on its server.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Opaque input-shape descriptor (serialized JSON), if known.
    pub input_schema: Option<String>,
}

impl DiscoveredTool {
    /// A descriptor carrying only a name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            input_schema: None,
        }
    }

    /// Attach a description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Attach an input-shape descriptor.
    #[must_use]
    pub fn with_input_schema(mut self, schema: impl Into<String>) -> Self {
        self.input_schema = Some(schema.into());
        self
    }
}

/// Source of tool descriptors for a server.
pub trait ToolDiscovery: Send + Sync {
    /// List the tools the server currently exposes.
    ///
    /// # Errors
    ///
    /// Returns [`crate::RegistryError::Discovery`] when the server
    /// cannot be interrogated.
    fn discover(&self, server: &Server) -> RegistryResult<Vec<DiscoveredTool>>;
}

/// Discovery source that returns a fixed descriptor list.
#[derive(Debug, Clone, Default)]
pub struct StaticDiscovery {
    tools: Vec<DiscoveredTool>,
}

impl StaticDiscovery {
    /// Build from a fixed list.
    #[must_use]
    pub fn new(tools: Vec<DiscoveredTool>) -> Self {
        Self { tools }
    }
}

impl ToolDiscovery for StaticDiscovery {
    fn discover(&self, _server: &Server) -> RegistryResult<Vec<DiscoveredTool>> {
        Ok(self.tools.clone())
    }
}

/// Counters reported by a sync run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    /// Tools inserted by this run.
    pub added: usize,
    /// Descriptors skipped because the name already exists.
    pub skipped: usize,
}
