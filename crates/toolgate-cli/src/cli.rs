//! Command-line interface definition.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Toolgate - policy gateway for AI agent tool calls.
#[derive(Debug, Parser)]
#[command(name = "toolgate", version, about)]
pub struct Cli {
    /// Path to a TOML config file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Top-level commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage agent profiles.
    #[command(subcommand)]
    Agent(AgentCommand),

    /// Manage servers.
    #[command(subcommand)]
    Server(ServerCommand),

    /// Manage tools.
    #[command(subcommand)]
    Tool(ToolCommand),

    /// Grant a tool to an agent.
    Grant {
        /// Agent id.
        agent: String,
        /// Tool id.
        tool: String,
    },

    /// Revoke a tool from an agent.
    Revoke {
        /// Agent id.
        agent: String,
        /// Tool id.
        tool: String,
    },

    /// Grant every tool to an agent.
    GrantAll {
        /// Agent id.
        agent: String,
    },

    /// Revoke every permission an agent has.
    RevokeAll {
        /// Agent id.
        agent: String,
    },

    /// Evaluate (and, when allowed, execute) a tool call.
    Eval {
        /// Agent id.
        agent: String,
        /// Tool id.
        tool: String,
        /// JSON argument payload.
        #[arg(long, default_value = "{}")]
        args: String,
    },

    /// Manage pending approvals.
    #[command(subcommand)]
    Approvals(ApprovalsCommand),

    /// Show the audit log.
    Log,

    /// Show headline counts.
    Dashboard,
}

/// Agent subcommands.
#[derive(Debug, Subcommand)]
pub enum AgentCommand {
    /// Create an agent profile.
    Add(AddAgentArgs),
    /// List agent profiles.
    List,
    /// Delete an agent profile (cascades permissions and queue).
    Rm {
        /// Agent id.
        agent: String,
    },
}

/// Arguments for `agent add`.
#[derive(Debug, Args)]
pub struct AddAgentArgs {
    /// Display name.
    #[arg(long)]
    pub name: String,
    /// Which AI host this profile belongs to.
    #[arg(long)]
    pub host_type: String,
    /// Optional description.
    #[arg(long)]
    pub description: Option<String>,
    /// Optional credential the agent presents to the gateway.
    #[arg(long)]
    pub api_key: Option<String>,
}

/// Server subcommands.
#[derive(Debug, Subcommand)]
pub enum ServerCommand {
    /// Register a server.
    Add(AddServerArgs),
    /// List servers.
    List,
    /// Discover and register the server's tools.
    Sync {
        /// Server id.
        server: String,
    },
    /// Delete a server with its tools.
    Rm {
        /// Server id.
        server: String,
    },
}

/// Arguments for `server add`.
#[derive(Debug, Args)]
pub struct AddServerArgs {
    /// Display name.
    #[arg(long)]
    pub name: String,
    /// Transport kind: mcp or http.
    #[arg(long, default_value = "mcp")]
    pub kind: String,
    /// Launch command (MCP).
    #[arg(long)]
    pub command: Option<String>,
    /// Base URL (HTTP).
    #[arg(long)]
    pub base_url: Option<String>,
}

/// Tool subcommands.
#[derive(Debug, Subcommand)]
pub enum ToolCommand {
    /// Register a tool by hand.
    Add(AddToolArgs),
    /// List tools.
    List,
    /// Change a tool's risk tier.
    SetRisk {
        /// Tool id.
        tool: String,
        /// New tier: safe, needs_approval, or blocked.
        tier: String,
    },
    /// Delete a tool.
    Rm {
        /// Tool id.
        tool: String,
    },
}

/// Arguments for `tool add`.
#[derive(Debug, Args)]
pub struct AddToolArgs {
    /// Owning server id.
    #[arg(long)]
    pub server: String,
    /// Tool name (unique per server).
    #[arg(long)]
    pub name: String,
    /// Optional description.
    #[arg(long)]
    pub description: Option<String>,
    /// Risk tier: safe, needs_approval, or blocked.
    #[arg(long)]
    pub risk: Option<String>,
}

/// Approval subcommands.
#[derive(Debug, Subcommand)]
pub enum ApprovalsCommand {
    /// List actions awaiting approval.
    List,
    /// Approve one action (and dispatch it).
    Approve {
        /// Pending action id.
        action: String,
    },
    /// Deny one action.
    Deny {
        /// Pending action id.
        action: String,
    },
    /// Approve several actions; failures are reported per item.
    ApproveBatch {
        /// Pending action ids.
        actions: Vec<String>,
    },
}
