//! Command handlers.

use anyhow::{Context, bail};
use toolgate_core::{AgentId, PendingActionId, RiskTier, ServerId, ToolId};
use toolgate_gateway::Gateway;
use toolgate_registry::{
    DiscoveredTool, NewAgent, NewServer, NewTool, Server, ServerKind, StaticDiscovery,
};

use crate::cli::{
    AddAgentArgs, AddServerArgs, AddToolArgs, AgentCommand, ApprovalsCommand, Command,
    ServerCommand, ToolCommand,
};

/// Dispatch one parsed command against the gateway.
pub async fn run(gateway: &Gateway, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Agent(cmd) => agent(gateway, cmd),
        Command::Server(cmd) => server(gateway, cmd),
        Command::Tool(cmd) => tool(gateway, cmd),
        Command::Grant { agent, tool } => {
            gateway.grant(&parse_agent(&agent)?, &parse_tool(&tool)?)?;
            println!("granted");
            Ok(())
        }
        Command::Revoke { agent, tool } => {
            gateway.revoke(&parse_agent(&agent)?, &parse_tool(&tool)?)?;
            println!("revoked");
            Ok(())
        }
        Command::GrantAll { agent } => {
            let granted = gateway.grant_all(&parse_agent(&agent)?)?;
            println!("granted {granted} permissions");
            Ok(())
        }
        Command::RevokeAll { agent } => {
            let revoked = gateway.revoke_all(&parse_agent(&agent)?)?;
            println!("revoked {revoked} permissions");
            Ok(())
        }
        Command::Eval { agent, tool, args } => eval(gateway, &agent, &tool, &args).await,
        Command::Approvals(cmd) => approvals(gateway, cmd).await,
        Command::Log => {
            for view in gateway.audit_log()? {
                println!(
                    "{}  {:<9} {:<18} agent={} tool={}",
                    view.record.timestamp,
                    view.record.status,
                    view.record.reason,
                    view.agent_name.as_deref().unwrap_or("<deleted>"),
                    view.tool_name.as_deref().unwrap_or("<deleted>"),
                );
            }
            Ok(())
        }
        Command::Dashboard => {
            let summary = gateway.dashboard()?;
            println!("agents:            {}", summary.agents);
            println!("servers:           {}", summary.servers);
            println!("tools:             {}", summary.tools);
            println!("pending approvals: {}", summary.pending_approvals);
            println!("audit records:     {}", summary.audit_records);
            Ok(())
        }
    }
}

fn agent(gateway: &Gateway, command: AgentCommand) -> anyhow::Result<()> {
    match command {
        AgentCommand::Add(AddAgentArgs {
            name,
            host_type,
            description,
            api_key,
        }) => {
            let agent = gateway.create_agent(NewAgent {
                name,
                description,
                host_type,
                api_key,
            })?;
            println!("{}  {}", agent.id, agent.name);
            Ok(())
        }
        AgentCommand::List => {
            for agent in gateway.agents()? {
                println!("{}  {:<24} {}", agent.id, agent.name, agent.host_type);
            }
            Ok(())
        }
        AgentCommand::Rm { agent } => {
            gateway.delete_agent(&parse_agent(&agent)?)?;
            println!("deleted");
            Ok(())
        }
    }
}

fn server(gateway: &Gateway, command: ServerCommand) -> anyhow::Result<()> {
    match command {
        ServerCommand::Add(AddServerArgs {
            name,
            kind,
            command,
            base_url,
        }) => {
            let Some(kind) = ServerKind::parse(&kind) else {
                bail!("invalid server kind: {kind} (expected mcp or http)");
            };
            let server = gateway.create_server(NewServer {
                name,
                kind,
                command,
                base_url,
                description: None,
            })?;
            println!("{}  {}", server.id, server.name);
            Ok(())
        }
        ServerCommand::List => {
            for server in gateway.servers()? {
                println!("{}  {:<24} {}", server.id, server.name, server.kind);
            }
            Ok(())
        }
        ServerCommand::Sync { server } => {
            let id = parse_server(&server)?;
            let servers = gateway.servers()?;
            let Some(server) = servers.iter().find(|s| s.id == id) else {
                bail!("server not found: {id}");
            };
            let discovery = sample_discovery(server);
            let report = gateway.sync_server(&id, &discovery)?;
            println!("added {} tools, skipped {}", report.added, report.skipped);
            Ok(())
        }
        ServerCommand::Rm { server } => {
            gateway.delete_server(&parse_server(&server)?)?;
            println!("deleted");
            Ok(())
        }
    }
}

fn tool(gateway: &Gateway, command: ToolCommand) -> anyhow::Result<()> {
    match command {
        ToolCommand::Add(AddToolArgs {
            server,
            name,
            description,
            risk,
        }) => {
            let risk_tier = risk.as_deref().map(parse_tier).transpose()?;
            let tool = gateway.create_tool(NewTool {
                server_id: parse_server(&server)?,
                name,
                description,
                input_schema: None,
                risk_tier,
            })?;
            println!("{}  {} ({})", tool.id, tool.name, tool.risk_tier);
            Ok(())
        }
        ToolCommand::List => {
            for tool in gateway.tools()? {
                println!("{}  {:<24} {}", tool.id, tool.name, tool.risk_tier);
            }
            Ok(())
        }
        ToolCommand::SetRisk { tool, tier } => {
            let updated = gateway.set_risk_tier(&parse_tool(&tool)?, parse_tier(&tier)?)?;
            println!("{} -> {}", updated.name, updated.risk_tier);
            Ok(())
        }
        ToolCommand::Rm { tool } => {
            gateway.delete_tool(&parse_tool(&tool)?)?;
            println!("deleted");
            Ok(())
        }
    }
}

async fn eval(gateway: &Gateway, agent: &str, tool: &str, args: &str) -> anyhow::Result<()> {
    let arguments: serde_json::Value =
        serde_json::from_str(args).context("arguments must be valid JSON")?;
    let report = gateway
        .execute_tool(&parse_agent(agent)?, &parse_tool(tool)?, &arguments)
        .await?;

    println!("decision: {}", report.policy);
    if let Some(pending) = report.policy.pending_action_id {
        println!("queued as {pending}");
    }
    if let Some(outcome) = report.execution {
        println!("execution: {}", serde_json::to_string_pretty(&outcome)?);
    }
    Ok(())
}

async fn approvals(gateway: &Gateway, command: ApprovalsCommand) -> anyhow::Result<()> {
    match command {
        ApprovalsCommand::List => {
            for view in gateway.pending_actions()? {
                println!(
                    "{}  {}  agent={} tool={} args={}",
                    view.action.id,
                    view.action.created_at,
                    view.agent_name.as_deref().unwrap_or("<deleted>"),
                    view.tool_name.as_deref().unwrap_or("<deleted>"),
                    view.action.arguments,
                );
            }
            Ok(())
        }
        ApprovalsCommand::Approve { action } => {
            let report = gateway.approve_action(&parse_action(&action)?).await?;
            println!("approved {}", report.action.id);
            if let Some(outcome) = report.execution {
                println!("execution: {}", serde_json::to_string_pretty(&outcome)?);
            }
            Ok(())
        }
        ApprovalsCommand::Deny { action } => {
            let denied = gateway.deny_action(&parse_action(&action)?)?;
            println!("denied {}", denied.id);
            Ok(())
        }
        ApprovalsCommand::ApproveBatch { actions } => {
            let ids = actions
                .iter()
                .map(|raw| parse_action(raw))
                .collect::<anyhow::Result<Vec<_>>>()?;
            let outcome = gateway.batch_approve(&ids).await?;
            println!("approved {}, failed {}", outcome.succeeded, outcome.failed);
            for failure in outcome.failures {
                println!("  {}: {}", failure.id, failure.error);
            }
            Ok(())
        }
    }
}

/// Built-in discovery catalog for offline syncs, keyed on the server
/// name. A live deployment swaps this for a discovery source that
/// interrogates the server itself.
fn sample_discovery(server: &Server) -> StaticDiscovery {
    let name = server.name.to_lowercase();
    let tools = if name.contains("github") {
        vec![
            DiscoveredTool::new("github_list_repos").with_description("List repositories"),
            DiscoveredTool::new("github_create_issue").with_description("Create an issue"),
            DiscoveredTool::new("github_create_pull_request")
                .with_description("Create a pull request"),
        ]
    } else if name.contains("filesystem") {
        vec![
            DiscoveredTool::new("fs_read_file").with_description("Read a file"),
            DiscoveredTool::new("fs_write_file").with_description("Write a file"),
            DiscoveredTool::new("fs_list_directory").with_description("List a directory"),
            DiscoveredTool::new("fs_delete_file").with_description("Delete a file"),
        ]
    } else if name.contains("postgres") {
        vec![
            DiscoveredTool::new("pg_query").with_description("Execute a SQL query"),
            DiscoveredTool::new("pg_list_tables").with_description("List tables"),
        ]
    } else {
        vec![DiscoveredTool::new("generic_call").with_description("Generic server call")]
    };
    StaticDiscovery::new(tools)
}

fn parse_agent(raw: &str) -> anyhow::Result<AgentId> {
    raw.parse().with_context(|| format!("bad agent id: {raw}"))
}

fn parse_server(raw: &str) -> anyhow::Result<ServerId> {
    raw.parse().with_context(|| format!("bad server id: {raw}"))
}

fn parse_tool(raw: &str) -> anyhow::Result<ToolId> {
    raw.parse().with_context(|| format!("bad tool id: {raw}"))
}

fn parse_action(raw: &str) -> anyhow::Result<PendingActionId> {
    raw.parse()
        .with_context(|| format!("bad pending action id: {raw}"))
}

fn parse_tier(raw: &str) -> anyhow::Result<RiskTier> {
    match RiskTier::parse_lenient(raw) {
        RiskTier::Unknown => bail!("invalid risk tier: {raw} (expected safe, needs_approval, or blocked)"),
        tier => Ok(tier),
    }
}
