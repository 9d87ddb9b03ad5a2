//! End-to-end lifecycle tests over an in-memory gateway.

use std::sync::Arc;

use serde_json::json;
use toolgate_approval::{PendingStatus, PolicyError};
use toolgate_core::{AgentId, ReasonCode, RiskTier, ToolId};
use toolgate_exec::MockExecutor;
use toolgate_gateway::{Gateway, GatewayError};
use toolgate_registry::{
    DiscoveredTool, NewAgent, NewServer, NewTool, RegistryError, ServerKind, StaticDiscovery,
};

struct World {
    gateway: Gateway,
    agent: AgentId,
    tool: ToolId,
}

fn world(tier: RiskTier) -> World {
    let gateway = Gateway::in_memory(Arc::new(MockExecutor::new())).unwrap();
    let agent = gateway
        .create_agent(NewAgent {
            name: "assistant".to_string(),
            description: Some("integration fixture".to_string()),
            host_type: "claude-desktop".to_string(),
            api_key: None,
        })
        .unwrap();
    let server = gateway
        .create_server(NewServer {
            name: "github".to_string(),
            kind: ServerKind::Mcp,
            command: Some("npx mcp-github".to_string()),
            base_url: None,
            description: None,
        })
        .unwrap();
    let tool = gateway
        .create_tool(NewTool {
            server_id: server.id,
            name: "create_issue".to_string(),
            description: None,
            input_schema: None,
            risk_tier: Some(tier),
        })
        .unwrap();
    World {
        gateway,
        agent: agent.id,
        tool: tool.id,
    }
}

#[tokio::test]
async fn safe_tool_executes_immediately_once_granted() {
    let w = world(RiskTier::Safe);
    w.gateway.grant(&w.agent, &w.tool).unwrap();

    let report = w
        .gateway
        .execute_tool(&w.agent, &w.tool, &json!({"title": "bug"}))
        .await
        .unwrap();

    assert!(report.policy.allowed);
    assert_eq!(report.policy.reason, ReasonCode::Allowed);
    let outcome = report.execution.unwrap();
    assert!(outcome.is_success());

    let log = w.gateway.audit_log().unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].agent_name.as_deref(), Some("assistant"));
    assert_eq!(log[0].tool_name.as_deref(), Some("create_issue"));
    assert_eq!(log[0].server_name.as_deref(), Some("github"));
}

#[tokio::test]
async fn denied_decision_is_not_an_error() {
    let w = world(RiskTier::Safe);
    // No grant: the backfilled row denies.
    let report = w
        .gateway
        .execute_tool(&w.agent, &w.tool, &json!({}))
        .await
        .unwrap();

    assert!(!report.policy.allowed);
    assert_eq!(report.policy.reason, ReasonCode::BlockedPermission);
    assert!(report.execution.is_none());
}

#[tokio::test]
async fn blocked_tool_denies_even_when_granted() {
    let w = world(RiskTier::Blocked);
    w.gateway.grant(&w.agent, &w.tool).unwrap();

    let report = w
        .gateway
        .execute_tool(&w.agent, &w.tool, &json!({}))
        .await
        .unwrap();
    assert_eq!(report.policy.reason, ReasonCode::BlockedRisk);
    assert!(report.execution.is_none());
}

#[tokio::test]
async fn unknown_agent_is_a_request_error() {
    let w = world(RiskTier::Safe);
    let err = w
        .gateway
        .execute_tool(&AgentId::new(), &w.tool, &json!({}))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        GatewayError::Registry(RegistryError::AgentNotFound(_))
    ));
    // Nothing was evaluated, so nothing was audited.
    assert!(w.gateway.audit_log().unwrap().is_empty());
}

#[tokio::test]
async fn deferred_call_approves_and_executes() {
    let w = world(RiskTier::NeedsApproval);
    w.gateway.grant(&w.agent, &w.tool).unwrap();

    let report = w
        .gateway
        .execute_tool(&w.agent, &w.tool, &json!({"title": "feature"}))
        .await
        .unwrap();
    assert!(!report.policy.allowed);
    assert_eq!(report.policy.reason, ReasonCode::NeedsApproval);
    let pending_id = report.policy.pending_action_id.unwrap();

    // Queued, visible, and not yet audited.
    let queue = w.gateway.pending_actions().unwrap();
    assert_eq!(queue.len(), 1);
    assert_eq!(queue[0].action.id, pending_id);
    assert!(w.gateway.audit_log().unwrap().is_empty());

    // Approve: state flips, audit lands, the executor runs.
    let approval = w.gateway.approve_action(&pending_id).await.unwrap();
    assert_eq!(approval.action.status, PendingStatus::Approved);
    assert!(approval.execution.unwrap().is_success());

    let log = w.gateway.audit_log().unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].record.reason, ReasonCode::Approved);
    assert!(w.gateway.pending_actions().unwrap().is_empty());
}

#[tokio::test]
async fn deferred_call_denies_with_audit() {
    let w = world(RiskTier::NeedsApproval);
    w.gateway.grant(&w.agent, &w.tool).unwrap();

    let report = w
        .gateway
        .execute_tool(&w.agent, &w.tool, &json!({}))
        .await
        .unwrap();
    let pending_id = report.policy.pending_action_id.unwrap();

    let action = w.gateway.deny_action(&pending_id).unwrap();
    assert_eq!(action.status, PendingStatus::Denied);

    let log = w.gateway.audit_log().unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].record.reason, ReasonCode::DeniedByUser);

    // Denying again is a state error, and no duplicate audit appears.
    let err = w.gateway.deny_action(&pending_id).unwrap_err();
    assert!(matches!(
        err,
        GatewayError::Policy(PolicyError::InvalidStateTransition { .. })
    ));
    assert_eq!(w.gateway.audit_log().unwrap().len(), 1);
}

#[tokio::test]
async fn batch_approval_isolates_failures() {
    let w = world(RiskTier::NeedsApproval);
    w.gateway.grant(&w.agent, &w.tool).unwrap();

    let mut ids = Vec::new();
    for i in 0..2 {
        let report = w
            .gateway
            .execute_tool(&w.agent, &w.tool, &json!({"n": i}))
            .await
            .unwrap();
        ids.push(report.policy.pending_action_id.unwrap());
    }
    // Sandwich a nonexistent id between the valid ones.
    let ids = vec![ids[0], toolgate_core::PendingActionId::new(), ids[1]];

    let outcome = w.gateway.batch_approve(&ids).await.unwrap();
    assert_eq!(outcome.succeeded, 2);
    assert_eq!(outcome.failed, 1);
    assert_eq!(outcome.failures[0].id, ids[1]);

    assert!(w.gateway.pending_actions().unwrap().is_empty());
    assert_eq!(w.gateway.audit_log().unwrap().len(), 2);
}

#[tokio::test]
async fn batch_limit_is_enforced() {
    let w = world(RiskTier::NeedsApproval);
    let too_many: Vec<_> = (0..65).map(|_| toolgate_core::PendingActionId::new()).collect();
    let err = w.gateway.batch_approve(&too_many).await.unwrap_err();
    assert!(matches!(err, GatewayError::BatchTooLarge { .. }));
}

#[tokio::test]
async fn risk_tier_change_applies_to_next_evaluation() {
    let w = world(RiskTier::Safe);
    w.gateway.grant(&w.agent, &w.tool).unwrap();

    let before = w
        .gateway
        .execute_tool(&w.agent, &w.tool, &json!({}))
        .await
        .unwrap();
    assert!(before.policy.allowed);

    w.gateway
        .set_risk_tier(&w.tool, RiskTier::NeedsApproval)
        .unwrap();

    let after = w
        .gateway
        .execute_tool(&w.agent, &w.tool, &json!({}))
        .await
        .unwrap();
    assert_eq!(after.policy.reason, ReasonCode::NeedsApproval);
}

#[tokio::test]
async fn tier_change_does_not_touch_inflight_approvals() {
    let w = world(RiskTier::NeedsApproval);
    w.gateway.grant(&w.agent, &w.tool).unwrap();

    let report = w
        .gateway
        .execute_tool(&w.agent, &w.tool, &json!({}))
        .await
        .unwrap();
    let pending_id = report.policy.pending_action_id.unwrap();

    // Blocking the tool does not retract the queued action.
    w.gateway.set_risk_tier(&w.tool, RiskTier::Blocked).unwrap();
    assert_eq!(w.gateway.pending_actions().unwrap().len(), 1);

    // It can still be resolved.
    let action = w.gateway.deny_action(&pending_id).unwrap();
    assert_eq!(action.status, PendingStatus::Denied);
}

#[tokio::test]
async fn agent_deletion_cascades_queue_but_keeps_audit() {
    let w = world(RiskTier::NeedsApproval);
    w.gateway.grant(&w.agent, &w.tool).unwrap();

    // One deferred action, one terminal record.
    w.gateway
        .execute_tool(&w.agent, &w.tool, &json!({}))
        .await
        .unwrap();
    w.gateway.revoke(&w.agent, &w.tool).unwrap();
    w.gateway
        .execute_tool(&w.agent, &w.tool, &json!({}))
        .await
        .unwrap();
    assert_eq!(w.gateway.audit_log().unwrap().len(), 1);

    w.gateway.delete_agent(&w.agent).unwrap();

    assert!(w.gateway.pending_actions().unwrap().is_empty());
    let log = w.gateway.audit_log().unwrap();
    assert_eq!(log.len(), 1);
    // The record survives without its agent's name.
    assert!(log[0].agent_name.is_none());
}

#[tokio::test]
async fn sync_discovers_and_dashboard_counts() {
    let w = world(RiskTier::Safe);
    let server = w
        .gateway
        .create_server(NewServer {
            name: "filesystem".to_string(),
            kind: ServerKind::Mcp,
            command: None,
            base_url: None,
            description: None,
        })
        .unwrap();
    let discovery = StaticDiscovery::new(vec![
        DiscoveredTool::new("fs_read_file"),
        DiscoveredTool::new("fs_write_file"),
    ]);

    let report = w.gateway.sync_server(&server.id, &discovery).unwrap();
    assert_eq!((report.added, report.skipped), (2, 0));

    let summary = w.gateway.dashboard().unwrap();
    assert_eq!(summary.agents, 1);
    assert_eq!(summary.servers, 2);
    assert_eq!(summary.tools, 3);
    assert_eq!(summary.pending_approvals, 0);
    assert_eq!(summary.audit_records, 0);
}

#[tokio::test]
async fn failing_executor_surfaces_through_report() {
    let gateway = Gateway::in_memory(Arc::new(MockExecutor::failing("downstream offline"))).unwrap();
    let agent = gateway
        .create_agent(NewAgent {
            name: "assistant".to_string(),
            description: None,
            host_type: "claude-desktop".to_string(),
            api_key: None,
        })
        .unwrap();
    let server = gateway
        .create_server(NewServer {
            name: "github".to_string(),
            kind: ServerKind::Http,
            command: None,
            base_url: Some("https://api.github.com".to_string()),
            description: None,
        })
        .unwrap();
    let tool = gateway
        .create_tool(NewTool {
            server_id: server.id,
            name: "create_issue".to_string(),
            description: None,
            input_schema: None,
            risk_tier: Some(RiskTier::Safe),
        })
        .unwrap();
    gateway.grant(&agent.id, &tool.id).unwrap();

    let report = gateway
        .execute_tool(&agent.id, &tool.id, &json!({}))
        .await
        .unwrap();
    // Policy allowed; the tool itself reported failure.
    assert!(report.policy.allowed);
    assert!(!report.execution.unwrap().is_success());
}
