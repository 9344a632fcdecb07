//! # Usage Events
//!
//! A [`UsageEvent`] records one attempted use of an AI tool by an external
//! partner: who acted, with which tool, doing what, under which tenant and
//! policy snapshot. Events are immutable once issued by event ingestion.
//!
//! Rule conditions address event fields by dotted path (`tool.version`,
//! `context.brand`), resolved against the event's serialized form.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use vera_core::{EnterpriseId, PolicySnapshotId, TenantId};

/// The acting party.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Partner-side role, e.g. `agency_designer`.
    pub role: String,
}

/// The AI tool being used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tool {
    /// Stable tool identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Version string as reported by the tool.
    pub version: String,
}

/// What the actor attempted with the tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Generate new content.
    Generate,
    /// Modify existing content.
    Edit,
    /// Condense existing content.
    Summarize,
    /// Translate content.
    Translate,
    /// Analyze data or documents.
    Analyze,
    /// Publish content to a channel.
    Publish,
    /// Export data or assets out of the workspace.
    Export,
    /// Share content with a third party.
    Share,
}

impl ActionKind {
    /// The wire name of this action kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Generate => "generate",
            Self::Edit => "edit",
            Self::Summarize => "summarize",
            Self::Translate => "translate",
            Self::Analyze => "analyze",
            Self::Publish => "publish",
            Self::Export => "export",
            Self::Share => "share",
        }
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The attempted action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    /// Typed action kind.
    pub kind: ActionKind,
}

/// Tenant and policy context of the event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageContext {
    /// Partner tenant.
    pub tenant_id: TenantId,
    /// Governing enterprise.
    pub enterprise_id: EnterpriseId,
    /// Brand the work is for, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    /// Region the work is for, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// Distribution channel, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    /// The policy snapshot in force when the event was issued.
    pub policy_snapshot_id: PolicySnapshotId,
}

/// Free-text and asset payload of an event.
///
/// Carried for downstream analysis collaborators. Nothing in the decision
/// or evidence path reads it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageContent {
    /// The prompt submitted to the tool.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    /// Text produced by the tool.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_text: Option<String>,
    /// References to generated assets.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub asset_uris: Vec<String>,
}

/// One attempted AI-tool usage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageEvent {
    /// Who acted.
    pub actor: Actor,
    /// Which tool.
    pub tool: Tool,
    /// What was attempted.
    pub action: Action,
    /// Tenant and policy context.
    pub context: UsageContext,
    /// Optional free-text payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<UsageContent>,
}

impl UsageEvent {
    /// The event as a JSON document for path lookups.
    ///
    /// Serialization of these plain records cannot fail in practice; should
    /// it ever, the result is `null` and every condition evaluates false.
    pub fn to_document(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "usage event serialization failed; treating all fields as absent");
            Value::Null
        })
    }

    /// The policy snapshot this event was issued under.
    pub fn policy_snapshot_id(&self) -> &PolicySnapshotId {
        &self.context.policy_snapshot_id
    }
}
