use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::error::{LibError, Result};

/// Closed status domain for issues. Only `InProgress` carries meaning for the
/// workflow predicates; every other value behaves as "not in progress".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum IssueStatus {
    #[default]
    New,
    Assigned,
    InProgress,
    Resolved,
    Escalated,
    Closed,
}

impl IssueStatus {
    pub const fn as_db_value(self) -> &'static str {
        match self {
            IssueStatus::New => "new",
            IssueStatus::Assigned => "assigned",
            IssueStatus::InProgress => "in_progress",
            IssueStatus::Resolved => "resolved",
            IssueStatus::Escalated => "escalated",
            IssueStatus::Closed => "closed",
        }
    }

    pub fn from_db_value(value: &str) -> Option<Self> {
        match value {
            "new" => Some(IssueStatus::New),
            "assigned" => Some(IssueStatus::Assigned),
            "in_progress" => Some(IssueStatus::InProgress),
            "resolved" => Some(IssueStatus::Resolved),
            "escalated" => Some(IssueStatus::Escalated),
            "closed" => Some(IssueStatus::Closed),
            _ => None,
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        Self::from_db_value(value).ok_or_else(|| {
            LibError::invalid_with_code(
                "unknown_issue_status",
                "Unknown issue status",
                anyhow!("unrecognized issue status {value:?}"),
            )
        })
    }
}

impl fmt::Display for IssueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_db_value())
    }
}

/// Externally assigned identifier of a hierarchy node (region, sub-city,
/// woreda, ...). Upstream keys these by string, not uuid.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct HierarchyNodeId(pub String);

impl fmt::Display for HierarchyNodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for HierarchyNodeId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for HierarchyNodeId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct UserId(pub String);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for UserId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct IssueId(pub Uuid);

impl fmt::Display for IssueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for IssueId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Uuid::from_str(s).map(Self)
    }
}

impl From<Uuid> for IssueId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

/// Flat hierarchy record as delivered by the upstream fetch layer. `children`
/// may carry a partially assembled subtree; the tree builder merges it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HierarchyNode {
    pub id: HierarchyNodeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<HierarchyNodeId>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default = "default_metadata")]
    pub metadata: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<HierarchyNode>>,
}

/// A hierarchy node with its `children` fully resolved. Produced by
/// `hierarchy::build_hierarchy_tree`; `children` is never absent.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeNode {
    pub id: HierarchyNodeId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<HierarchyNodeId>,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub active: bool,
    pub metadata: Value,
    pub children: Vec<TreeNode>,
}

/// Unvalidated hierarchy node payload from the ingestion boundary.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HierarchyNodePayload {
    pub id: String,
    pub parent_id: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub active: Option<bool>,
    pub metadata: Option<Value>,
    pub children: Option<Vec<HierarchyNodePayload>>,
}

impl HierarchyNodePayload {
    pub fn normalize(self) -> Result<HierarchyNode> {
        let id = self.id.trim().to_string();
        if id.is_empty() {
            return Err(LibError::invalid(
                "Hierarchy node id is required",
                anyhow!("empty hierarchy node id"),
            ));
        }

        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(LibError::invalid(
                "Hierarchy node name is required",
                anyhow!("node {} had empty name", id),
            ));
        }

        let parent_id = self
            .parent_id
            .map(|parent| parent.trim().to_string())
            .filter(|parent| !parent.is_empty())
            .map(HierarchyNodeId);

        let children = match self.children {
            Some(children) => Some(
                children
                    .into_iter()
                    .map(HierarchyNodePayload::normalize)
                    .collect::<Result<Vec<_>>>()?,
            ),
            None => None,
        };

        Ok(HierarchyNode {
            id: HierarchyNodeId(id),
            parent_id,
            name,
            description: self.description,
            active: self.active.unwrap_or(true),
            metadata: self.metadata.unwrap_or_else(|| json!({})),
            children,
        })
    }
}

/// One escalation entry on an issue. Older records carry the actor directly in
/// `escalated_by`; newer ones nest it under `escalator`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct EscalationRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub escalated_by: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub escalator: Option<EscalatorRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EscalatorRef {
    pub user_id: UserId,
}

impl EscalationRecord {
    /// Resolved actor of the escalation: the direct field wins over the nested
    /// reference.
    pub fn actor_id(&self) -> Option<&UserId> {
        self.escalated_by
            .as_ref()
            .or_else(|| self.escalator.as_ref().map(|escalator| &escalator.user_id))
    }
}

/// One action entry in an issue's history. `created_at` is kept raw; upstream
/// emits several timestamp shapes and some records carry junk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub action: String,
    pub user_id: UserId,
    #[serde(default)]
    pub created_at: String,
}

impl HistoryEntry {
    pub fn timestamp(&self) -> Option<NaiveDateTime> {
        parse_history_timestamp(&self.created_at)
    }
}

fn parse_history_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(datetime) = DateTime::parse_from_rfc3339(raw) {
        return Some(datetime.naive_utc());
    }
    if let Ok(datetime) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(datetime);
    }
    if let Ok(datetime) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(datetime);
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0);
    }
    None
}

/// Read-only snapshot of an issue as consumed by the workflow predicates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueTask {
    pub id: IssueId,
    #[serde(default)]
    pub status: IssueStatus,
    #[serde(default)]
    pub escalations: Vec<EscalationRecord>,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
    #[serde(default = "default_metadata")]
    pub metadata: Value,
}

fn default_active() -> bool {
    true
}

fn default_metadata() -> Value {
    json!({})
}
